//! State module for tracking crawl progress
//!
//! - `UrlStatus`: where a URL is in its trip through the crawl
//! - `UrlRecord`: a frontier entry (URL, discovery depth, status)

mod url_record;

pub use url_record::{UrlRecord, UrlStatus};
