//! Robots.txt handling module
//!
//! This module fetches, parses and caches robots.txt per origin so the
//! coordinator can skip disallowed URLs and honour `Crawl-delay`.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::{ParsedRobots, MAX_CRAWL_DELAY};
