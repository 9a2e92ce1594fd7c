//! Crawler module for fetching pages and running the crawl loop
//!
//! This module contains the crawl pipeline, including:
//! - The frontier (queue, dedup, depth and page limits)
//! - HTTP fetching with redirect and timeout limits
//! - Text, link and image extraction
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;

pub use coordinator::{harvest, Coordinator};
pub use extractor::{
    build_extractor, CustomSelectorExtractor, DefaultHtmlExtractor, Extraction, Extractor,
    PageContent,
};
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use frontier::{EnqueueOutcome, Frontier};
