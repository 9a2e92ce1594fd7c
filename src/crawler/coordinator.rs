//! Crawler coordinator - the main crawl loop
//!
//! This module ties the pipeline together:
//! - Seeding and draining the frontier
//! - Politeness (robots.txt and the delay between fetches)
//! - Fetching, extracting and classifying each page
//! - Handing records to the sink and following links
//! - Stopping cleanly when asked

use crate::config::Config;
use crate::crawler::extractor::{build_extractor, Extractor, PageContent};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::filter::{build_filter, FilterError, RelevanceFilter};
use crate::output::{CrawlReport, ExtractedRecord, MediaStore, Sink, StopReason};
use crate::robots::RobotsCache;
use crate::state::UrlRecord;
use crate::url::{normalize_url, site_host};
use crate::{ConfigError, Result, UrlError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Wait before retrying a rate-limited page when no model section sets one
const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(2000);

/// Main crawler coordinator structure
///
/// Owns the frontier and every pipeline stage. Pages are processed one at a
/// time, in breadth-first order.
pub struct Coordinator {
    config: Arc<Config>,
    frontier: Frontier,
    fetcher: Box<dyn PageFetcher>,
    extractor: Box<dyn Extractor>,
    filter: Box<dyn RelevanceFilter>,
    sink: Sink,
    robots: Option<RobotsCache>,
    stop: Arc<AtomicBool>,
    config_hash: Option<String>,
}

impl Coordinator {
    /// Creates a coordinator from explicit pipeline stages
    pub fn new(
        config: Arc<Config>,
        fetcher: Box<dyn PageFetcher>,
        extractor: Box<dyn Extractor>,
        filter: Box<dyn RelevanceFilter>,
        sink: Sink,
        robots: Option<RobotsCache>,
    ) -> std::result::Result<Self, ConfigError> {
        let frontier = Frontier::new(&config.crawler)?;

        Ok(Self {
            config,
            frontier,
            fetcher,
            extractor,
            filter,
            sink,
            robots,
            stop: Arc::new(AtomicBool::new(false)),
            config_hash: None,
        })
    }

    /// Builds the whole pipeline from configuration
    ///
    /// The HTTP client is shared by page fetches, robots.txt lookups and
    /// media downloads.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(&config)?;
        let client = fetcher.client().clone();

        let extractor = build_extractor(&config.extractor)?;
        let filter = build_filter(&config)?;

        let media = config
            .extractor
            .extract_images
            .then(|| MediaStore::new(client.clone(), &config.output.media_dir));

        let robots = config
            .crawler
            .respect_robots
            .then(|| RobotsCache::new(client, config.user_agent.crawler_name.clone()));

        Ok(Self::new(
            Arc::clone(&config),
            Box::new(fetcher),
            extractor,
            filter,
            Sink::new(media),
            robots,
        )?)
    }

    /// Replaces the relevance filter
    pub fn with_filter(mut self, filter: Box<dyn RelevanceFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Attaches the config file hash to the report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Flag that ends the crawl before the next page when set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn into_sink(self) -> Sink {
        self.sink
    }

    /// Crawls from `seed` until the frontier is exhausted, the page budget is
    /// spent, or the stop flag is raised
    ///
    /// Per-page failures are logged and counted; only problems with the seed
    /// itself or with frontier bookkeeping end the run with an error.
    pub async fn run(&mut self, seed: &str) -> Result<CrawlReport> {
        let seed = seed.trim();
        // Rejects malformed and non-http seeds before anything is queued
        let seed_url = normalize_url(seed)?;
        let mut report = CrawlReport::new(seed);
        report.config_hash = self.config_hash.clone();

        if self.config.crawler.same_domain_only {
            let host = site_host(&seed_url).ok_or(UrlError::MissingDomain)?;
            tracing::info!("Restricting crawl to {}", host);
            self.frontier.restrict_to_site(host);
        }

        let outcome = self.frontier.enqueue(seed, 0);
        if !outcome.is_queued() {
            return Err(ConfigError::SeedRejected(format!("{} ({:?})", seed, outcome)).into());
        }

        tracing::info!(
            "Starting crawl at {} (max depth {}, max pages {})",
            seed,
            self.config.crawler.max_depth,
            self.config.crawler.max_pages
        );

        let prompt = self
            .config
            .model
            .as_ref()
            .map(|model| model.prompt.clone())
            .unwrap_or_default();
        let base_delay = Duration::from_millis(self.config.crawler.crawl_delay);
        let mut fetched_any = false;

        let stop_reason = loop {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("Stop requested, ending crawl");
                break StopReason::Interrupted;
            }

            let Some(record) = self.frontier.dequeue() else {
                if self.frontier.pending_count() > 0 {
                    tracing::info!("Page budget reached, ending crawl");
                    break StopReason::PageBudget;
                }
                tracing::info!("Frontier is empty, crawl complete");
                break StopReason::FrontierExhausted;
            };

            tracing::debug!("Processing {} (depth {})", record.url, record.depth);
            let page_url = Url::parse(&record.url)?;

            let (allowed, robots_delay) = match self.robots.as_mut() {
                Some(robots) => (
                    robots.is_allowed(&page_url).await,
                    robots.crawl_delay(&page_url).await,
                ),
                None => (true, None),
            };

            if !allowed {
                tracing::info!("URL {} disallowed by robots.txt", record.url);
                report.robots_blocked += 1;
                self.fail(&mut report, &record.url, "disallowed by robots.txt")?;
                continue;
            }

            let delay = robots_delay.map_or(base_delay, |d| d.max(base_delay));
            if fetched_any && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            fetched_any = true;

            self.process(&record, &prompt, &mut report).await?;

            let attempted = report.pages_attempted();
            if attempted > 0 && attempted % 10 == 0 {
                tracing::info!(
                    "Progress: {} visited, {} failed, {} queued, {} record(s)",
                    report.pages_visited,
                    report.pages_failed,
                    self.frontier.pending_count(),
                    self.sink.len()
                );
            }
        };

        report.media_downloaded = self.sink.media_downloaded();
        report.finish(stop_reason);

        tracing::info!(
            "Crawl ended ({}): {} visited, {} failed, {} record(s)",
            stop_reason,
            report.pages_visited,
            report.pages_failed,
            report.records_emitted
        );

        Ok(report)
    }

    /// Fetches, extracts, classifies and emits one page
    async fn process(
        &mut self,
        record: &UrlRecord,
        prompt: &str,
        report: &mut CrawlReport,
    ) -> Result<()> {
        let fetched = match self.fetcher.fetch(&record.url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", record.url, e);
                return self.fail(report, &record.url, &e.to_string());
            }
        };

        // Links resolve against the post-redirect URL
        let base_url = Url::parse(&fetched.final_url).or_else(|_| Url::parse(&record.url))?;
        let extraction = self.extractor.extract(&fetched.body, &base_url);
        let page = PageContent::new(record.url.clone(), fetched.body, extraction);
        report.links_discovered += page.outbound_links.len();

        match self.classify(&page, prompt, report).await {
            Ok(extracted) => {
                if extracted.is_empty() {
                    tracing::debug!("Nothing matching the prompt on {}", record.url);
                    report.empty_records += 1;
                }
                self.sink.emit(extracted, &page.image_urls).await;
                report.records_emitted += 1;

                self.follow_links(&page, record.depth, report);
                self.frontier.mark_visited(&record.url)?;
                report.record_visit(record.depth);
            }
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {}", record.url, e);
                // The fetch worked, so the page's links are still usable
                self.follow_links(&page, record.depth, report);
                self.fail(report, &record.url, &e.to_string())?;
            }
        }

        Ok(())
    }

    /// Classifies a page, retrying once after a rate-limit response
    async fn classify(
        &self,
        page: &PageContent,
        prompt: &str,
        report: &mut CrawlReport,
    ) -> std::result::Result<ExtractedRecord, FilterError> {
        match self.filter.classify(page, prompt).await {
            Err(FilterError::RateLimited { retry_after }) => {
                let wait = retry_after.unwrap_or_else(|| self.rate_limit_backoff());
                tracing::warn!(
                    "Rate limited while extracting {}, retrying once in {:?}",
                    page.url,
                    wait
                );
                report.rate_limit_retries += 1;
                tokio::time::sleep(wait).await;
                self.filter.classify(page, prompt).await
            }
            other => other,
        }
    }

    fn rate_limit_backoff(&self) -> Duration {
        self.config
            .model
            .as_ref()
            .map(|model| Duration::from_millis(model.rate_limit_backoff))
            .unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF)
    }

    fn follow_links(&mut self, page: &PageContent, depth: u32, report: &mut CrawlReport) {
        if !self.config.crawler.follow_links {
            return;
        }

        for link in &page.outbound_links {
            let outcome = self.frontier.enqueue(link, depth + 1);
            report.record_enqueue(outcome);
        }
    }

    fn fail(&mut self, report: &mut CrawlReport, url: &str, reason: &str) -> Result<()> {
        self.frontier.mark_failed(url, reason)?;
        report.record_failure(url, reason);
        Ok(())
    }
}

/// Runs a complete crawl from `seed` and returns the filled sink
///
/// This is the library entry point: it builds the pipeline from `config`,
/// crawls, and leaves exporting to the caller.
pub async fn harvest(config: Config, seed: &str) -> Result<(Sink, CrawlReport)> {
    let mut coordinator = Coordinator::from_config(Arc::new(config))?;
    let report = coordinator.run(seed).await?;
    Ok((coordinator.into_sink(), report))
}
