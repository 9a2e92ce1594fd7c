//! Crawl report: what one run did
//!
//! The coordinator fills a `CrawlReport` as it goes; the CLI logs it and can
//! write it as a markdown summary.

use crate::crawler::EnqueueOutcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Why the crawl loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Nothing left to visit
    #[default]
    FrontierExhausted,

    /// `max_pages` URLs were taken from the frontier
    PageBudget,

    /// The stop flag was raised (Ctrl-C)
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FrontierExhausted => "frontier exhausted",
            Self::PageBudget => "page budget reached",
            Self::Interrupted => "interrupted",
        })
    }
}

/// A URL that was taken from the frontier but produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    // Run metadata
    pub seed_url: String,
    pub config_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stop_reason: StopReason,

    // Page outcomes
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub records_emitted: usize,
    pub empty_records: usize,
    pub media_downloaded: usize,
    pub robots_blocked: u32,
    pub rate_limit_retries: u32,

    // Link admission
    pub links_discovered: usize,
    pub links_queued: u32,
    pub skipped_depth: u32,
    pub skipped_filtered: u32,
    pub skipped_off_site: u32,
    pub skipped_duplicate: u32,
    pub skipped_invalid: u32,

    // Visited pages per depth
    pub depth_breakdown: BTreeMap<u32, u32>,

    pub failures: Vec<FailedUrl>,
}

impl CrawlReport {
    /// Starts a report for a crawl seeded at `seed_url`
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            started_at: Utc::now(),
            ..Self::default()
        }
    }

    /// Counts what the frontier did with a discovered link
    pub fn record_enqueue(&mut self, outcome: EnqueueOutcome) {
        match outcome {
            EnqueueOutcome::Queued => self.links_queued += 1,
            EnqueueOutcome::DepthExceeded => self.skipped_depth += 1,
            EnqueueOutcome::Excluded | EnqueueOutcome::NotIncluded => self.skipped_filtered += 1,
            EnqueueOutcome::OffSite => self.skipped_off_site += 1,
            EnqueueOutcome::Duplicate => self.skipped_duplicate += 1,
            EnqueueOutcome::Invalid => self.skipped_invalid += 1,
        }
    }

    pub fn record_visit(&mut self, depth: u32) {
        self.pages_visited += 1;
        *self.depth_breakdown.entry(depth).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, url: impl Into<String>, reason: impl Into<String>) {
        self.pages_failed += 1;
        self.failures.push(FailedUrl {
            url: url.into(),
            reason: reason.into(),
        });
    }

    /// Stamps the finish time and the reason the loop ended
    pub fn finish(&mut self, reason: StopReason) {
        self.stop_reason = reason;
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Pages taken from the frontier, successful or not
    pub fn pages_attempted(&self) -> u32 {
        self.pages_visited + self.pages_failed
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_attempted();
        if attempted == 0 {
            return 0.0;
        }
        (self.pages_visited as f64 / attempted as f64) * 100.0
    }

    /// Writes the headline numbers to the log
    pub fn log_summary(&self) {
        tracing::info!(
            "Crawl finished ({}): {} visited, {} failed, {} record(s), {} media file(s)",
            self.stop_reason,
            self.pages_visited,
            self.pages_failed,
            self.records_emitted,
            self.media_downloaded
        );
        tracing::info!(
            "Links: {} discovered, {} queued, {} too deep, {} filtered, {} off-site, {} duplicate",
            self.links_discovered,
            self.links_queued,
            self.skipped_depth,
            self.skipped_filtered,
            self.skipped_off_site,
            self.skipped_duplicate
        );
        for failure in &self.failures {
            tracing::debug!("Failed: {} ({})", failure.url, failure.reason);
        }
    }
}
