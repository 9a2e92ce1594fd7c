//! Frontier manager: the single owner of every URL a crawl knows about
//!
//! This module handles:
//! - FIFO (breadth-first) ordering of pending URLs
//! - Depth, include/exclude and same-site admission policy
//! - Deduplication on the normalized URL, while the URL as discovered is
//!   the one handed out for fetching
//! - The page budget (`max_pages`)
//!
//! Nothing outside this module touches the visited set; the coordinator only
//! goes through `enqueue`, `dequeue`, `mark_visited` and `mark_failed`.

use crate::config::CrawlerConfig;
use crate::state::{UrlRecord, UrlStatus};
use crate::url::{is_same_site, normalize_url, FilterDecision, UrlFilter};
use crate::{ConfigError, HarvestError, Result};
use std::collections::{HashMap, VecDeque};
use url::Url;

/// What `enqueue` did with a candidate URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Added to the back of the queue
    Queued,

    /// Discovered deeper than `max_depth`
    DepthExceeded,

    /// Matched an exclude pattern
    Excluded,

    /// Include patterns exist and none matched
    NotIncluded,

    /// Outside the seed's site while `same_domain_only` is set
    OffSite,

    /// Already queued, in flight, visited or failed
    Duplicate,

    /// Could not be normalized (bad syntax, non-http scheme, no host)
    Invalid,
}

impl EnqueueOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// Breadth-first URL frontier with dedup and crawl limits
pub struct Frontier {
    /// Pending records in discovery order
    queue: VecDeque<UrlRecord>,

    /// Status of every URL ever accepted, keyed by normalized URL
    known: HashMap<String, UrlStatus>,

    filter: UrlFilter,

    max_depth: u32,

    max_pages: u32,

    /// Site the crawl is confined to, if any
    site_scope: Option<String>,

    /// URLs handed out by `dequeue` so far (in flight + visited + failed)
    claimed: u32,

    visited: u32,

    failed: u32,
}

impl Frontier {
    /// Creates an empty frontier from the crawler limits and URL patterns
    pub fn new(config: &CrawlerConfig) -> std::result::Result<Self, ConfigError> {
        let filter = UrlFilter::new(
            config.include_patterns.as_slice(),
            config.exclude_patterns.as_slice(),
        )?;

        Ok(Self {
            queue: VecDeque::new(),
            known: HashMap::new(),
            filter,
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            site_scope: None,
            claimed: 0,
            visited: 0,
            failed: 0,
        })
    }

    /// Confines later enqueues to `host` and its subdomains
    pub fn restrict_to_site(&mut self, host: impl Into<String>) {
        self.site_scope = Some(host.into());
    }

    /// Offers an absolute URL discovered at `depth`
    ///
    /// The URL is queued only if it normalizes, is within the depth limit,
    /// has not been seen before, passes the include/exclude filter and, when
    /// a site scope is set, stays on that site. The queued record keeps the
    /// URL as given (minus any fragment); the normalized form is only the
    /// dedup key.
    pub fn enqueue(&mut self, url: &str, depth: u32) -> EnqueueOutcome {
        let normalized = match normalize_url(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::trace!("Not enqueuing {}: {}", url, e);
                return EnqueueOutcome::Invalid;
            }
        };
        let mut target = match Url::parse(url.trim()) {
            Ok(u) => u,
            Err(_) => return EnqueueOutcome::Invalid,
        };
        target.set_fragment(None);

        if depth > self.max_depth {
            tracing::trace!("Not enqueuing {}: depth {} > {}", normalized, depth, self.max_depth);
            return EnqueueOutcome::DepthExceeded;
        }

        let key = normalized.as_str();

        if self.known.contains_key(key) {
            return EnqueueOutcome::Duplicate;
        }

        match self.filter.decide(key) {
            FilterDecision::Allowed => {}
            FilterDecision::Excluded => {
                tracing::debug!("Excluded by pattern: {}", key);
                return EnqueueOutcome::Excluded;
            }
            FilterDecision::NotIncluded => {
                tracing::debug!("Matches no include pattern: {}", key);
                return EnqueueOutcome::NotIncluded;
            }
        }

        if let Some(site) = &self.site_scope {
            if !is_same_site(&normalized, site) {
                tracing::debug!("Off-site link skipped: {}", key);
                return EnqueueOutcome::OffSite;
            }
        }

        self.known.insert(key.to_string(), UrlStatus::Pending);
        self.queue.push_back(UrlRecord::pending(target.as_str(), key, depth));
        tracing::trace!("Queued {} at depth {}", target, depth);

        EnqueueOutcome::Queued
    }

    /// Takes the oldest pending URL and marks it in flight
    ///
    /// Returns `None` when the queue is empty or the page budget is spent,
    /// whichever comes first.
    pub fn dequeue(&mut self) -> Option<UrlRecord> {
        if self.budget_spent() {
            if !self.queue.is_empty() {
                tracing::debug!(
                    "Page budget of {} reached with {} URL(s) still queued",
                    self.max_pages,
                    self.queue.len()
                );
            }
            return None;
        }

        let mut record = self.queue.pop_front()?;
        record.status = UrlStatus::InFlight;
        self.known.insert(record.key.clone(), UrlStatus::InFlight);
        self.claimed += 1;

        Some(record)
    }

    /// Records a successful visit; marking an already visited URL is a no-op
    pub fn mark_visited(&mut self, url: &str) -> Result<()> {
        let previous = self.transition(url, UrlStatus::Visited)?;
        if previous != UrlStatus::Visited {
            self.visited += 1;
        }
        Ok(())
    }

    /// Records that a URL could not be processed
    pub fn mark_failed(&mut self, url: &str, reason: &str) -> Result<()> {
        let previous = self.transition(url, UrlStatus::Failed)?;
        if previous != UrlStatus::Failed {
            self.failed += 1;
            tracing::debug!("Marked failed: {} ({})", url, reason);
        }
        Ok(())
    }

    /// Moves a known URL to `next`, returning the status it had before
    fn transition(&mut self, url: &str, next: UrlStatus) -> Result<UrlStatus> {
        let key = normalize_url(url)?.to_string();
        let status = self
            .known
            .get_mut(&key)
            .ok_or_else(|| HarvestError::UnknownUrl(key.clone()))?;

        let previous = *status;
        if !previous.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                url: key,
                from: previous,
                to: next,
            });
        }

        *status = next;
        Ok(previous)
    }

    /// Returns the status of a URL, if the frontier has ever accepted it
    pub fn status(&self, url: &str) -> Option<UrlStatus> {
        let key = normalize_url(url).ok()?;
        self.known.get(key.as_str()).copied()
    }

    fn budget_spent(&self) -> bool {
        self.claimed >= self.max_pages
    }

    /// True when `dequeue` will not hand out anything else
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty() || self.budget_spent()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_count(&self) -> u32 {
        self.visited
    }

    pub fn failed_count(&self) -> u32 {
        self.failed
    }

    pub fn claimed_count(&self) -> u32 {
        self.claimed
    }

    /// Number of distinct URLs ever accepted
    pub fn known_count(&self) -> usize {
        self.known.len()
    }
}
