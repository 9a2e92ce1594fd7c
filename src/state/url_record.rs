/// URL status definitions for tracking crawl progress
///
/// Every URL the frontier accepts moves along one path:
/// `Pending -> InFlight -> Visited | Failed`.
use std::fmt;

/// Represents where a URL is in its single trip through the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    /// Accepted by the frontier and waiting in the queue
    Pending,

    /// Handed out by `dequeue` and currently being fetched or extracted
    InFlight,

    /// Fetched and processed
    Visited,

    /// Fetch, robots check, or extraction failed; terminal for this run
    Failed,
}

impl UrlStatus {
    /// Returns true if the URL needs no further processing
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Visited | Self::Failed)
    }

    /// Returns true if the URL has been claimed from the queue
    ///
    /// Claimed URLs count against the page budget.
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::InFlight | Self::Visited | Self::Failed)
    }

    /// Checks whether moving from `self` to `next` is allowed
    ///
    /// Re-marking a terminal status with itself is allowed so that
    /// `mark_visited` stays idempotent.
    pub fn can_transition_to(&self, next: UrlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::InFlight, Self::Visited)
                | (Self::InFlight, Self::Failed)
                | (Self::Visited, Self::Visited)
                | (Self::Failed, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Visited => "visited",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL known to the frontier together with its discovery depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    /// Absolute URL as discovered, without its fragment; this is what gets fetched
    pub url: String,

    /// Normalized form of `url`, used only for deduplication
    pub key: String,

    /// Link hops from the seed (the seed is depth 0)
    pub depth: u32,

    pub status: UrlStatus,
}

impl UrlRecord {
    pub fn pending(url: impl Into<String>, key: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            depth,
            status: UrlStatus::Pending,
        }
    }
}
