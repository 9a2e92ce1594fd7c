use crate::ConfigError;
use regex::Regex;

/// Include/exclude policy over absolute URLs
///
/// Patterns are regular expressions matched anywhere in the URL string
/// (anchor them with `^`/`$` when needed). The rules are:
///
/// - a URL matching any exclude pattern is rejected, even if it also matches
///   an include pattern
/// - with no include patterns every remaining URL is accepted
/// - otherwise the URL must match at least one include pattern
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

/// Why a URL was accepted or rejected by a [`UrlFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Allowed,
    Excluded,
    NotIncluded,
}

impl UrlFilter {
    /// Compiles include and exclude patterns
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` naming the first pattern that does
    /// not compile.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// Decides whether `url` may enter the frontier
    pub fn decide(&self, url: &str) -> FilterDecision {
        if self.exclude.iter().any(|re| re.is_match(url)) {
            return FilterDecision::Excluded;
        }

        if self.include.is_empty() || self.include.iter().any(|re| re.is_match(url)) {
            FilterDecision::Allowed
        } else {
            FilterDecision::NotIncluded
        }
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            if p.trim().is_empty() {
                return Err(ConfigError::InvalidPattern(
                    "URL pattern cannot be empty".to_string(),
                ));
            }
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
        })
        .collect()
}
