//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization (the frontier's dedup key),
//! same-site checks, and the include/exclude pattern filter.

mod domain;
mod matcher;
mod normalize;

pub use domain::{is_same_site, site_host};
pub use matcher::{FilterDecision, UrlFilter};
pub use normalize::normalize_url;

use url::Url;

/// Resolves a possibly relative reference against a page URL
///
/// Returns `None` for references that cannot lead to a crawlable page:
/// empty strings, same-page fragments, `javascript:`, `mailto:`, `tel:` and
/// `data:` URIs, and anything that does not resolve to http(s).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::resolve_reference;
///
/// let base = Url::parse("https://example.com/blog/post").unwrap();
/// assert_eq!(
///     resolve_reference("../about", &base).as_deref(),
///     Some("https://example.com/about")
/// );
/// assert_eq!(resolve_reference("mailto:a@b.c", &base), None);
/// ```
pub fn resolve_reference(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
