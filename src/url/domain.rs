use url::Url;

/// Returns the lowercase host of a URL, without a leading `www.`
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::site_host;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(site_host(&url), Some("example.com".to_string()));
/// ```
pub fn site_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => host,
        }
    })
}

/// Checks whether `candidate` belongs to the same site as `seed_host`
///
/// Subdomains of the seed host count as the same site, so a crawl seeded at
/// `example.com` may follow links to `blog.example.com` but not to
/// `example.org` or `notexample.com`.
pub fn is_same_site(candidate: &Url, seed_host: &str) -> bool {
    match site_host(candidate) {
        Some(host) => host == seed_host || host.ends_with(&format!(".{}", seed_host)),
        None => false,
    }
}
