//! Page extraction: raw markup into text, links and image references
//!
//! Two extractors exist, chosen once from configuration:
//! - `DefaultHtmlExtractor` reads the whole `<body>`
//! - `CustomSelectorExtractor` reads only elements matching a CSS selector
//!
//! Both tolerate malformed markup; the worst case is an empty extraction.

use crate::config::{ExtractorConfig, ExtractorKind};
use crate::url::resolve_reference;
use crate::ConfigError;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose content is never page text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Everything the rest of the pipeline needs from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text, one trimmed line per text run, anchors followed by `[url]`
    pub text: String,

    /// Absolute http(s) links, deduplicated, in discovery order
    pub links: Vec<String>,

    /// Absolute image URLs, deduplicated, at most `max_images`
    pub images: Vec<String>,
}

/// One fetched page as handed to the relevance filter
///
/// Built per fetch and dropped once the page's record has been emitted.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// URL the page was requested under (the frontier's key)
    pub url: String,

    pub raw_markup: String,

    pub title: Option<String>,

    pub extracted_text: String,

    pub outbound_links: Vec<String>,

    pub image_urls: Vec<String>,
}

impl PageContent {
    pub fn new(url: impl Into<String>, raw_markup: String, extraction: Extraction) -> Self {
        Self {
            url: url.into(),
            raw_markup,
            title: extraction.title,
            extracted_text: extraction.text,
            outbound_links: extraction.links,
            image_urls: extraction.images,
        }
    }
}

/// Turns raw markup into an `Extraction`
pub trait Extractor: Send + Sync {
    fn extract(&self, raw_markup: &str, base_url: &Url) -> Extraction;
}

/// Extracts the text of the whole document body
#[derive(Debug, Clone, Default)]
pub struct DefaultHtmlExtractor {
    /// `None` turns image collection off
    max_images: Option<usize>,
}

impl DefaultHtmlExtractor {
    pub fn new(max_images: Option<usize>) -> Self {
        Self { max_images }
    }
}

impl Extractor for DefaultHtmlExtractor {
    fn extract(&self, raw_markup: &str, base_url: &Url) -> Extraction {
        let document = Html::parse_document(raw_markup);
        let body = Selector::parse("body").ok();
        let roots: Vec<ElementRef> = match body.as_ref().and_then(|s| document.select(s).next()) {
            Some(body) => vec![body],
            None => vec![document.root_element()],
        };

        build_extraction(&document, &roots, base_url, self.max_images)
    }
}

/// Extracts text only from the elements matching a CSS selector
///
/// Links are still gathered from the whole document so the crawl can
/// continue past pages whose interesting part is small.
#[derive(Debug, Clone)]
pub struct CustomSelectorExtractor {
    selector: Selector,
    max_images: Option<usize>,
}

impl CustomSelectorExtractor {
    pub fn new(selector: &str, max_images: Option<usize>) -> Result<Self, ConfigError> {
        let selector = Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
        Ok(Self {
            selector,
            max_images,
        })
    }
}

impl Extractor for CustomSelectorExtractor {
    fn extract(&self, raw_markup: &str, base_url: &Url) -> Extraction {
        let document = Html::parse_document(raw_markup);
        let roots: Vec<ElementRef> = document.select(&self.selector).collect();

        if roots.is_empty() {
            tracing::debug!("Selector matched nothing on {}", base_url);
        }

        build_extraction(&document, &roots, base_url, self.max_images)
    }
}

/// Builds the extractor named by the configuration
pub fn build_extractor(config: &ExtractorConfig) -> Result<Box<dyn Extractor>, ConfigError> {
    let max_images = config.extract_images.then_some(config.max_images);

    match config.kind {
        ExtractorKind::Default => Ok(Box::new(DefaultHtmlExtractor::new(max_images))),
        ExtractorKind::CustomSelector => {
            let selector = config.selector.as_deref().ok_or_else(|| {
                ConfigError::Validation("the custom-selector extractor needs a selector".to_string())
            })?;
            Ok(Box::new(CustomSelectorExtractor::new(selector, max_images)?))
        }
    }
}

fn build_extraction(
    document: &Html,
    roots: &[ElementRef],
    base_url: &Url,
    max_images: Option<usize>,
) -> Extraction {
    let mut pieces = Vec::new();
    for root in roots {
        collect_text(*root, base_url, &mut pieces);
    }

    let images = match max_images {
        Some(limit) => extract_images(roots, base_url, limit),
        None => Vec::new(),
    };

    Extraction {
        title: extract_title(document),
        text: clean_text(&pieces.join("\n")),
        links: extract_links(document, base_url),
        images,
    }
}

/// Walks an element in document order, skipping non-content elements
fn collect_text(element: ElementRef, base_url: &Url, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(String::from(&**text)),
            Node::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_element.value().name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }

                collect_text(child_element, base_url, out);

                if name == "a" {
                    if let Some(target) = child_element
                        .value()
                        .attr("href")
                        .and_then(|href| resolve_reference(href, base_url))
                    {
                        out.push(format!("[{}]", target));
                    }
                }
            }
            _ => {}
        }
    }
}

/// Trims every line and drops the empty ones
fn clean_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts followable links from `<a href>` and `<link rel="canonical">`
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_reference(href, base_url))
            {
                if seen.insert(absolute.clone()) {
                    links.push(absolute);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_reference(href, base_url))
            {
                if seen.insert(absolute.clone()) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

fn extract_images(roots: &[ElementRef], base_url: &Url, limit: usize) -> Vec<String> {
    let Ok(img_selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for root in roots {
        for img in root.select(&img_selector) {
            if images.len() >= limit {
                return images;
            }
            if let Some(absolute) = img
                .value()
                .attr("src")
                .and_then(|src| resolve_reference(src, base_url))
            {
                if seen.insert(absolute.clone()) {
                    images.push(absolute);
                }
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn extract(html: &str) -> Extraction {
        DefaultHtmlExtractor::new(None).extract(html, &base_url())
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  Test Page  </title></head><body></body></html>"#;
        assert_eq!(extract(html).title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body><p>x</p></body></html>"#;
        assert_eq!(extract(html).title, None);
    }

    #[test]
    fn test_text_lines_are_trimmed_and_scripts_dropped() {
        let html = r#"
            <html>
            <head><title>Shop</title><style>p { color: red; }</style></head>
            <body>
                <h1>  Products  </h1>
                <script>var tracking = 1;</script>
                <p>Blue kettle</p>

                <noscript>Enable JavaScript</noscript>
                <p>Price: 20</p>
            </body>
            </html>
        "#;
        let extraction = extract(html);
        assert_eq!(extraction.text, "Products\nBlue kettle\nPrice: 20");
    }

    #[test]
    fn test_anchor_targets_follow_anchor_text() {
        let html = r#"<html><body><p>See <a href="/kettles">kettles</a> today</p></body></html>"#;
        assert_eq!(
            extract(html).text,
            "See\nkettles\n[https://example.com/kettles]\ntoday"
        );
    }

    #[test]
    fn test_extract_links_in_order_without_duplicates() {
        let html = r#"
            <html>
            <head><link rel="canonical" href="https://example.com/page" /></head>
            <body>
                <a href="/b">B</a>
                <a href="https://other.com/a">A</a>
                <a href="/b">B again</a>
            </body>
            </html>
        "#;
        assert_eq!(
            extract(html).links,
            vec![
                "https://example.com/b",
                "https://other.com/a",
                "https://example.com/page",
            ]
        );
    }

    #[test]
    fn test_skipped_links() {
        let html = r##"
            <html><body>
                <a href="javascript:void(0)">js</a>
                <a href="mailto:test@example.com">mail</a>
                <a href="tel:+1234567890">call</a>
                <a href="data:text/html,hi">data</a>
                <a href="#section">jump</a>
                <a href="/file.pdf" download>file</a>
                <a href="/valid">valid</a>
            </body></html>
        "##;
        assert_eq!(extract(html).links, vec!["https://example.com/valid"]);
    }

    #[test]
    fn test_images_off_by_default() {
        let html = r#"<html><body><img src="/a.png"></body></html>"#;
        assert!(extract(html).images.is_empty());
    }

    #[test]
    fn test_image_limit() {
        let html = r#"
            <html><body>
                <img src="/a.png"><img src="/a.png"><img src="b.jpg">
                <img src="https://cdn.example.com/c.svg"><img alt="no source">
            </body></html>
        "#;
        let extraction = DefaultHtmlExtractor::new(Some(2)).extract(html, &base_url());
        assert_eq!(
            extraction.images,
            vec!["https://example.com/a.png", "https://example.com/b.jpg"]
        );
    }

    #[test]
    fn test_custom_selector_limits_text_but_not_links() {
        let html = r#"
            <html><body>
                <nav><a href="/next">Next page</a></nav>
                <div class="product"><h2>Kettle</h2><span>20 EUR</span></div>
                <div class="product"><h2>Teapot</h2><span>35 EUR</span></div>
            </body></html>
        "#;
        let extractor = CustomSelectorExtractor::new("div.product", None).unwrap();
        let extraction = extractor.extract(html, &base_url());

        assert_eq!(extraction.text, "Kettle\n20 EUR\nTeapot\n35 EUR");
        assert_eq!(extraction.links, vec!["https://example.com/next"]);
    }

    #[test]
    fn test_custom_selector_without_matches_is_empty() {
        let extractor = CustomSelectorExtractor::new("article", None).unwrap();
        let extraction = extractor.extract("<html><body><p>x</p></body></html>", &base_url());
        assert!(extraction.text.is_empty());
    }

    #[test]
    fn test_malformed_markup_is_best_effort() {
        let html = "<html><body><div><p>Unclosed <b>bold<p>Second</div></span>";
        let extraction = extract(html);
        assert!(extraction.text.contains("Unclosed"));
        assert!(extraction.text.contains("Second"));
    }

    #[test]
    fn test_build_extractor() {
        let config = ExtractorConfig {
            kind: ExtractorKind::CustomSelector,
            selector: Some("main".to_string()),
            ..ExtractorConfig::default()
        };
        assert!(build_extractor(&config).is_ok());

        let config = ExtractorConfig {
            kind: ExtractorKind::CustomSelector,
            selector: Some("main[".to_string()),
            ..ExtractorConfig::default()
        };
        assert!(matches!(
            build_extractor(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }
}
