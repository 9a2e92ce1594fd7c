//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, extract, classify and export cycle end-to-end.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::config::{
    Config, CrawlerConfig, ExtractorConfig, ModelConfig, OutputConfig, ProviderKind,
    UserAgentConfig,
};
use sumi_harvest::crawler::{Coordinator, PageContent};
use sumi_harvest::filter::{FilterError, PassthroughFilter, RelevanceFilter};
use sumi_harvest::output::{ExportFormat, ExtractedRecord, StopReason};
use sumi_harvest::{harvest, UrlStatus};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no delay, no robots and no model
fn create_test_config(max_depth: u32, max_pages: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            max_pages,
            crawl_delay: 0,
            request_timeout: 5,
            max_redirects: 5,
            follow_links: true,
            same_domain_only: false,
            respect_robots: false,
            include_patterns: vec![],
            exclude_patterns: vec![],
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        extractor: ExtractorConfig::default(),
        model: None,
        output: OutputConfig {
            format: ExportFormat::Json,
            path: "./records.json".to_string(),
            media_dir: "./media".to_string(),
            summary_path: None,
        },
    }
}

/// Mounts an HTML page at `route`
async fn mount_html(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

fn seed(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

/// Requests the server saw for `route`
async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}

#[tokio::test]
async fn test_single_page_harvest() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        "<html><head><title>Catalog</title></head><body><h1>Kettles</h1><p>Steel kettle, 20 EUR</p></body></html>",
    )
    .await;

    let (sink, report) = harvest(create_test_config(0, 10), &seed(&server))
        .await
        .unwrap();

    assert_eq!(sink.len(), 1);
    let record = &sink.records()[0];
    assert_eq!(record.source_url, seed(&server));
    assert_eq!(record.cell("title"), "Catalog");
    assert!(record.cell("text").contains("Steel kettle, 20 EUR"));
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);
}

#[tokio::test]
async fn test_depth_one_crawl_visits_linked_pages() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<body><a href="/one">1</a><a href="/two">2</a><a href="three">3</a></body>"#,
    )
    .await;
    mount_html(&server, "/one", r#"<body>One <a href="/deeper">deeper</a></body>"#).await;
    mount_html(&server, "/two", "<body>Two</body>").await;
    mount_html(&server, "/three", "<body>Three</body>").await;

    let (sink, report) = harvest(create_test_config(1, 10), &seed(&server))
        .await
        .unwrap();

    assert_eq!(report.pages_visited, 4);
    assert_eq!(sink.len(), 4);
    assert_eq!(report.skipped_depth, 1);
    assert_eq!(hits(&server, "/deeper").await, 0);

    let urls: Vec<&str> = sink.records().iter().map(|r| r.source_url.as_str()).collect();
    assert_eq!(urls[0], seed(&server));
    assert!(urls[1].ends_with("/one"));
    assert!(urls[3].ends_with("/three"));
}

#[tokio::test]
async fn test_failed_pages_do_not_stop_the_crawl() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<body><a href="/missing">gone</a><a href="/report.pdf">pdf</a><a href="/ok">ok</a></body>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/ok", "<body>Fine</body>").await;

    let config = Arc::new(create_test_config(1, 10));
    let mut coordinator = Coordinator::from_config(config).unwrap();
    let report = coordinator.run(&seed(&server)).await.unwrap();

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.pages_failed, 2);
    assert_eq!(coordinator.sink().len(), 2);

    let missing = format!("{}/missing", server.uri());
    assert_eq!(coordinator.frontier().status(&missing), Some(UrlStatus::Failed));
    assert!(report
        .failures
        .iter()
        .any(|failure| failure.url == missing && failure.reason.contains("404")));
}

#[tokio::test]
async fn test_equivalent_urls_fetched_once() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r##"<body>
            <a href="/shared">a</a>
            <a href="/shared#reviews">b</a>
            <a href="/shared/">c</a>
            <a href="/shared?utm_source=newsletter">d</a>
            <a href="/other">e</a>
        </body>"##,
    )
    .await;
    mount_html(&server, "/other", r#"<body><a href="/shared">again</a></body>"#).await;
    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<body>Shared</body>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let (sink, report) = harvest(create_test_config(2, 20), &seed(&server))
        .await
        .unwrap();

    assert_eq!(sink.len(), 3);
    assert!(report.skipped_duplicate >= 4);
}

#[tokio::test]
async fn test_discovered_urls_are_fetched_verbatim() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/docs/",
        r#"<body>Docs <a href="intro/">Intro</a> <a href="/tree?ref=dev">Tree</a></body>"#,
    )
    .await;
    mount_html(&server, "/docs/intro/", "<body>Intro</body>").await;
    Mock::given(method("GET"))
        .and(path("/tree"))
        .and(query_param("ref", "dev"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<body>Dev tree</body>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let docs = format!("{}/docs/", server.uri());
    let (sink, report) = harvest(create_test_config(1, 10), &docs).await.unwrap();

    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(hits(&server, "/docs").await, 0);
    assert_eq!(hits(&server, "/docs/intro").await, 0);

    let urls: Vec<&str> = sink.records().iter().map(|r| r.source_url.as_str()).collect();
    assert_eq!(urls[0], docs);
    assert_eq!(urls[1], format!("{}/docs/intro/", server.uri()));
    assert_eq!(urls[2], format!("{}/tree?ref=dev", server.uri()));
    assert!(sink.records()[1].cell("text").contains("Intro"));
}

#[tokio::test]
async fn test_max_pages_caps_fetches() {
    let server = MockServer::start().await;
    let links: String = (1..=6)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    mount_html(&server, "/", &format!("<body>{}</body>", links)).await;
    for i in 1..=6 {
        mount_html(&server, &format!("/p{}", i), "<body>page</body>").await;
    }

    let (sink, report) = harvest(create_test_config(1, 3), &seed(&server))
        .await
        .unwrap();

    assert_eq!(sink.len(), 3);
    assert_eq!(report.stop_reason, StopReason::PageBudget);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

/// Rate limited on the first call, passthrough afterwards
struct FlakyFilter {
    calls: AtomicUsize,
}

#[async_trait]
impl RelevanceFilter for FlakyFilter {
    async fn classify(
        &self,
        page: &PageContent,
        prompt: &str,
    ) -> Result<ExtractedRecord, FilterError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(FilterError::RateLimited {
                retry_after: Some(Duration::from_millis(10)),
            })
        } else {
            PassthroughFilter.classify(page, prompt).await
        }
    }
}

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let server = MockServer::start().await;
    mount_html(&server, "/", "<body>Retry me</body>").await;

    let config = Arc::new(create_test_config(0, 1));
    let mut coordinator = Coordinator::from_config(config)
        .unwrap()
        .with_filter(Box::new(FlakyFilter {
            calls: AtomicUsize::new(0),
        }));
    let report = coordinator.run(&seed(&server)).await.unwrap();

    assert_eq!(report.rate_limit_retries, 1);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(coordinator.sink().records()[0].cell("text"), "Retry me");
}

#[tokio::test]
async fn test_robots_disallowed_urls_are_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("User-agent: *\nDisallow: /private\n", "text/plain"),
        )
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/",
        r#"<body><a href="/private/page">secret</a><a href="/public">public</a></body>"#,
    )
    .await;
    mount_html(&server, "/public", "<body>Public</body>").await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<body>Secret</body>", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(1, 10);
    config.crawler.respect_robots = true;

    let (sink, report) = harvest(config, &seed(&server)).await.unwrap();

    assert_eq!(report.robots_blocked, 1);
    assert_eq!(sink.len(), 2);
    assert_eq!(hits(&server, "/robots.txt").await, 1);
}

#[tokio::test]
async fn test_json_export_round_trip() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body><a href="/about">About</a></body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/about",
        "<html><head><title>About</title></head><body>Us</body></html>",
    )
    .await;

    let (sink, _) = harvest(create_test_config(1, 10), &seed(&server))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("out/records.json");
    sink.export(ExportFormat::Json, &target).unwrap();

    let back: Vec<ExtractedRecord> =
        serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(back, sink.records());
    assert_eq!(back[1].cell("title"), "About");
}

#[tokio::test]
async fn test_shared_media_downloaded_once() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<body><img src="/img/logo.png"><a href="/two">two</a></body>"#,
    )
    .await;
    mount_html(&server, "/two", r#"<body><img src="img/logo.png"></body>"#).await;
    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
        .expect(1)
        .mount(&server)
        .await;

    let media = TempDir::new().unwrap();
    let mut config = create_test_config(1, 10);
    config.extractor.extract_images = true;
    config.output.media_dir = media.path().to_string_lossy().into_owned();

    let (sink, report) = harvest(config, &seed(&server)).await.unwrap();

    assert_eq!(report.media_downloaded, 1);
    let first = &sink.records()[0].media_refs;
    let second = &sink.records()[1].media_refs;
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert!(std::path::Path::new(&first[0]).exists());
}

#[tokio::test]
async fn test_model_filter_end_to_end() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        "<body><p>Steel kettle</p><p>Price: 20 EUR</p></body>",
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "```json\n{\"product\": \"Steel kettle\", \"price\": \"20 EUR\"}\n```"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let key_var = "SUMI_HARVEST_IT_MODEL_KEY";
    std::env::set_var(key_var, "sk-integration");

    let mut config = create_test_config(0, 1);
    config.model = Some(ModelConfig {
        provider: Some(ProviderKind::ChatCompletions),
        model: "test/model".to_string(),
        api_key_env: Some(key_var.to_string()),
        endpoint: Some(server.uri()),
        prompt: "product name and price".to_string(),
        chunking: false,
        chunk_size: 6000,
        rate_limit_backoff: 10,
        request_timeout: 5,
    });

    let (sink, _) = harvest(config, &seed(&server)).await.unwrap();

    let record = &sink.records()[0];
    assert_eq!(record.cell("product"), "Steel kettle");
    assert_eq!(record.cell("price"), "20 EUR");
}
