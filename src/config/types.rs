use crate::output::ExportFormat;
use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
///
/// Loaded once before a run and shared read-only (behind an `Arc`) by every
/// component afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// Language model settings; without this section pages are passed through
    /// as plain title/text records
    #[serde(default)]
    pub model: Option<ModelConfig>,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum link hops from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages taken from the frontier in one run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Delay between consecutive fetches (milliseconds)
    #[serde(rename = "crawl-delay", default = "default_crawl_delay")]
    pub crawl_delay: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Redirect hops followed before giving up on a URL
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Whether links found on pages are queued at all
    #[serde(rename = "follow-links", default = "default_true")]
    pub follow_links: bool,

    /// Restrict the crawl to the seed's host and its subdomains
    #[serde(rename = "same-domain-only", default)]
    pub same_domain_only: bool,

    /// Check robots.txt before every fetch and honour its Crawl-delay
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Regular expressions a URL must match (any of them) to be queued
    #[serde(rename = "include-patterns", default)]
    pub include_patterns: Vec<String>,

    /// Regular expressions that reject a URL; these win over includes
    #[serde(rename = "exclude-patterns", default)]
    pub exclude_patterns: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Which extractor turns markup into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    /// Whole `<body>` text
    #[default]
    Default,
    /// Only the text under elements matching `selector`
    CustomSelector,
}

/// Page extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub kind: ExtractorKind,

    /// CSS selector, required by the custom-selector extractor
    #[serde(default)]
    pub selector: Option<String>,

    /// Collect `<img>` references and download them into the media directory
    #[serde(rename = "extract-images", default)]
    pub extract_images: bool,

    /// Upper bound on images collected per page
    #[serde(rename = "max-images", default = "default_max_images")]
    pub max_images: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            kind: ExtractorKind::Default,
            selector: None,
            extract_images: false,
            max_images: default_max_images(),
        }
    }
}

/// Model API flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// OpenAI-style `/chat/completions` (OpenRouter, OpenAI, local servers)
    ChatCompletions,
    /// Google Generative Language `generateContent`
    Gemini,
}

/// Language model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Explicit provider; inferred from the model name when absent
    #[serde(default)]
    pub provider: Option<ProviderKind>,

    /// Model identifier, e.g. "gemini-2.0-flash-lite" or "deepseek/deepseek-chat-v3-0324:free"
    pub model: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env", default)]
    pub api_key_env: Option<String>,

    /// Base URL override for the provider API
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Natural-language description of what to extract
    pub prompt: String,

    /// Send long pages in `chunk-size` pieces instead of one request
    #[serde(default)]
    pub chunking: bool,

    /// Chunk length in characters
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Wait before the single retry of a rate-limited request (milliseconds)
    #[serde(rename = "rate-limit-backoff", default = "default_rate_limit_backoff")]
    pub rate_limit_backoff: u64,

    /// Per-request timeout for model calls (seconds)
    #[serde(rename = "request-timeout", default = "default_model_timeout")]
    pub request_timeout: u64,
}

impl ModelConfig {
    /// Returns the configured provider, or guesses it from the model name
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.unwrap_or_else(|| {
            if self.model.to_lowercase().starts_with("gemini") {
                ProviderKind::Gemini
            } else {
                ProviderKind::ChatCompletions
            }
        })
    }

    /// Returns the environment variable the API key is read from
    pub fn api_key_var(&self) -> String {
        match (&self.api_key_env, self.provider_kind()) {
            (Some(var), _) => var.clone(),
            (None, ProviderKind::Gemini) => "GEMINI_API_KEY".to_string(),
            (None, ProviderKind::ChatCompletions) => "OPENROUTER_API_KEY".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Export format for the records
    #[serde(default)]
    pub format: ExportFormat,

    /// Path of the export file
    pub path: String,

    /// Directory downloaded images are stored in
    #[serde(rename = "media-dir", default = "default_media_dir")]
    pub media_dir: String,

    /// Optional markdown run summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_crawl_delay() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_images() -> usize {
    50
}

fn default_chunk_size() -> usize {
    6000
}

fn default_rate_limit_backoff() -> u64 {
    2000
}

fn default_model_timeout() -> u64 {
    60
}

fn default_media_dir() -> String {
    "./media".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str) -> ModelConfig {
        ModelConfig {
            provider: None,
            model: name.to_string(),
            api_key_env: None,
            endpoint: None,
            prompt: "product names".to_string(),
            chunking: false,
            chunk_size: default_chunk_size(),
            rate_limit_backoff: default_rate_limit_backoff(),
            request_timeout: default_model_timeout(),
        }
    }

    #[test]
    fn test_provider_inferred_from_model_name() {
        assert_eq!(
            model("gemini-2.0-flash-lite").provider_kind(),
            ProviderKind::Gemini
        );
        assert_eq!(
            model("deepseek/deepseek-chat-v3-0324:free").provider_kind(),
            ProviderKind::ChatCompletions
        );
    }

    #[test]
    fn test_explicit_provider_wins() {
        let mut m = model("gemini-proxy");
        m.provider = Some(ProviderKind::ChatCompletions);
        assert_eq!(m.provider_kind(), ProviderKind::ChatCompletions);
    }

    #[test]
    fn test_api_key_var_defaults() {
        assert_eq!(model("gemini-1.5-pro").api_key_var(), "GEMINI_API_KEY");
        assert_eq!(model("gpt-4o-mini").api_key_var(), "OPENROUTER_API_KEY");

        let mut m = model("gpt-4o-mini");
        m.api_key_env = Some("OPENAI_API_KEY".to_string());
        assert_eq!(m.api_key_var(), "OPENAI_API_KEY");
    }

    #[test]
    fn test_user_agent_header() {
        let ua = UserAgentConfig {
            crawler_name: "SumiHarvest".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        };
        assert_eq!(
            ua.header_value(),
            "SumiHarvest/1.0 (+https://example.com/bot; bot@example.com)"
        );
    }
}
