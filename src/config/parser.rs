use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Max pages: {}", config.crawler.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a hex-encoded SHA-256 hash of the configuration file content
///
/// Logged at start-up so exports can be traced back to the settings that
/// produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractorKind, ProviderKind};
    use crate::output::ExportFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[crawler]
max-depth = 1
max-pages = 5

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
path = "./records.json"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();

        assert_eq!(config.crawler.max_depth, 1);
        assert_eq!(config.crawler.max_pages, 5);
        assert_eq!(config.crawler.crawl_delay, 1000);
        assert_eq!(config.crawler.request_timeout, 30);
        assert!(config.crawler.follow_links);
        assert!(config.crawler.respect_robots);
        assert!(!config.crawler.same_domain_only);
        assert_eq!(config.extractor.kind, ExtractorKind::Default);
        assert!(config.model.is_none());
        assert_eq!(config.output.format, ExportFormat::Json);
        assert_eq!(config.output.media_dir, "./media");
    }

    #[test]
    fn test_full_config() {
        let content = r#"
[crawler]
max-depth = 2
max-pages = 20
crawl-delay = 250
follow-links = true
same-domain-only = true
respect-robots = false
include-patterns = ["/products/"]
exclude-patterns = ["\\.pdf$"]

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[extractor]
kind = "custom-selector"
selector = "main article"
extract-images = true
max-images = 5

[model]
model = "gemini-2.0-flash-lite"
prompt = "product name and price"
chunking = true
chunk-size = 4000

[output]
format = "csv"
path = "./products.csv"
media-dir = "./images"
summary-path = "./summary.md"
"#;
        let config = parse_config(content).unwrap();

        assert!(config.crawler.same_domain_only);
        assert_eq!(config.crawler.include_patterns, vec!["/products/"]);
        assert_eq!(config.extractor.kind, ExtractorKind::CustomSelector);
        assert_eq!(config.extractor.max_images, 5);

        let model = config.model.unwrap();
        assert_eq!(model.provider_kind(), ProviderKind::Gemini);
        assert!(model.chunking);
        assert_eq!(model.chunk_size, 4000);

        assert_eq!(config.output.format, ExportFormat::Csv);
        assert_eq!(config.output.summary_path.as_deref(), Some("./summary.md"));
    }

    #[test]
    fn test_load_config_from_file() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.user_agent.crawler_name, "TestHarvester");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = parse_config("this is not valid TOML {{{");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_format_is_parse_error() {
        let content = MINIMAL.replace("[output]", "[output]\nformat = \"parquet\"");
        assert!(matches!(
            parse_config(&content),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_error_surfaces() {
        let content = MINIMAL.replace("max-pages = 5", "max-pages = 0");
        assert!(matches!(
            parse_config(&content),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_config_hash_stable_and_distinct() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        assert_eq!(hash1, compute_config_hash(file1.path()).unwrap());
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, compute_config_hash(file2.path()).unwrap());
    }
}
