use crate::config::types::{
    Config, CrawlerConfig, ExtractorConfig, ExtractorKind, ModelConfig, OutputConfig,
    UserAgentConfig,
};
use crate::url::UrlFilter;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_extractor_config(&config.extractor)?;
    if let Some(model) = &config.model {
        validate_model_config(model)?;
    }
    validate_output_config(&config.output, &config.extractor)?;
    Ok(())
}

/// Validates crawler limits and URL patterns
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_depth > 100 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be <= 100, got {}",
            config.max_depth
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be at least 1 second".to_string(),
        ));
    }

    if config.max_redirects > 30 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 30, got {}",
            config.max_redirects
        )));
    }

    // Compiling is the validation; the crawler compiles its own copy.
    UrlFilter::new(
        config.include_patterns.as_slice(),
        config.exclude_patterns.as_slice(),
    )?;

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the extractor choice and its selector
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    match (config.kind, config.selector.as_deref()) {
        (ExtractorKind::CustomSelector, None) => {
            return Err(ConfigError::Validation(
                "the custom-selector extractor needs a selector".to_string(),
            ));
        }
        (_, Some(selector)) => {
            Selector::parse(selector)
                .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
        }
        (ExtractorKind::Default, None) => {}
    }

    if config.extract_images && config.max_images < 1 {
        return Err(ConfigError::Validation(
            "max_images must be >= 1 when extract_images is on".to_string(),
        ));
    }

    Ok(())
}

/// Validates model settings (the API key itself is checked when the filter is built)
fn validate_model_config(config: &ModelConfig) -> Result<(), ConfigError> {
    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.prompt.trim().is_empty() {
        return Err(ConfigError::Validation(
            "extraction prompt cannot be empty".to_string(),
        ));
    }

    if config.chunk_size < 100 {
        return Err(ConfigError::Validation(format!(
            "chunk_size must be >= 100 characters, got {}",
            config.chunk_size
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "model request_timeout must be at least 1 second".to_string(),
        ));
    }

    if let Some(endpoint) = &config.endpoint {
        Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid model endpoint: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(
    config: &OutputConfig,
    extractor: &ExtractorConfig,
) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if extractor.extract_images && config.media_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "media_dir cannot be empty when extract_images is on".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
