//! Relevance filter: page text plus an extraction prompt into a record
//!
//! This module contains:
//! - The `RelevanceFilter` trait the coordinator calls once per page
//! - `ModelFilter`, which asks a language model through an `LlmProvider`
//! - `PassthroughFilter`, used when no model is configured
//! - Prompt construction, chunking and reply parsing

mod model;
mod passthrough;
mod prompt;
mod providers;
mod response;

pub use model::ModelFilter;
pub use passthrough::PassthroughFilter;
pub use prompt::{chunk_text, system_prompt, user_message};
pub use providers::{build_provider, ChatCompletionsProvider, GeminiProvider, LlmProvider};
pub use response::{merge_fields, parse_reply};

use crate::config::Config;
use crate::crawler::PageContent;
use crate::output::ExtractedRecord;
use crate::ConfigError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from classifying a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The provider asked us to slow down; `retry_after` comes from the
    /// `Retry-After` header when present
    #[error("Rate limited by model provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

/// Turns one page into one record
#[async_trait]
pub trait RelevanceFilter: Send + Sync {
    async fn classify(
        &self,
        page: &PageContent,
        prompt: &str,
    ) -> Result<ExtractedRecord, FilterError>;
}

/// Builds the filter described by `config`
///
/// Without a `[model]` section pages pass through as `{title, text}`.
/// Otherwise the API key is read from the configured environment variable,
/// and a missing or empty key is a configuration error.
pub fn build_filter(config: &Config) -> Result<Box<dyn RelevanceFilter>, ConfigError> {
    let Some(model) = &config.model else {
        tracing::info!("No model configured, records will hold page title and text");
        return Ok(Box::new(PassthroughFilter));
    };

    let var = model.api_key_var();
    let api_key = std::env::var(&var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingApiKey(var.clone()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(model.request_timeout))
        .build()
        .map_err(|e| ConfigError::Validation(format!("Failed to build model client: {}", e)))?;

    let provider = build_provider(model, client, api_key);
    tracing::info!(
        "Using model {} via {} (chunking: {})",
        model.model,
        provider.name(),
        model.chunking
    );

    Ok(Box::new(ModelFilter::new(
        provider,
        model.chunking,
        model.chunk_size,
    )))
}
