//! Language model providers
//!
//! Each provider turns a (system prompt, user message) pair into the model's
//! reply text and maps transport failures onto `FilterError`.

use crate::config::{ModelConfig, ProviderKind};
use crate::filter::FilterError;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Error bodies are cut to this many characters in messages
const ERROR_BODY_PREVIEW: usize = 200;

/// Trait implemented by concrete LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, user: &str) -> Result<String, FilterError>;
}

/// Picks the provider for a model configuration
pub fn build_provider(
    config: &ModelConfig,
    client: Client,
    api_key: String,
) -> Box<dyn LlmProvider> {
    let endpoint = config.endpoint.as_deref();
    match config.provider_kind() {
        ProviderKind::Gemini => Box::new(GeminiProvider::new(
            client,
            api_key,
            config.model.clone(),
            endpoint,
        )),
        ProviderKind::ChatCompletions => Box::new(ChatCompletionsProvider::new(
            client,
            api_key,
            config.model.clone(),
            endpoint,
        )),
    }
}

/// OpenAI-compatible `/chat/completions` (OpenRouter by default)
pub struct ChatCompletionsProvider {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl ChatCompletionsProvider {
    pub fn new(client: Client, api_key: String, model: String, endpoint: Option<&str>) -> Self {
        Self {
            client,
            api_key,
            model,
            endpoint: endpoint
                .unwrap_or(OPENROUTER_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        "chat-completions"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, FilterError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(self.name(), e))?;

        let parsed: ChatResponse = check_status(self.name(), response)
            .await?
            .json()
            .await
            .map_err(|e| FilterError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| FilterError::MalformedResponse("response has no choices".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Google Generative Language `generateContent`
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: String, model: String, endpoint: Option<&str>) -> Self {
        Self {
            client,
            api_key,
            model,
            endpoint: endpoint
                .unwrap_or(GEMINI_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, FilterError> {
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: user }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.endpoint, self.model
            ))
            .header("x-goog-api-key", self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(self.name(), e))?;

        let parsed: GeminiResponse = check_status(self.name(), response)
            .await?
            .json()
            .await
            .map_err(|e| FilterError::MalformedResponse(e.to_string()))?;

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            FilterError::MalformedResponse("response has no candidates".to_string())
        })?;

        Ok(candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyPart {
    text: Option<String>,
}

/// Maps a non-success status onto a `FilterError`
async fn check_status(provider: &str, response: Response) -> Result<Response, FilterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(FilterError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    Err(FilterError::ModelUnavailable(format!(
        "{} returned {}: {}",
        provider, status, preview
    )))
}

fn send_error(provider: &str, error: reqwest::Error) -> FilterError {
    if error.is_timeout() {
        FilterError::ModelUnavailable(format!("{} request timed out", provider))
    } else {
        FilterError::ModelUnavailable(format!("{} request failed: {}", provider, error))
    }
}
