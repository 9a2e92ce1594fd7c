//! The language-model backed relevance filter

use crate::crawler::PageContent;
use crate::filter::prompt::{chunk_text, system_prompt, user_message};
use crate::filter::providers::LlmProvider;
use crate::filter::response::{merge_fields, parse_reply};
use crate::filter::{FilterError, RelevanceFilter};
use crate::output::ExtractedRecord;
use async_trait::async_trait;
use serde_json::Map;

/// Sends page text to a language model and parses its reply into fields
pub struct ModelFilter {
    provider: Box<dyn LlmProvider>,
    chunking: bool,
    chunk_size: usize,
}

impl ModelFilter {
    pub fn new(provider: Box<dyn LlmProvider>, chunking: bool, chunk_size: usize) -> Self {
        Self {
            provider,
            chunking,
            chunk_size,
        }
    }

    fn pieces(&self, text: &str) -> Vec<String> {
        if self.chunking {
            chunk_text(text, self.chunk_size)
        } else {
            vec![text.to_string()]
        }
    }
}

#[async_trait]
impl RelevanceFilter for ModelFilter {
    async fn classify(
        &self,
        page: &PageContent,
        prompt: &str,
    ) -> Result<ExtractedRecord, FilterError> {
        let text = page.extracted_text.trim();
        if text.is_empty() {
            tracing::debug!("No text on {}, skipping model call", page.url);
            return Ok(ExtractedRecord::new(page.url.clone(), Map::new()));
        }

        let system = system_prompt(prompt);
        let pieces = self.pieces(text);
        let mut fields = Map::new();

        for (index, piece) in pieces.iter().enumerate() {
            tracing::debug!(
                "Asking {} about {} (part {}/{}, {} chars)",
                self.provider.name(),
                page.url,
                index + 1,
                pieces.len(),
                piece.chars().count()
            );
            let reply = self
                .provider
                .complete(&system, &user_message(piece, prompt))
                .await?;
            merge_fields(&mut fields, parse_reply(&reply)?);
        }

        Ok(ExtractedRecord::new(page.url.clone(), fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::Extraction;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Replays canned replies and records every user message it was sent
    struct ScriptedProvider {
        replies: Mutex<Vec<Result<String, FilterError>>>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String, FilterError>>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let provider = Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                seen: Arc::clone(&seen),
            };
            (provider, seen)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String, FilterError> {
            self.seen.lock().unwrap().push(user.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn page(text: &str) -> PageContent {
        PageContent::new(
            "https://shop.example/item",
            String::new(),
            Extraction {
                text: text.to_string(),
                ..Extraction::default()
            },
        )
    }

    #[tokio::test]
    async fn test_single_request_without_chunking() {
        let (provider, seen) = ScriptedProvider::new(vec![Ok(r#"{"price": "20"}"#.to_string())]);
        let filter = ModelFilter::new(Box::new(provider), false, 5);

        let record = filter.classify(&page("line one\nline two"), "prices").await.unwrap();

        assert_eq!(record.source_url, "https://shop.example/item");
        assert_eq!(Value::Object(record.fields), json!({"price": "20"}));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("Text content: line one\nline two"));
    }

    #[tokio::test]
    async fn test_chunks_are_merged() {
        let (provider, seen) = ScriptedProvider::new(vec![
            Ok(r#"{"name": "A"}"#.to_string()),
            Ok(String::new()),
            Ok(r#"{"name": "B"}"#.to_string()),
        ]);
        let filter = ModelFilter::new(Box::new(provider), true, 8);

        let record = filter
            .classify(&page("aaaaaa\nbbbbbb\ncccccc"), "names")
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(Value::Object(record.fields), json!({"name": ["A", "B"]}));
    }

    #[tokio::test]
    async fn test_empty_text_skips_model() {
        let (provider, seen) = ScriptedProvider::new(vec![]);
        let filter = ModelFilter::new(Box::new(provider), false, 100);

        let record = filter.classify(&page("   "), "anything").await.unwrap();

        assert!(record.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let (provider, _) = ScriptedProvider::new(vec![Err(FilterError::RateLimited {
            retry_after: None,
        })]);
        let filter = ModelFilter::new(Box::new(provider), false, 100);

        let err = filter.classify(&page("text"), "p").await.unwrap_err();
        assert_eq!(err, FilterError::RateLimited { retry_after: None });
    }

    #[tokio::test]
    async fn test_malformed_reply_fails_page() {
        let (provider, _) = ScriptedProvider::new(vec![Ok("no idea".to_string())]);
        let filter = ModelFilter::new(Box::new(provider), false, 100);

        assert!(matches!(
            filter.classify(&page("text"), "p").await,
            Err(FilterError::MalformedResponse(_))
        ));
    }
}
