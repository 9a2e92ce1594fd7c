use crate::crawler::PageContent;
use crate::filter::{FilterError, RelevanceFilter};
use crate::output::ExtractedRecord;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Keeps every page as `{title, text}`; used when no model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFilter;

#[async_trait]
impl RelevanceFilter for PassthroughFilter {
    async fn classify(
        &self,
        page: &PageContent,
        _prompt: &str,
    ) -> Result<ExtractedRecord, FilterError> {
        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::from(page.title.clone()));
        fields.insert(
            "text".to_string(),
            Value::String(page.extracted_text.clone()),
        );
        Ok(ExtractedRecord::new(page.url.clone(), fields))
    }
}
