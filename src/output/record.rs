//! The record type produced for every visited page

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Structured fields pulled out of one page
///
/// `fields` keeps the order in which the model returned the keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub source_url: String,

    pub fields: Map<String, Value>,

    /// Local paths of downloaded media, in page order
    #[serde(default)]
    pub media_refs: Vec<String>,
}

impl ExtractedRecord {
    pub fn new(source_url: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            source_url: source_url.into(),
            fields,
            media_refs: Vec::new(),
        }
    }

    /// True when the model found nothing matching the prompt
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders one field as a flat cell value for tabular exports
    pub fn cell(&self, field: &str) -> String {
        self.fields.get(field).map(flatten_value).unwrap_or_default()
    }
}

/// Field names across all records, in first-seen order
pub fn field_columns(records: &[ExtractedRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        for key in record.fields.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    columns
}

/// Flattens a JSON value into a single cell
///
/// Strings are written as-is, arrays are joined with `"; "`, objects fall back
/// to their compact JSON text.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(flatten_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(_) => value.to_string(),
    }
}
