//! Parsing model replies into record fields
//!
//! Accepted reply shapes, tried in order:
//! - an empty reply (or a bare `''` / `""`): no fields
//! - a JSON object, bare or inside a ``` fence, possibly surrounded by prose
//! - a JSON array of objects: each key becomes a column array
//! - a markdown table: one row gives scalar fields, several rows give arrays

use crate::filter::FilterError;
use serde_json::{Map, Value};

/// Reply text included in `MalformedResponse` errors
const REPLY_PREVIEW: usize = 120;

/// Parses a model reply into an ordered field map
pub fn parse_reply(reply: &str) -> Result<Map<String, Value>, FilterError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() || trimmed == "''" || trimmed == "\"\"" {
        return Ok(Map::new());
    }

    if let Some(fields) = json_candidates(trimmed)
        .into_iter()
        .find_map(parse_json_fields)
    {
        return Ok(fields);
    }

    if let Some(fields) = parse_markdown_table(trimmed) {
        return Ok(fields);
    }

    let preview: String = trimmed.chars().take(REPLY_PREVIEW).collect();
    Err(FilterError::MalformedResponse(format!(
        "expected JSON or a markdown table, got: {}",
        preview
    )))
}

/// Merges `next` into `fields`; repeated keys collect into arrays
///
/// Used to combine the replies for several chunks of one page.
pub fn merge_fields(fields: &mut Map<String, Value>, next: Map<String, Value>) {
    for (key, value) in next {
        match fields.get_mut(&key) {
            None => {
                fields.insert(key, value);
            }
            Some(existing) => {
                if !existing.is_array() {
                    let first = existing.take();
                    *existing = Value::Array(vec![first]);
                }
                if let Value::Array(items) = existing {
                    match value {
                        Value::Array(more) => items.extend(more),
                        other => items.push(other),
                    }
                }
            }
        }
    }
}

/// Substrings of the reply that may hold JSON, most specific first
fn json_candidates(reply: &str) -> Vec<&str> {
    let mut candidates = Vec::new();

    if let Some(fenced) = fenced_block(reply) {
        candidates.push(fenced);
    }
    candidates.push(reply);

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (reply.find(open), reply.rfind(close)) {
            if start < end {
                candidates.push(&reply[start..=end]);
            }
        }
    }

    candidates
}

/// Contents of the first ``` fence, without its language tag
fn fenced_block(reply: &str) -> Option<&str> {
    let start = reply.find("```")?;
    let after_fence = &reply[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn parse_json_fields(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Object(map) => Some(map),
        Value::Null => Some(Map::new()),
        Value::Array(items) => rows_to_fields(items),
        _ => None,
    }
}

/// Turns an array of row objects into one array per column
fn rows_to_fields(items: Vec<Value>) -> Option<Map<String, Value>> {
    let rows: Vec<Map<String, Value>> = items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect::<Option<_>>()?;

    if rows.len() == 1 {
        return rows.into_iter().next();
    }

    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut fields = Map::new();
    for column in columns {
        let values = rows
            .iter()
            .map(|row| row.get(&column).cloned().unwrap_or(Value::Null))
            .collect();
        fields.insert(column, Value::Array(values));
    }
    Some(fields)
}

fn parse_markdown_table(reply: &str) -> Option<Map<String, Value>> {
    let lines: Vec<&str> = reply.lines().map(str::trim).collect();

    let header_index = lines.windows(2).position(|pair| {
        pair[0].starts_with('|') && is_separator_row(pair[1])
    })?;

    let header: Vec<String> = table_cells(lines[header_index])
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            if name.is_empty() {
                format!("column_{}", i + 1)
            } else {
                name
            }
        })
        .collect();

    let rows: Vec<Vec<String>> = lines[header_index + 2..]
        .iter()
        .take_while(|line| line.starts_with('|'))
        .map(|line| table_cells(line))
        .collect();

    let mut fields = Map::new();
    match rows.as_slice() {
        [] => {}
        [row] => {
            for (i, name) in header.iter().enumerate() {
                let cell = row.get(i).cloned().unwrap_or_default();
                fields.insert(name.clone(), Value::String(cell));
            }
        }
        _ => {
            for (i, name) in header.iter().enumerate() {
                let column = rows
                    .iter()
                    .map(|row| Value::String(row.get(i).cloned().unwrap_or_default()))
                    .collect();
                fields.insert(name.clone(), Value::Array(column));
            }
        }
    }

    Some(fields)
}

fn table_cells(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn is_separator_row(line: &str) -> bool {
    line.starts_with('|')
        && line.contains('-')
        && table_cells(line)
            .iter()
            .all(|cell| !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
}
