//! Output errors, export formats and the writer trait
//!
//! Every export format implements `RecordWriter`; the sink picks one with
//! `writer_for` when it is asked to export.

use crate::output::ExtractedRecord;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Media download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// File formats records can be exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// A JSON array of record objects
    #[default]
    Json,

    /// Flattened table, one row per record
    Csv,

    /// Flattened table in an Excel workbook
    #[serde(alias = "excel")]
    Xlsx,

    /// One block of `field: value` lines per record
    #[serde(alias = "txt")]
    Text,

    /// A standalone HTML page with one table
    Html,
}

impl ExportFormat {
    /// Conventional file extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Text => "txt",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Text => "text",
            Self::Html => "html",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "text" | "txt" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            other => Err(OutputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Trait for export writers
///
/// Writers receive every record at once; the sink only ever holds complete
/// records, so whatever is written is a valid export.
pub trait RecordWriter {
    /// Writes all records to `path`, replacing any existing file
    fn write(&self, records: &[ExtractedRecord], path: &Path) -> OutputResult<()>;
}
