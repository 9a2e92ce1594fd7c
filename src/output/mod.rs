//! Output module for records, exports and crawl reports
//!
//! This module handles:
//! - Collecting extracted records in the sink
//! - Exporting records as JSON, CSV, Excel, text or HTML
//! - Downloading page media next to the export
//! - Summarizing a crawl as a report and a markdown file

mod formats;
mod markdown;
mod media;
mod record;
mod report;
mod sink;
mod traits;

pub use formats::writer_for;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use media::{media_file_name, MediaStore};
pub use record::{field_columns, flatten_value, ExtractedRecord};
pub use report::{CrawlReport, FailedUrl, StopReason};
pub use sink::Sink;
pub use traits::{ExportFormat, OutputError, OutputResult, RecordWriter};
