//! The sink: where finished records collect until export

use crate::output::formats::writer_for;
use crate::output::media::MediaStore;
use crate::output::record::ExtractedRecord;
use crate::output::traits::{ExportFormat, OutputResult};
use std::path::{Path, PathBuf};

/// Collects records in visit order and exports them on demand
///
/// Only complete records are ever pushed, so an export taken at any point
/// (including after an interrupted crawl) is a valid file.
pub struct Sink {
    records: Vec<ExtractedRecord>,
    media: Option<MediaStore>,
}

impl Sink {
    /// Creates a sink; pass a `MediaStore` to download page images
    pub fn new(media: Option<MediaStore>) -> Self {
        Self {
            records: Vec::new(),
            media,
        }
    }

    /// Stores a record, downloading `media_urls` first when media is enabled
    ///
    /// Downloads that fail are left out of `media_refs`; the record is kept.
    pub async fn emit(&mut self, mut record: ExtractedRecord, media_urls: &[String]) {
        if let Some(media) = self.media.as_mut() {
            for url in media_urls {
                if let Some(local) = media.fetch(url).await {
                    if !record.media_refs.contains(&local) {
                        record.media_refs.push(local);
                    }
                }
            }
        }

        tracing::debug!(
            "Record for {} ({} field(s), {} media)",
            record.source_url,
            record.fields.len(),
            record.media_refs.len()
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[ExtractedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExtractedRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with no fields
    pub fn empty_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_empty()).count()
    }

    pub fn media_downloaded(&self) -> usize {
        self.media.as_ref().map_or(0, MediaStore::downloaded_count)
    }

    /// Writes every record to `path` in `format`
    ///
    /// Missing parent directories are created. Returns the path written.
    pub fn export(&self, format: ExportFormat, path: &Path) -> OutputResult<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        writer_for(format).write(&self.records, path)?;
        tracing::info!(
            "Exported {} record(s) as {} to {}",
            self.records.len(),
            format,
            path.display()
        );

        Ok(path.to_path_buf())
    }
}
