//! Media downloads for records
//!
//! Images are stored flat in the media directory as
//! `<first 16 hex chars of sha256(url)>.<ext>`, and every URL is attempted at
//! most once per crawl.

use crate::output::traits::{OutputError, OutputResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extensions kept as they appear in the URL
const KNOWN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "avif"];

/// Downloads media once and remembers where it went
pub struct MediaStore {
    client: Client,
    dir: PathBuf,

    /// URL -> local path, or `None` when the download failed
    downloads: HashMap<String, Option<String>>,
}

impl MediaStore {
    pub fn new(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
            downloads: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the local path for `url`, downloading it on first sight
    ///
    /// Failures are logged and remembered; `None` is returned for them.
    pub async fn fetch(&mut self, url: &str) -> Option<String> {
        if let Some(known) = self.downloads.get(url) {
            return known.clone();
        }

        let stored = match self.download(url).await {
            Ok(path) => {
                tracing::debug!("Saved {} to {}", url, path);
                Some(path)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };

        self.downloads.insert(url.to_string(), stored.clone());
        stored
    }

    /// Number of files written so far
    pub fn downloaded_count(&self) -> usize {
        self.downloads.values().filter(|v| v.is_some()).count()
    }

    async fn download(&self, url: &str) -> OutputResult<String> {
        let failure = |reason: String| OutputError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| failure(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(media_file_name(url, content_type.as_deref()));
        tokio::fs::write(&path, &bytes).await?;

        Ok(path.to_string_lossy().into_owned())
    }
}

/// File name for a media URL: hashed URL plus a best-guess extension
pub fn media_file_name(url: &str, content_type: Option<&str>) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}.{}", &digest[..16], media_extension(url, content_type))
}

/// Picks the extension from the URL path, then the Content-Type, else `png`
fn media_extension(url: &str, content_type: Option<&str>) -> String {
    let from_path = url::Url::parse(url).ok().and_then(|parsed| {
        let last = parsed.path_segments()?.last()?.to_string();
        let (_, ext) = last.rsplit_once('.')?;
        let ext = ext.to_lowercase();
        KNOWN_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    });

    if let Some(ext) = from_path {
        return ext;
    }

    let from_type = content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|ct| ct.trim().strip_prefix("image/"))
        .map(|subtype| match subtype {
            "jpeg" | "pjpeg" => "jpg".to_string(),
            "svg+xml" => "svg".to_string(),
            other => other.to_lowercase(),
        })
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()));

    from_type.unwrap_or_else(|| "png".to_string())
}
