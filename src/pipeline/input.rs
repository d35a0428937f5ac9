//! Input resolution: turn a user-supplied path or URL into a [`SourceDocument`].
//!
//! Documents are held in memory: pdfium opens them from a byte slice, so a
//! downloaded PDF never touches the file system. The `%PDF` magic bytes are
//! checked up front so callers get a meaningful error rather than a pdfium
//! parse failure deep inside rasterisation.

use crate::error::GapExamError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One supplied PDF: a display name plus its raw bytes.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SourceDocument {
    /// Wrap in-memory PDF bytes, validating the magic bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self, GapExamError> {
        let name = name.into();
        let bytes: Vec<u8> = bytes.into();
        if !bytes.starts_with(b"%PDF") {
            return Err(GapExamError::NotAPdf {
                name,
                magic: bytes.iter().take(4).copied().collect(),
            });
        }
        Ok(Self {
            name,
            bytes: bytes.into(),
        })
    }

    /// Read a local PDF file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, GapExamError> {
        let path = path.as_ref().to_path_buf();
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GapExamError::FileNotFound { path: path.clone() },
            std::io::ErrorKind::PermissionDenied => {
                GapExamError::PermissionDenied { path: path.clone() }
            }
            _ => GapExamError::FileNotFound { path: path.clone() },
        })?;
        debug!("Read local PDF {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(display_name(&path), bytes)
    }

    /// Download a PDF over HTTP(S).
    pub async fn from_url(url: &str, timeout_secs: u64) -> Result<Self, GapExamError> {
        info!("Downloading PDF from: {}", url);
        let failed = |reason: String| GapExamError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| failed(e.to_string()))?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                failed(format!("timed out after {timeout_secs}s"))
            } else {
                failed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        info!("Downloaded {} bytes from {}", bytes.len(), url);
        Self::from_bytes(filename_from_url(url), bytes.to_vec())
    }

    /// Resolve a CLI-style input: URL if it starts with http(s)://, else a path.
    pub async fn resolve(input: &str, timeout_secs: u64) -> Result<Self, GapExamError> {
        if is_url(input) {
            Self::from_url(input, timeout_secs).await
        } else {
            Self::from_path(PathBuf::from(input)).await
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last path segment of the URL if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
