//! Shared types for the submission pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

// ── Selected file ───────────────────────────────────────────────────

/// Where a selected file's contents live.
///
/// A picked file may already be in memory (drag-and-drop style) or may
/// be a handle to disk that is read per attempt, like a browser `File`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Contents held in memory.
    Memory(Vec<u8>),
    /// Contents read from disk at encode time.
    Disk(PathBuf),
}

/// The file a user picked for one form instance.
///
/// Exactly one may be held per form instance; a new valid selection
/// replaces it wholesale, and it is cleared on successful submission or
/// explicit reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Display name, e.g. `photo.png`.
    pub name: String,
    /// Declared media type, e.g. `image/png`.
    pub mime_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Where the raw bytes come from.
    pub source: FileSource,
}

impl SelectedFile {
    /// A file whose contents are already in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        raw_bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: raw_bytes.len() as u64,
            source: FileSource::Memory(raw_bytes),
        }
    }

    /// A file on disk, media type inferred from the extension.
    ///
    /// The contents are not read here; they are read (and re-read) per
    /// submission attempt.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, EncodeError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| EncodeError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            mime_type,
            size_bytes: meta.len(),
            source: FileSource::Disk(path.to_path_buf()),
        })
    }

    /// Produce the raw bytes, reading from disk when needed.
    pub async fn read(&self) -> Result<Vec<u8>, EncodeError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Disk(path) => {
                tokio::fs::read(path).await.map_err(|e| EncodeError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        }
    }
}

// ── Wire payload ────────────────────────────────────────────────────

/// One submission attempt's wire payload.
///
/// Built fresh per attempt and dropped when the attempt completes.
/// Serializes to the field names the backend reads: `email`,
/// `fileName`, `fileData`, `mimeType`, `isAdmin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// Submitter's email address.
    #[serde(rename = "email")]
    pub recipient_email: String,
    /// Original file name.
    pub file_name: String,
    /// Base64-encoded file contents.
    #[serde(rename = "fileData")]
    pub file_bytes_encoded: String,
    /// Declared media type.
    pub mime_type: String,
    /// Routes to the admin destination sheet when set.
    #[serde(rename = "isAdmin")]
    pub destination_flag: bool,
}

// ── Local check result ──────────────────────────────────────────────

/// Result of checking a candidate file. Produced and consumed
/// synchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl ValidationResult {
    /// An accepted candidate.
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    /// A rejected candidate with a user-facing reason.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

// ── Transport outcome ───────────────────────────────────────────────

/// Normalized result of one completed transport exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub accepted: bool,
    pub error_detail: Option<String>,
}

impl SubmissionOutcome {
    /// The backend accepted the submission.
    pub fn success() -> Self {
        Self {
            accepted: true,
            error_detail: None,
        }
    }

    /// The backend rejected the submission.
    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            accepted: false,
            error_detail: Some(detail.into()),
        }
    }
}
