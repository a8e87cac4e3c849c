//! Client-side staging of attachments.
//!
//! Files are checked at insertion time and, once accepted, held behind a
//! revocable preview until the submission resolves them to bytes. Every
//! preview is released exactly once: explicitly on removal, submission or
//! close, and otherwise when its [`PreviewHandle`] is dropped.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::{
    domain::PreviewKey,
    error::{FileRejectedError, RejectReason},
};
use tracing::{debug, warn};
use uuid::Uuid;

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "application/zip",
    "application/x-zip-compressed",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Memory(Vec<u8>),
    Path(PathBuf),
}

impl FileSource {
    pub async fn read(&self) -> Result<Vec<u8>> {
        match self {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read staged file '{}'", path.display())),
        }
    }
}

/// A file picked by the user, not yet accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub file_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub source: FileSource,
}

impl IncomingFile {
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes: bytes.len() as u64,
            mime_type: mime_type.into(),
            source: FileSource::Memory(bytes),
        }
    }

    /// Describes a file on disk without reading it; the mime type is guessed
    /// from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("attachment.bin")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self {
            file_name,
            size_bytes: metadata.len(),
            mime_type,
            source: FileSource::Path(path.to_path_buf()),
        })
    }
}

fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn check_file(file: &IncomingFile) -> Result<(), FileRejectedError> {
    let reason = if file.size_bytes > MAX_ATTACHMENT_BYTES {
        Some(RejectReason::TooLarge {
            size_bytes: file.size_bytes,
            max_bytes: MAX_ATTACHMENT_BYTES,
        })
    } else if !ALLOWED_MIME_TYPES.contains(&normalize_mime(&file.mime_type).as_str()) {
        Some(RejectReason::UnsupportedType)
    } else {
        None
    };

    match reason {
        Some(reason) => Err(FileRejectedError {
            file_name: file.file_name.clone(),
            mime_type: file.mime_type.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Holder of transient preview content, addressed by revocable keys.
pub trait PreviewStore: Send + Sync {
    fn acquire(&self, file_name: &str, source: FileSource) -> PreviewKey;
    fn resolve(&self, key: &PreviewKey) -> Option<FileSource>;
    /// Returns false when the key was unknown or already released.
    fn release(&self, key: &PreviewKey) -> bool;
}

#[derive(Default)]
pub struct MemoryPreviewStore {
    entries: Mutex<HashMap<PreviewKey, FileSource>>,
}

impl MemoryPreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl PreviewStore for MemoryPreviewStore {
    fn acquire(&self, file_name: &str, source: FileSource) -> PreviewKey {
        let key = PreviewKey::new(format!("preview:{}", Uuid::new_v4()));
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.clone(), source);
        }
        debug!(file_name, key = %key, "acquired attachment preview");
        key
    }

    fn resolve(&self, key: &PreviewKey) -> Option<FileSource> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn release(&self, key: &PreviewKey) -> bool {
        let removed = self
            .entries
            .lock()
            .map(|mut entries| entries.remove(key).is_some())
            .unwrap_or(false);
        if !removed {
            warn!(key = %key, "released unknown attachment preview");
        }
        removed
    }
}

/// Scoped ownership of one preview key.
pub struct PreviewHandle {
    key: PreviewKey,
    store: Arc<dyn PreviewStore>,
    live: bool,
}

impl PreviewHandle {
    pub fn acquire(store: Arc<dyn PreviewStore>, file_name: &str, source: FileSource) -> Self {
        let key = store.acquire(file_name, source);
        Self {
            key,
            store,
            live: true,
        }
    }

    pub fn key(&self) -> &PreviewKey {
        &self.key
    }

    pub fn resolve(&self) -> Option<FileSource> {
        self.store.resolve(&self.key)
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.live {
            self.live = false;
            self.store.release(&self.key);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("key", &self.key)
            .field("live", &self.live)
            .finish()
    }
}

#[derive(Debug)]
pub struct StagedAttachment {
    pub file_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub preview: PreviewHandle,
}

impl StagedAttachment {
    pub fn info(&self) -> StagedAttachmentInfo {
        StagedAttachmentInfo {
            file_name: self.file_name.clone(),
            size_bytes: self.size_bytes,
            mime_type: self.mime_type.clone(),
            preview_key: self.preview.key().clone(),
        }
    }
}

/// Plain descriptor of a staged attachment, safe to hand to a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedAttachmentInfo {
    pub file_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub preview_key: PreviewKey,
}

/// Result of an accepted batch. Rejections are per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentBatch {
    pub accepted: Vec<StagedAttachmentInfo>,
    pub rejected: Vec<FileRejectedError>,
}
