//! File metadata registry for FileHub.
//!
//! The registry is the in-memory, append-only list of metadata records for
//! every uploaded file, in upload order. Records are never edited or removed
//! once appended. The registry lives for the lifetime of the process; there
//! is no on-disk index, so restarting the server forgets all uploads even
//! though their bytes remain in the storage directory. This is a known
//! limitation of the design, not a feature.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{FileHubError, Result};

use super::storage::StoredFile;

/// Metadata for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique ID, derived from the creation instant.
    pub id: String,
    /// Original filename (display name). Untrusted; never used as a path.
    pub filename: String,
    /// Unique stored filename (timestamp-name format).
    pub stored_name: String,
    /// File size in bytes, equal to the on-disk size.
    pub size: u64,
    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record for a freshly stored file.
    pub fn from_upload(filename: impl Into<String>, stored: &StoredFile) -> Self {
        Self {
            id: stored.timestamp_ms.to_string(),
            filename: filename.into(),
            stored_name: stored.stored_name.clone(),
            size: stored.size,
            uploaded_at: DateTime::<Utc>::from_timestamp_millis(stored.timestamp_ms as i64)
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Append-only registry of uploaded file metadata.
///
/// Appends are serialized behind a single write lock; reads take snapshots
/// and may run concurrently with each other.
#[derive(Debug, Default)]
pub struct FileRegistry {
    records: RwLock<Vec<FileRecord>>,
}

impl FileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Append a record, echoing it back on success.
    ///
    /// Fails with `DuplicateStoredName` if the stored name is already
    /// registered. The storage naming scheme guarantees unique names, so a
    /// duplicate here is an invariant violation, not a normal client error.
    pub async fn append(&self, record: FileRecord) -> Result<FileRecord> {
        let mut records = self.records.write().await;

        if records.iter().any(|r| r.stored_name == record.stored_name) {
            return Err(FileHubError::DuplicateStoredName(record.stored_name));
        }

        records.push(record.clone());
        Ok(record)
    }

    /// Snapshot of all records in insertion order (oldest first).
    pub async fn list_all(&self) -> Vec<FileRecord> {
        self.records.read().await.clone()
    }

    /// Look up a record by its stored name.
    pub async fn find_by_stored_name(&self, stored_name: &str) -> Option<FileRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.stored_name == stored_name)
            .cloned()
    }

    /// Number of registered files.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
