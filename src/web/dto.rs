//! Response DTOs for the FileHub Web API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::file::FileRecord;

/// A file record as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    /// Unique file ID.
    pub id: String,
    /// Original filename.
    pub filename: String,
    /// Name the file is stored under, used in download URLs.
    pub stored_name: String,
    /// File size in bytes.
    pub size: u64,
    /// Upload instant in epoch milliseconds.
    pub uploaded: i64,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            stored_name: record.stored_name,
            size: record.size,
            uploaded: record.uploaded_at.timestamp_millis(),
        }
    }
}
