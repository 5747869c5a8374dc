//! File management module for FileHub.
//!
//! This module provides the two core components of the service:
//! - [`FileStorage`]: the storage façade writing uploaded bytes to disk
//!   under collision-resistant names
//! - [`FileRegistry`]: the append-only in-memory metadata registry

mod registry;
mod storage;

pub use registry::{FileRecord, FileRegistry};
pub use storage::{
    sanitize_display_name, validate_stored_name, FileStorage, PendingUpload, StoredFile,
};

/// Maximum length for a display filename (in characters).
pub const MAX_FILENAME_LENGTH: usize = 100;

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
