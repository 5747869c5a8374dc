//! API handlers for the FileHub Web API.

pub mod file;

pub use file::*;

use crate::file::{FileRegistry, FileStorage};

/// Shared application state, injected into request handlers.
pub struct AppState {
    /// The in-memory file metadata registry.
    pub registry: FileRegistry,
    /// The on-disk storage façade.
    pub storage: FileStorage,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Create application state with a fresh, empty registry.
    pub fn new(storage: FileStorage, max_upload_size: u64) -> Self {
        Self {
            registry: FileRegistry::new(),
            storage,
            max_upload_size,
        }
    }
}
