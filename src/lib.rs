//! FileHub - a minimal self-hosted file sharing service.
//!
//! Clients upload files over HTTP, the server persists them to disk and
//! records lightweight metadata in an in-memory registry, and serves a
//! listing plus per-file download links.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{FileHubError, Result};
pub use file::{
    FileRecord, FileRegistry, FileStorage, PendingUpload, StoredFile, DEFAULT_MAX_FILE_SIZE,
};
pub use web::WebServer;
