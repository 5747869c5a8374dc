//! Web API module for FileHub.
//!
//! Provides the REST API for uploading, listing, and downloading files,
//! plus the health endpoint, Swagger UI, and static front-end serving.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
