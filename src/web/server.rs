//! Web server for FileHub.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::{Config, ServerConfig};
use crate::file::FileStorage;
use crate::{FileHubError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_static_router, create_swagger_router};

/// Web server for the file-sharing API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Server configuration.
    server_config: ServerConfig,
}

impl WebServer {
    /// Create a new web server from configuration.
    ///
    /// Initializes the storage directory and an empty registry. The registry
    /// is in-memory only; uploads are forgotten across restarts.
    pub fn new(config: &Config) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| FileHubError::Validation(format!("invalid server address: {e}")))?;

        let storage = FileStorage::new(&config.files.storage_path)?;
        tracing::info!("File storage initialized at: {}", config.files.storage_path);

        let max_upload_size = config.files.max_upload_size_mb * 1024 * 1024;
        let app_state = Arc::new(AppState::new(storage, max_upload_size));

        Ok(Self {
            addr,
            app_state,
            server_config: config.server.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared application state (for tests and embedding).
    pub fn app_state(&self) -> Arc<AppState> {
        self.app_state.clone()
    }

    fn build_router(&self) -> Router {
        let mut router = create_router(self.app_state.clone(), &self.server_config.cors_origins)
            .merge(create_health_router())
            .merge(create_swagger_router());

        if self.server_config.serve_static {
            if let Some(static_router) = create_static_router(&self.server_config.static_path) {
                router = router.merge(static_router);
            }
        }

        router.layer(CompressionLayer::new())
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
