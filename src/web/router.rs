//! Router configuration for the Web API.

use axum::{
    extract::DefaultBodyLimit,
    http::header::{ACCEPT, CONTENT_TYPE},
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::FileResponse;
use super::handlers::{download_file, list_files, upload_file, AppState};

/// Headroom added to the body limit for multipart framing overhead, so the
/// configured maximum applies to the file content itself.
const UPLOAD_BODY_OVERHEAD: usize = 64 * 1024;

/// OpenAPI documentation for the file API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::handlers::file::upload_file,
        crate::web::handlers::file::list_files,
        crate::web::handlers::file::download_file,
    ),
    components(schemas(FileResponse)),
    tags(
        (name = "files", description = "File upload, listing, and download")
    )
)]
struct ApiDoc;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = app_state.max_upload_size as usize + UPLOAD_BODY_OVERHEAD;

    let api_routes = Router::new()
        .route("/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/download/:stored_name", get(download_file));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                // Raised above the configured maximum so the storage façade,
                // not the framework default, enforces the upload cap
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}

/// Create a CORS layer from configuration.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let parsed_origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed_origins.is_empty() {
        // Development mode: allow any origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([CONTENT_TYPE, ACCEPT])
            .allow_origin(parsed_origins)
    }
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create the Swagger UI router with the OpenAPI document.
pub fn create_swagger_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Create a router serving the static front-end, if the directory exists.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let path = std::path::Path::new(static_path);
    if !path.is_dir() {
        tracing::warn!(
            "Static path '{}' not found; static serving disabled",
            static_path
        );
        return None;
    }

    Some(Router::new().fallback_service(ServeDir::new(path)))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
