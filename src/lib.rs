pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::middleware::request_id::{REQUEST_ID_HEADER, request_id_middleware};
use crate::config::AppConfig;
use crate::services::segmentation::Segmenter;
use crate::services::storage::StorageService;
use crate::services::upload_service::UploadService;
use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request, Response},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_image,
        api::handlers::remove_bg::remove_background,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::ImageForm,
            api::handlers::ErrorResponse,
            api::handlers::upload::UploadResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "photos", description = "Photo upload and background removal"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageService>,
    pub segmenter: Arc<dyn Segmenter>,
    pub upload_service: Arc<UploadService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageService>,
        segmenter: Arc<dyn Segmenter>,
        config: AppConfig,
    ) -> Self {
        let upload_service = Arc::new(UploadService::new(storage.clone(), config.clone()));
        Self {
            storage,
            segmenter,
            upload_service,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.storage.root());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/upload", post(api::handlers::upload::upload_image))
        .route("/remove-bg", post(api::handlers::remove_bg::remove_background))
        .nest_service("/uploads", uploads)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_request(log_request)
                .on_response(log_response),
        )
        // Outside the trace layer so every span sees the final request id
        .layer(from_fn(request_id_middleware))
        .layer(build_cors_layer(&state.config.allowed_origins))
        .layer(DefaultBodyLimit::max(state.config.max_file_size))
        .with_state(state)
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

fn log_request(request: &Request<Body>, _span: &Span) {
    tracing::info!("📥 {} {}", request.method(), request.uri());
}

fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    tracing::info!(
        "📤 Finished in {:?} with status {}",
        latency,
        response.status()
    );
}

/// Restricts cross-origin calls to the configured front-end origins.
/// A `*` entry opens the API to every origin, without credentials.
pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
