//! HTTP surface: the convert endpoint, diagnostics, the admin gate, and
//! static serving of published job files.

pub mod admin;
pub mod convert;
pub mod diag;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::core::error::AppError;
use crate::download::cookies::CookieStore;
use crate::pipeline::Pipeline;
use crate::tools::ToolCache;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<Pipeline>,
    pub tools: Arc<ToolCache>,
    pub cookies: Arc<CookieStore>,
    pub admin_token: Option<String>,
}

/// Assemble the full application router.
pub fn build_router(state: ApiState, jobs_root: &Path) -> Router {
    Router::new()
        .route("/api/convert", post(convert::convert_handler))
        .route("/diag", get(diag::diag_handler))
        .route("/health", get(diag::health_handler))
        .route("/admin/upload-cookies", post(admin::upload_cookies_handler))
        .route("/admin/cookies-status", get(admin::cookies_status_handler))
        .nest_service("/jobs", ServeDir::new(jobs_root))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Translate a pipeline error into the user-facing JSON error object.
///
/// 400 when the client is at fault, 500 otherwise; the message is already
/// tail-bounded by the pipeline.
pub(crate) fn error_response(err: &AppError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
