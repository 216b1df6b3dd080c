//! Admin endpoints: credential upload and status, bearer-token gated.
//!
//! When no admin token is configured the gate is open (development mode);
//! a mismatched or missing token against a configured one is 401 and the
//! credential file is left untouched.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::api::ApiState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

fn authorized(state: &ApiState, headers: &HeaderMap) -> bool {
    match state.admin_token {
        None => true,
        Some(ref expected) => bearer_token(headers) == Some(expected.as_str()),
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

/// POST /admin/upload-cookies — replace the credential artifact from a raw
/// text body.
pub async fn upload_cookies_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    if body.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "empty body" }))).into_response();
    }

    match state.cookies.replace(&body).await {
        Ok(status) => Json(json!({
            "ok": true,
            "path": state.cookies.path().display().to_string(),
            "bytes": status.bytes,
            "mtime": status.mtime,
        }))
        .into_response(),
        Err(e) => {
            log::error!("[admin] cookie upload failed: {}", e);
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

/// GET /admin/cookies-status — existence/size/mtime of the credential
/// artifact.
pub async fn cookies_status_handler(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    Json(state.cookies.status().await).into_response()
}
