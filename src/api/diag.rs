//! Diagnostics endpoints: tool availability/versions and liveness.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::ApiState;
use crate::tools::Tool;

#[derive(Debug, Default, Deserialize)]
pub struct DiagQuery {
    /// Force a fresh probe of every tool instead of reading the cache
    #[serde(default)]
    pub refresh: bool,
}

fn tool_fields(tool: Option<&Tool>) -> (Value, Value, bool) {
    match tool {
        Some(t) => (json!(t.path), json!(t.version), true),
        None => (Value::Null, Value::Null, false),
    }
}

/// GET /diag — tool bindings, candidate lists, and credential status.
pub async fn diag_handler(State(state): State<ApiState>, Query(query): Query<DiagQuery>) -> Json<Value> {
    let tools = if query.refresh {
        state.tools.probe().await
    } else {
        state.tools.current().await
    };

    let (ytdlp_path, ytdlp_version, has_ytdlp) = tool_fields(tools.ytdlp.as_ref());
    let (ffmpeg_path, ffmpeg_version, has_ffmpeg) = tool_fields(tools.ffmpeg.as_ref());
    let (python_path, python_version, has_python) = tool_fields(tools.python.as_ref());

    let candidates = state.tools.candidates();

    Json(json!({
        "yt_dlp_path": ytdlp_path,
        "yt_dlp_version": ytdlp_version,
        "has_yt_dlp": has_ytdlp,
        "ffmpeg_path": ffmpeg_path,
        "ffmpeg_version": ffmpeg_version,
        "has_ffmpeg": has_ffmpeg,
        "python_path": python_path,
        "python_version": python_version,
        "has_python": has_python,
        "possible_ytdlp_paths": candidates.ytdlp,
        "possible_ffmpeg_paths": candidates.ffmpeg,
        "cookies": state.cookies.status().await,
    }))
}

/// GET /health — liveness probe.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}
