//! POST /api/convert — the conversion endpoint and its wire types.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::api::{error_response, ApiState};
use crate::conversion::tag::TagSet;
use crate::pipeline::{ConversionOutcome, ConvertRequest};

/// Bitrate applied when the request names none.
const DEFAULT_BITRATE_KBPS: u32 = 128;

#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    #[serde(default)]
    pub url: Option<String>,
    /// Requested bitrate in kbps; `kbps` and `abr` are accepted aliases
    #[serde(default, alias = "kbps", alias = "abr")]
    pub quality: Option<u32>,
    #[serde(default)]
    pub id3: Option<Id3Body>,
    #[serde(default)]
    pub trim: Option<TrimBody>,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Id3Body {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, alias = "cover_url")]
    pub cover: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrimBody {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub mode: &'static str,
    pub filename: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    pub bytes: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<ConversionOutcome> for ConvertResponse {
    fn from(outcome: ConversionOutcome) -> Self {
        Self {
            mode: outcome.mode.as_str(),
            filename: outcome.filename,
            download_url: outcome.download_url,
            bytes: outcome.bytes,
            elapsed_ms: outcome.elapsed_ms,
            note: outcome.note,
        }
    }
}

impl ConvertBody {
    fn into_request(self) -> ConvertRequest {
        let (tags, cover_url) = match self.id3 {
            Some(id3) => (
                TagSet {
                    title: id3.title,
                    artist: id3.artist,
                    album: id3.album,
                    comment: id3.comment,
                },
                id3.cover,
            ),
            None => (TagSet::default(), None),
        };

        ConvertRequest {
            url: self.url.unwrap_or_default(),
            bitrate_kbps: self.quality.unwrap_or(DEFAULT_BITRATE_KBPS),
            format: self.format,
            trim_start: self.trim.as_ref().and_then(|t| t.start.clone()),
            trim_end: self.trim.as_ref().and_then(|t| t.end.clone()),
            normalize: self.normalize,
            tags,
            cover_url,
        }
    }
}

pub async fn convert_handler(State(state): State<ApiState>, Json(body): Json<ConvertBody>) -> Response {
    let request = body.into_request();
    log::info!("[convert] {} @ {}k", request.url, request.bitrate_kbps);

    match state.pipeline.convert(request).await {
        Ok(outcome) => Json(ConvertResponse::from(outcome)).into_response(),
        Err(err) => {
            log::error!("[convert] {}: {}", err.kind(), err);
            error_response(&err)
        }
    }
}
