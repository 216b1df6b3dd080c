//! Request validation: source URLs, bitrates, trim windows, filenames.
//!
//! Everything here runs before any subprocess is spawned; failures map to
//! HTTP 400.

use url::Url;

use crate::core::config::limits;
use crate::core::error::AppError;

/// Bitrates (kbps) accepted by the convert endpoint.
pub const ALLOWED_BITRATES: &[u32] = &[64, 96, 128, 160, 192, 256, 320];

/// A validated trim window, in seconds.
///
/// A start-only window seeks before decoding; an end-only window bounds the
/// output length; with both, the output duration is end − start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start_secs: Option<f64>,
    pub end_secs: Option<f64>,
}

impl TrimWindow {
    /// Length of the produced output, when the window bounds it.
    pub fn output_duration(&self) -> Option<f64> {
        match (self.start_secs, self.end_secs) {
            (Some(start), Some(end)) => Some(end - start),
            (None, Some(end)) => Some(end),
            _ => None,
        }
    }
}

/// Validate the source reference: a well-formed absolute http(s) URL.
pub fn validate_source_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest("url is required".to_string()));
    }
    if trimmed.len() > limits::MAX_URL_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "url exceeds {} characters",
            limits::MAX_URL_LENGTH
        )));
    }

    let url = Url::parse(trimmed)
        .map_err(|_| AppError::InvalidRequest("url is not a valid absolute URL".to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::InvalidRequest(format!(
            "unsupported url scheme: {}",
            other
        ))),
    }
}

/// Validate the requested bitrate against the allow-list.
pub fn validate_bitrate(kbps: u32) -> Result<u32, AppError> {
    if ALLOWED_BITRATES.contains(&kbps) {
        Ok(kbps)
    } else {
        Err(AppError::InvalidRequest(format!(
            "unsupported bitrate {} (allowed: {})",
            kbps,
            ALLOWED_BITRATES
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

/// Parse a `[HH:]MM:SS[.fff]` timestamp (or plain seconds) into seconds.
pub fn parse_timestamp(raw: &str) -> Result<f64, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest("empty timestamp".to_string()));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(AppError::InvalidRequest(format!("invalid timestamp: {}", raw)));
    }

    let mut total = 0.0;
    for (i, part) in parts.iter().rev().enumerate() {
        let value: f64 = part
            .parse()
            .map_err(|_| AppError::InvalidRequest(format!("invalid timestamp: {}", raw)))?;
        if value < 0.0 {
            return Err(AppError::InvalidRequest(format!("invalid timestamp: {}", raw)));
        }
        // Minutes and hours components must be whole numbers
        if i > 0 && value.fract() != 0.0 {
            return Err(AppError::InvalidRequest(format!("invalid timestamp: {}", raw)));
        }
        total += value * 60f64.powi(i as i32);
    }

    Ok(total)
}

/// Validate an optional trim window; end must come after start.
pub fn validate_trim(start: Option<&str>, end: Option<&str>) -> Result<Option<TrimWindow>, AppError> {
    let start_secs = start.map(parse_timestamp).transpose()?;
    let end_secs = end.map(parse_timestamp).transpose()?;

    if start_secs.is_none() && end_secs.is_none() {
        return Ok(None);
    }

    if let (Some(s), Some(e)) = (start_secs, end_secs) {
        if e <= s {
            return Err(AppError::InvalidRequest(format!(
                "trim end ({}s) must be after trim start ({}s)",
                e, s
            )));
        }
    }

    Ok(Some(TrimWindow { start_secs, end_secs }))
}

/// Reduce a title to characters that are safe in a download filename.
///
/// Falls back to "audio" when nothing survives.
pub fn safe_title(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        "audio".to_string()
    } else {
        cleaned
    }
}
