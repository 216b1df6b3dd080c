use thiserror::Error;

/// Centralized error taxonomy for the conversion service.
///
/// Every subprocess failure is caught at the pipeline boundary and becomes
/// one of these variants; the HTTP layer maps each to a JSON error object
/// with a status reflecting whether the client or the server is at fault.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad URL, bad bitrate, bad trim window: user error, not retried
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A required external tool is absent: operator error, not retried
    #[error("missing dependency: {0}")]
    DependencyMissing(String),

    /// Every download strategy in the fallback ladder was exhausted
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// The downloader reported success but left no file behind
    #[error("downloaded artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Transcoder invocation failed
    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    /// Tag/cover muxing pass failed (untagged output remains valid)
    #[error("tagging failed: {0}")]
    TaggingFailed(String),

    /// Generic tool invocation failure (non-zero exit or spawn error),
    /// translated into a more specific variant at the pipeline boundary
    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    /// External process exceeded its timeout and was terminated
    #[error("process timed out after {0}s")]
    Timeout(u64),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP/fetch errors (metadata enrichment, cover art)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Stable label for logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::DependencyMissing(_) => "dependency_missing",
            AppError::DownloadFailed(_) => "download_failed",
            AppError::ArtifactNotFound(_) => "artifact_not_found",
            AppError::TranscodeFailed(_) => "transcode_failed",
            AppError::TaggingFailed(_) => "tagging_failed",
            AppError::ToolExecution(_) => "tool_execution",
            AppError::Timeout(_) => "timeout",
            AppError::Io(_) => "io",
            AppError::Http(_) => "http",
            AppError::Url(_) => "url",
        }
    }

    /// True when the client, not the server, is at fault (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::InvalidRequest(_) | AppError::Url(_))
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
