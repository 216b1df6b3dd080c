//! Polymorphic downloader backends.
//!
//! The deployments this service replaces grew a near-duplicate pipeline
//! per downloader tool. Here a single `MediaSource` trait covers them all:
//! - `YtDlpSource` — the primary tool, carrying the client-identity
//!   fallback ladder and optional cookie attachment
//! - `PytubeSource` — interpreter-module invocation through a python
//!   helper script
//!
//! The registry picks a backend by availability: yt-dlp when bound,
//! otherwise the python helper.

pub mod pytube;
pub mod ytdlp;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::core::error::AppError;
use crate::download::cookies::CookieStore;
use crate::tools::Tools;

/// What to fetch and where.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub job_dir: PathBuf,
    /// Prefer an already-compressed audio-only container that can be
    /// served without re-encoding (pass-through mode).
    pub passthrough: bool,
}

/// A downloader backend. Implementations write the fetched stream into the
/// job directory under the `audio.*` naming template; the pipeline locates
/// the artifact afterwards by prefix.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Human-readable backend name (e.g. "yt-dlp", "pytube").
    fn name(&self) -> &'static str;

    /// Download the best audio stream for the URL into the job directory.
    async fn fetch_audio(&self, request: &FetchRequest) -> Result<(), AppError>;
}

/// Registry of available backends, in priority order.
pub struct SourceRegistry {
    sources: Vec<Arc<dyn MediaSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Register a backend. Backends are consulted in insertion order.
    pub fn register(&mut self, source: Arc<dyn MediaSource>) {
        self.sources.push(source);
    }

    /// The highest-priority available backend, if any.
    pub fn primary(&self) -> Option<Arc<dyn MediaSource>> {
        self.sources.first().cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Build the registry from the probed tool bindings.
    pub fn from_tools(
        tools: &Tools,
        cookies: Arc<CookieStore>,
        client_ladder: Vec<String>,
        strict_no_cookies: bool,
        pytube_helper: PathBuf,
    ) -> Self {
        let mut registry = Self::new();

        if let Some(ref ytdlp) = tools.ytdlp {
            registry.register(Arc::new(ytdlp::YtDlpSource::new(
                ytdlp.path.clone(),
                cookies,
                client_ladder,
                strict_no_cookies,
            )));
        } else if let Some(ref python) = tools.python {
            if pytube_helper.is_file() {
                registry.register(Arc::new(pytube::PytubeSource::new(
                    python.path.clone(),
                    pytube_helper,
                )));
            }
        }

        registry
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
