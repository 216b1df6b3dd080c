//! The job-oriented conversion pipeline.
//!
//! State machine per request, terminal on success or failure:
//!   validate → resolve tools → allocate job → download (fallback ladder)
//!   → locate artifact → transcode → tag/cover mux → publish.
//!
//! Tool availability decides the shape: no downloader variant at all is
//! fatal, an absent transcoder selects pass-through mode (the original
//! artifact is published unconverted). Metadata enrichment runs
//! concurrently with the download and can only ever add tag defaults,
//! never fail the job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::conversion::audio::{transcode_to_mp3, TranscodeOptions};
use crate::conversion::tag::{fetch_cover, write_tags, TagSet};
use crate::core::config;
use crate::core::error::AppError;
use crate::core::validation;
use crate::download::cookies::CookieStore;
use crate::download::find_artifact;
use crate::download::metadata::{enrich, TrackMetadata};
use crate::download::source::{FetchRequest, SourceRegistry};
use crate::jobs::{Job, JobRegistry};
use crate::tools::ToolCache;

/// One accepted conversion request, as handed over by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    pub url: String,
    pub bitrate_kbps: u32,
    pub format: Option<String>,
    pub trim_start: Option<String>,
    pub trim_end: Option<String>,
    pub normalize: bool,
    pub tags: TagSet,
    pub cover_url: Option<String>,
}

/// Which path the pipeline took for this job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    /// Downloaded and re-encoded to MP3 at the requested bitrate
    Mp3,
    /// Original artifact returned unconverted (no transcoder available)
    Original,
}

impl ConversionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionMode::Mp3 => "mp3",
            ConversionMode::Original => "original",
        }
    }
}

/// What a finished job publishes.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub mode: ConversionMode,
    pub job_id: String,
    pub filename: String,
    pub download_url: String,
    pub bytes: u64,
    pub elapsed_ms: u64,
    pub note: Option<String>,
}

/// Pipeline wiring: tool bindings, job registry, credential store, and the
/// admission limit shared by every request.
pub struct Pipeline {
    tools: Arc<ToolCache>,
    jobs: Arc<JobRegistry>,
    cookies: Arc<CookieStore>,
    limiter: Semaphore,
    client_ladder: Vec<String>,
    strict_no_cookies: bool,
    pytube_helper: PathBuf,
    enrichment: bool,
}

impl Pipeline {
    /// Pipeline with environment-provided download policy.
    pub fn new(tools: Arc<ToolCache>, jobs: Arc<JobRegistry>, cookies: Arc<CookieStore>) -> Self {
        Self::with_policy(
            tools,
            jobs,
            cookies,
            config::CLIENT_LADDER.clone(),
            *config::STRICT_NO_COOKIES,
            PathBuf::from(shellexpand::tilde(config::PYTUBE_HELPER.as_str()).into_owned()),
            *config::limits::MAX_CONCURRENT_JOBS,
        )
    }

    /// Pipeline with explicit download policy (used by tests).
    pub fn with_policy(
        tools: Arc<ToolCache>,
        jobs: Arc<JobRegistry>,
        cookies: Arc<CookieStore>,
        client_ladder: Vec<String>,
        strict_no_cookies: bool,
        pytube_helper: PathBuf,
        max_concurrent: usize,
    ) -> Self {
        Self {
            tools,
            jobs,
            cookies,
            limiter: Semaphore::new(max_concurrent.max(1)),
            client_ladder,
            strict_no_cookies,
            pytube_helper,
            enrichment: true,
        }
    }

    /// Disable the metadata enrichment lookup (offline deployments, tests).
    pub fn without_enrichment(mut self) -> Self {
        self.enrichment = false;
        self
    }

    /// Run one conversion end to end.
    pub async fn convert(&self, request: ConvertRequest) -> Result<ConversionOutcome, AppError> {
        let started = Instant::now();

        // ── Step 1: Validate (before any subprocess is spawned) ──
        let url = validation::validate_source_url(&request.url)?;
        let bitrate = validation::validate_bitrate(request.bitrate_kbps)?;
        if let Some(ref format) = request.format {
            if format != "mp3" {
                return Err(AppError::InvalidRequest(format!(
                    "unsupported output format: {} (only mp3)",
                    format
                )));
            }
        }
        let trim = validation::validate_trim(request.trim_start.as_deref(), request.trim_end.as_deref())?;

        // Admission limit: concurrent transcodes are bounded, not unbounded
        // by whatever the host can bear
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| AppError::ToolExecution("server is shutting down".to_string()))?;

        // ── Step 2: Resolve tools ──
        let tools = self.tools.current().await;
        let registry = SourceRegistry::from_tools(
            &tools,
            self.cookies.clone(),
            self.client_ladder.clone(),
            self.strict_no_cookies,
            self.pytube_helper.clone(),
        );
        let source = registry.primary().ok_or_else(|| {
            AppError::DependencyMissing(
                "no downloader available: install yt-dlp or set TUNEPRESS_YTDLP_PATH".to_string(),
            )
        })?;

        let passthrough = tools.ffmpeg.is_none();
        if passthrough {
            log::info!("[pipeline] transcoder absent, pass-through mode for {}", url);
        }

        // ── Step 3: Allocate job ──
        let job = self.jobs.allocate().await?;

        // Metadata enrichment runs alongside the download; its result only
        // fills tag fields the caller left empty
        let enrich_handle = if !passthrough && self.enrichment && wants_enrichment(&request) {
            let enrich_url = url.clone();
            let ytdlp = tools.ytdlp.as_ref().map(|t| t.path.clone());
            Some(tokio::spawn(async move {
                enrich(&enrich_url, ytdlp.as_deref()).await
            }))
        } else {
            None
        };

        // ── Step 4: Download with the fallback ladder ──
        log::info!("[pipeline] job {} downloading via {}", job.id, source.name());
        let fetch = FetchRequest {
            url: url.clone(),
            job_dir: job.dir.clone(),
            passthrough,
        };
        source.fetch_audio(&fetch).await?;

        // ── Step 5: Locate the downloaded artifact ──
        let artifact = find_artifact(&job.dir)?;

        if passthrough {
            return self.publish_original(&job, &artifact, started).await;
        }

        let meta = match enrich_handle {
            Some(handle) => handle.await.unwrap_or_default(),
            None => TrackMetadata::default(),
        };
        let mut tags = request.tags.clone();
        tags.merge_defaults(&meta);
        let cover_ref = request.cover_url.clone().or(meta.thumbnail_url);

        // ── Step 6: Transcode ──
        let ffmpeg = tools
            .ffmpeg
            .as_ref()
            .map(|t| t.path.clone())
            .unwrap_or_default(); // unreachable: passthrough handled above
        let output = job.dir.join("output.mp3");
        log::info!("[pipeline] job {} transcoding to mp3 @ {}k", job.id, bitrate);
        transcode_to_mp3(
            &ffmpeg,
            &artifact,
            &output,
            &TranscodeOptions {
                bitrate_kbps: bitrate,
                trim,
                normalize: request.normalize,
            },
        )
        .await?;

        // ── Step 7: Tag/cover mux (second pass, stream copy) ──
        if !tags.is_empty() || cover_ref.is_some() {
            let cover = match cover_ref {
                Some(ref cover_url) => fetch_cover(cover_url, &job.dir).await,
                None => None,
            };
            log::info!(
                "[pipeline] job {} tagging (cover: {})",
                job.id,
                cover.is_some()
            );
            write_tags(&ffmpeg, &output, &tags, cover.as_deref()).await?;
        }

        // ── Step 8: Publish ──
        let bytes = tokio::fs::metadata(&output).await?.len();
        let outcome = ConversionOutcome {
            mode: ConversionMode::Mp3,
            filename: output_filename(tags.title.as_deref(), bitrate),
            download_url: JobRegistry::public_url(&job.id, "output.mp3"),
            job_id: job.id,
            bytes,
            elapsed_ms: started.elapsed().as_millis() as u64,
            note: None,
        };
        log::info!(
            "[pipeline] job {} done in {}ms ({} bytes)",
            outcome.job_id,
            outcome.elapsed_ms,
            outcome.bytes
        );
        Ok(outcome)
    }

    /// Pass-through publication: rename the artifact to its final name and
    /// return it as-is, flagged as unconverted.
    async fn publish_original(
        &self,
        job: &Job,
        artifact: &Path,
        started: Instant,
    ) -> Result<ConversionOutcome, AppError> {
        let ext = artifact
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string());

        let final_name = format!("output.{}", ext);
        let final_path = job.dir.join(&final_name);
        tokio::fs::rename(artifact, &final_path).await?;

        let bytes = tokio::fs::metadata(&final_path).await?.len();
        Ok(ConversionOutcome {
            mode: ConversionMode::Original,
            filename: format!("audio (ORIGINAL).{}", ext),
            download_url: JobRegistry::public_url(&job.id, &final_name),
            job_id: job.id.clone(),
            bytes,
            elapsed_ms: started.elapsed().as_millis() as u64,
            note: Some("transcoder unavailable: original audio returned without conversion".to_string()),
        })
    }
}

/// Enrichment is worth a lookup only when it could fill something.
fn wants_enrichment(request: &ConvertRequest) -> bool {
    request.tags.title.is_none() || request.tags.artist.is_none() || request.cover_url.is_none()
}

fn output_filename(title: Option<&str>, bitrate: u32) -> String {
    format!("{}-{}kbps.mp3", validation::safe_title(title.unwrap_or("audio")), bitrate)
}
