//! Tool locator: discovers working paths for the external tools.
//!
//! Probes an ordered candidate list per tool with `--version` / `-version`
//! (tools disagree on which flag they accept), short-circuiting on the
//! first success. Absence is a normal outcome downstream logic branches
//! on, never an error. Bindings are cached for the process lifetime and
//! can be re-probed on demand for diagnostics.

use tokio::sync::RwLock;

use crate::core::config;
use crate::core::process::run_tool;

/// A bound external tool: the invocable path plus the version line it
/// reported during the probe.
#[derive(Debug, Clone)]
pub struct Tool {
    pub path: String,
    pub version: String,
}

/// Probed bindings for every tool the pipeline can use.
///
/// `None` means "absent": no transcoder switches the pipeline to
/// pass-through mode; no downloader variant at all is a hard failure.
#[derive(Debug, Clone, Default)]
pub struct Tools {
    pub ytdlp: Option<Tool>,
    pub ffmpeg: Option<Tool>,
    pub python: Option<Tool>,
}

/// Candidate invocation lists, one per logical tool.
#[derive(Debug, Clone, Default)]
pub struct ToolCandidates {
    pub ytdlp: Vec<String>,
    pub ffmpeg: Vec<String>,
    pub python: Vec<String>,
}

impl ToolCandidates {
    /// Candidate lists from environment configuration.
    pub fn from_env() -> Self {
        Self {
            ytdlp: config::tools::ytdlp_candidates(),
            ffmpeg: config::tools::ffmpeg_candidates(),
            python: config::tools::python_candidates(),
        }
    }
}

/// Probe an ordered candidate list and return the first working binding.
pub async fn locate(candidates: &[String]) -> Option<Tool> {
    for candidate in candidates.iter().filter(|c| !c.trim().is_empty()) {
        for flag in ["--version", "-version"] {
            match run_tool(candidate, &[flag.to_string()], config::process::probe_timeout()).await {
                Ok(stdout) => {
                    let version = stdout.lines().next().unwrap_or_default().to_string();
                    log::info!("[locate] found working path: {} ({})", candidate, version);
                    return Some(Tool {
                        path: candidate.clone(),
                        version,
                    });
                }
                Err(_) => continue,
            }
        }
        log::debug!("[locate] candidate not working: {}", candidate);
    }
    None
}

/// Process-wide cache of tool bindings.
///
/// Probed once at startup; `probe()` can be called again (e.g. from the
/// diagnostics endpoint) when the operator installs a tool mid-flight.
pub struct ToolCache {
    candidates: ToolCandidates,
    bound: RwLock<Tools>,
}

impl ToolCache {
    /// Create a cache with empty bindings. Invalid until probed.
    pub fn new(candidates: ToolCandidates) -> Self {
        Self {
            candidates,
            bound: RwLock::new(Tools::default()),
        }
    }

    /// Cache using the environment-provided candidate lists.
    pub fn from_env() -> Self {
        Self::new(ToolCandidates::from_env())
    }

    /// Probe every tool and replace the cached bindings.
    pub async fn probe(&self) -> Tools {
        let tools = Tools {
            ytdlp: locate(&self.candidates.ytdlp).await,
            ffmpeg: locate(&self.candidates.ffmpeg).await,
            python: locate(&self.candidates.python).await,
        };

        log::info!(
            "[locate] yt-dlp: {} | ffmpeg: {} | python: {}",
            tools.ytdlp.as_ref().map(|t| t.path.as_str()).unwrap_or("NOT FOUND"),
            tools.ffmpeg.as_ref().map(|t| t.path.as_str()).unwrap_or("NOT FOUND"),
            tools.python.as_ref().map(|t| t.path.as_str()).unwrap_or("NOT FOUND"),
        );

        *self.bound.write().await = tools.clone();
        tools
    }

    /// The current cached bindings.
    pub async fn current(&self) -> Tools {
        self.bound.read().await.clone()
    }

    /// Candidate lists (exposed for diagnostics).
    pub fn candidates(&self) -> &ToolCandidates {
        &self.candidates
    }
}
