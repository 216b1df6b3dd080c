use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Explicit yt-dlp binary override
/// Read from TUNEPRESS_YTDLP_PATH environment variable
/// When unset, the tool locator probes the conventional locations instead
pub static YTDLP_PATH: Lazy<Option<String>> = Lazy::new(|| env::var("TUNEPRESS_YTDLP_PATH").ok());

/// Explicit ffmpeg binary override
/// Read from TUNEPRESS_FFMPEG_PATH environment variable
pub static FFMPEG_PATH: Lazy<Option<String>> = Lazy::new(|| env::var("TUNEPRESS_FFMPEG_PATH").ok());

/// Explicit python interpreter override (for the pytube fallback downloader)
/// Read from TUNEPRESS_PYTHON_PATH environment variable
pub static PYTHON_PATH: Lazy<Option<String>> = Lazy::new(|| env::var("TUNEPRESS_PYTHON_PATH").ok());

/// Path to the pytube helper script invoked by the fallback downloader
/// Read from TUNEPRESS_PYTUBE_HELPER environment variable
/// Default: scripts/pytube_fetch.py (relative to the working directory)
pub static PYTUBE_HELPER: Lazy<String> =
    Lazy::new(|| env::var("TUNEPRESS_PYTUBE_HELPER").unwrap_or_else(|_| "scripts/pytube_fetch.py".to_string()));

/// Listening port for the HTTP surface
/// Read from TUNEPRESS_PORT (falls back to PORT for container platforms)
/// Default: 3000
pub static PORT: Lazy<u16> = Lazy::new(|| {
    env::var("TUNEPRESS_PORT")
        .or_else(|_| env::var("PORT"))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
});

/// Root directory for per-job working directories and published outputs
/// Read from TUNEPRESS_JOBS_ROOT environment variable
/// Supports tilde (~) expansion
/// Default: public/jobs
pub static JOBS_ROOT: Lazy<String> =
    Lazy::new(|| env::var("TUNEPRESS_JOBS_ROOT").unwrap_or_else(|_| "public/jobs".to_string()));

/// Path of the cookie file consumed by the downloader and written by the
/// admin upload endpoint
/// Read from TUNEPRESS_COOKIES_FILE environment variable
/// Default: /tmp/cookies.txt
pub static COOKIES_FILE: Lazy<String> =
    Lazy::new(|| env::var("TUNEPRESS_COOKIES_FILE").unwrap_or_else(|_| "/tmp/cookies.txt".to_string()));

/// Bearer token guarding the /admin endpoints
/// Read from TUNEPRESS_ADMIN_TOKEN environment variable
/// When unset the admin endpoints are open (development mode)
pub static ADMIN_TOKEN: Lazy<Option<String>> = Lazy::new(|| env::var("TUNEPRESS_ADMIN_TOKEN").ok());

/// When true, the download fallback ladder never attaches cookies even if
/// a credential file is present
/// Read from TUNEPRESS_STRICT_NO_COOKIES environment variable
/// Default: false
pub static STRICT_NO_COOKIES: Lazy<bool> = Lazy::new(|| {
    env::var("TUNEPRESS_STRICT_NO_COOKIES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
});

/// Alternate extraction-client identities tried by the downloader after the
/// default client fails, in order. Compatibility policy, not contract.
/// Read from TUNEPRESS_CLIENT_LADDER (comma-separated)
/// Default: android, web_safari
pub static CLIENT_LADDER: Lazy<Vec<String>> = Lazy::new(|| {
    env::var("TUNEPRESS_CLIENT_LADDER")
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|| vec!["android".to_string(), "web_safari".to_string()])
});

/// Log file path
/// Read from TUNEPRESS_LOG_FILE environment variable
/// Default: tunepress.log
pub static LOG_FILE: Lazy<String> =
    Lazy::new(|| env::var("TUNEPRESS_LOG_FILE").unwrap_or_else(|_| "tunepress.log".to_string()));

/// Tool locator candidate lists. Ordered: explicit override first, then
/// conventional absolute paths, then the bare binary name on PATH.
pub mod tools {
    use super::*;

    fn with_override(override_path: Option<&String>, rest: &[&str]) -> Vec<String> {
        let mut candidates = Vec::new();
        if let Some(path) = override_path {
            if !path.trim().is_empty() {
                candidates.push(path.clone());
            }
        }
        candidates.extend(rest.iter().map(|s| s.to_string()));
        candidates
    }

    /// Candidate invocations for the downloader.
    pub fn ytdlp_candidates() -> Vec<String> {
        with_override(
            YTDLP_PATH.as_ref(),
            &["/usr/local/bin/yt-dlp", "/usr/bin/yt-dlp", "yt-dlp"],
        )
    }

    /// Candidate invocations for the transcoder.
    pub fn ffmpeg_candidates() -> Vec<String> {
        with_override(
            FFMPEG_PATH.as_ref(),
            &["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "ffmpeg"],
        )
    }

    /// Candidate invocations for the python interpreter (fallback downloader).
    pub fn python_candidates() -> Vec<String> {
        with_override(PYTHON_PATH.as_ref(), &["python3", "python"])
    }
}

/// Subprocess timeout configuration
pub mod process {
    use super::Duration;

    /// Timeout for downloader invocations (in seconds)
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 240;

    /// Timeout for transcoder invocations (in seconds)
    pub const TRANSCODE_TIMEOUT_SECS: u64 = 120;

    /// Timeout for version probes and metadata-only invocations (in seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 10;

    /// Downloader timeout duration
    pub fn download_timeout() -> Duration {
        Duration::from_secs(DOWNLOAD_TIMEOUT_SECS)
    }

    /// Transcoder timeout duration
    pub fn transcode_timeout() -> Duration {
        Duration::from_secs(TRANSCODE_TIMEOUT_SECS)
    }

    /// Probe timeout duration
    pub fn probe_timeout() -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }
}

/// Request validation and diagnostics bounds
pub mod limits {
    use once_cell::sync::Lazy;
    use std::env;

    /// Maximum URL length accepted by the convert endpoint
    pub const MAX_URL_LENGTH: usize = 2048;

    /// Maximum lines of subprocess stderr surfaced in an error response
    pub const STDERR_TAIL_LINES: usize = 12;

    /// Maximum characters of subprocess stderr surfaced in an error response
    pub const STDERR_TAIL_CHARS: usize = 1500;

    /// Maximum pipeline runs in flight at once (admission limit)
    /// Read from TUNEPRESS_MAX_CONCURRENT_JOBS environment variable
    /// Default: 4
    pub static MAX_CONCURRENT_JOBS: Lazy<usize> = Lazy::new(|| {
        env::var("TUNEPRESS_MAX_CONCURRENT_JOBS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(4)
    });
}

/// Job directory retention configuration
pub mod retention {
    use once_cell::sync::Lazy;
    use std::env;
    use std::time::Duration;

    /// How long a job directory is kept before the sweeper reclaims it
    /// Read from TUNEPRESS_JOB_TTL_SECS environment variable
    /// Default: 86400 (24 hours)
    pub static JOB_TTL_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("TUNEPRESS_JOB_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400)
    });

    /// Interval between sweeper passes (in seconds)
    pub const SWEEP_INTERVAL_SECS: u64 = 600;

    /// Job TTL duration
    pub fn job_ttl() -> Duration {
        Duration::from_secs(*JOB_TTL_SECS)
    }

    /// Sweep interval duration
    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }
}

/// Metadata enrichment configuration
pub mod enrichment {
    use std::time::Duration;

    /// Public embed-metadata endpoint queried before falling back to the
    /// downloader's own metadata dump
    pub const OEMBED_ENDPOINT: &str = "https://noembed.com/embed";

    /// Budget for the whole enrichment lookup (in seconds)
    pub const TIMEOUT_SECS: u64 = 5;

    /// Enrichment timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}
