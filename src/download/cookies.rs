//! Credential store for downloader cookies.
//!
//! Holds an optional Netscape-format cookie file at a well-known path:
//! written by the authenticated admin endpoint, read by the downloader's
//! final fallback strategy when present. Absent is the normal state;
//! unauthenticated strategies always run first.
//!
//! Replacement is atomic (write to a temp name, rename over the target)
//! under a write lock, so a concurrent download can never observe a
//! half-written file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::core::config;

/// Reported state of the credential artifact.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CookieStatus {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
}

impl CookieStatus {
    fn absent() -> Self {
        Self {
            exists: false,
            bytes: None,
            mtime: None,
        }
    }
}

/// The process-wide cookie file, with serialized replacement.
pub struct CookieStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the configured cookie file path.
    pub fn from_env() -> Self {
        Self::new(shellexpand::tilde(config::COOKIES_FILE.as_str()).into_owned())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a non-empty credential artifact is available right now.
    pub fn is_present(&self) -> bool {
        std::fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false)
    }

    /// Replace the cookie file contents atomically.
    ///
    /// The payload is opaque by contract; a body that does not look like a
    /// Netscape cookie file is accepted but logged, since the downloader
    /// will reject it loudly later.
    pub async fn replace(&self, content: &str) -> Result<CookieStatus> {
        if content.trim().is_empty() {
            bail!("empty cookie payload");
        }

        if !looks_like_netscape(content) {
            log::warn!(
                "[cookies] uploaded payload does not look like a Netscape cookie file ({} bytes)",
                content.len()
            );
        }

        let _lock = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension(format!("tmp.{}", std::process::id()));
        tokio::fs::write(&temp_path, content).await?;

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            bail!("failed to rename cookie file into place: {}", e);
        }

        log::info!("[cookies] credential file replaced: {}", self.path.display());
        Ok(self.status().await)
    }

    /// Existence, size, and modification time of the artifact.
    pub async fn status(&self) -> CookieStatus {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => CookieStatus {
                exists: true,
                bytes: Some(meta.len()),
                mtime: meta.modified().ok().map(DateTime::<Utc>::from),
            },
            Err(_) => CookieStatus::absent(),
        }
    }
}

/// Heuristic check for Netscape cookie file format: the conventional
/// header plus at least one tab-separated cookie line.
pub fn looks_like_netscape(content: &str) -> bool {
    let has_header = content.lines().any(|line| {
        let trimmed = line.trim();
        trimmed.starts_with("# Netscape HTTP Cookie File") || trimmed.starts_with("# HTTP Cookie File")
    });

    let has_cookies = content.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed.split('\t').count() >= 7
    });

    has_header && has_cookies
}
