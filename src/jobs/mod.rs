//! Job registry: per-request isolated working directories.
//!
//! Each accepted request gets a collision-resistant alphanumeric ID and a
//! dedicated directory under the jobs root. Directories persist after
//! completion so published results stay fetchable; a background sweeper
//! reclaims them once they outlive the retention TTL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::core::config;
use crate::core::error::AppError;

/// Length of generated job identifiers (62^12 ≈ 71 bits of entropy).
pub const JOB_ID_LEN: usize = 12;

/// One conversion request's identity and working directory.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub dir: PathBuf,
}

/// Allocates job IDs and their isolated directories under a common root.
pub struct JobRegistry {
    root: PathBuf,
}

impl JobRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Registry rooted at the configured jobs directory.
    pub fn from_env() -> Self {
        Self::new(shellexpand::tilde(config::JOBS_ROOT.as_str()).into_owned())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh job: unique ID plus a created working directory.
    pub async fn allocate(&self) -> Result<Job, AppError> {
        tokio::fs::create_dir_all(&self.root).await?;

        // ID space is large enough that collisions are theoretical, but
        // create_dir (not create_dir_all) surfaces one if it ever happens.
        for _ in 0..4 {
            let id = new_job_id();
            let dir = self.root.join(&id);
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => {
                    log::info!("[jobs] allocated {} at {}", id, dir.display());
                    return Ok(Job { id, dir });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(AppError::Io(e)),
            }
        }

        Err(AppError::Io(std::io::Error::other("job id space exhausted")))
    }

    /// Public download path for a file published inside a job directory.
    pub fn public_url(job_id: &str, file_name: &str) -> String {
        format!("/jobs/{}/{}", job_id, file_name)
    }

    /// Remove job directories whose last modification is older than `ttl`.
    ///
    /// Returns the number of directories removed. Errors on individual
    /// entries are logged and skipped so one bad directory cannot wedge
    /// the sweep.
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let mut removed = 0;

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(_) => return 0, // root not created yet
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let age = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|mtime| mtime.elapsed().ok());

            match age {
                Some(age) if age >= ttl => match tokio::fs::remove_dir_all(&path).await {
                    Ok(()) => {
                        log::info!("[jobs] reclaimed expired job dir {}", path.display());
                        removed += 1;
                    }
                    Err(e) => log::warn!("[jobs] failed to remove {}: {}", path.display(), e),
                },
                _ => {}
            }
        }

        removed
    }
}

/// Run the retention sweeper until the process exits.
pub fn spawn_sweeper(registry: Arc<JobRegistry>, ttl: Duration, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = registry.sweep_expired(ttl).await;
            if removed > 0 {
                log::info!("[jobs] retention sweep removed {} job dir(s)", removed);
            }
        }
    })
}

fn new_job_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JOB_ID_LEN)
        .map(char::from)
        .collect()
}
