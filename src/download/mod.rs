//! Download orchestration: credential store, metadata enrichment, and the
//! polymorphic media source backends.

pub mod cookies;
pub mod metadata;
pub mod source;

use std::path::{Path, PathBuf};

use crate::core::error::AppError;

/// Filename prefix of the downloader output template (`audio.%(ext)s`).
///
/// The container format is not known in advance, so the produced file is
/// discovered by this prefix rather than by full name.
pub const ARTIFACT_PREFIX: &str = "audio.";

/// Find the downloaded artifact inside a job directory.
///
/// Lexicographic tie-break if the downloader produced several matches.
/// `ArtifactNotFound` here means the downloader reported success but left
/// no file; treated as fatal for the job.
pub fn find_artifact(job_dir: &Path) -> Result<PathBuf, AppError> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(job_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_name().to_string_lossy().starts_with(ARTIFACT_PREFIX)
                && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();

    matches.sort();

    matches.into_iter().next().ok_or_else(|| {
        AppError::ArtifactNotFound(format!(
            "no '{}*' file in {}",
            ARTIFACT_PREFIX,
            job_dir.display()
        ))
    })
}
