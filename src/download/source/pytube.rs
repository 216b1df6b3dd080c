//! Interpreter-module fallback backend.
//!
//! Drives a small python helper script (pytube) when the primary
//! downloader binary is not installed. The helper takes the URL, the
//! output directory, and the artifact basename, and lets pytube pick the
//! container extension; the pipeline discovers the file by prefix, same
//! as with the primary backend.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::process::{run_tool, stderr_tail};
use crate::download::source::{FetchRequest, MediaSource};

pub struct PytubeSource {
    python: String,
    helper: PathBuf,
}

impl PytubeSource {
    pub fn new(python: String, helper: PathBuf) -> Self {
        Self { python, helper }
    }

    fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        vec![
            self.helper.to_string_lossy().into_owned(),
            request.url.to_string(),
            request.job_dir.to_string_lossy().into_owned(),
            "audio".to_string(),
        ]
    }
}

#[async_trait]
impl MediaSource for PytubeSource {
    fn name(&self) -> &'static str {
        "pytube"
    }

    async fn fetch_audio(&self, request: &FetchRequest) -> Result<(), AppError> {
        log::info!("[pytube] fetching {} via {}", request.url, self.helper.display());

        let args = self.build_args(request);
        match run_tool(&self.python, &args, config::process::download_timeout()).await {
            Ok(_) => Ok(()),
            Err(AppError::Timeout(secs)) => Err(AppError::Timeout(secs)),
            Err(AppError::ToolExecution(msg)) => Err(AppError::DownloadFailed(stderr_tail(&msg))),
            Err(other) => Err(other),
        }
    }
}
