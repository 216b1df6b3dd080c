//! Tag and cover-art muxing.
//!
//! A second transcoder pass copies the audio stream without re-encoding
//! while attaching ID3 metadata and, when available, a cover image as an
//! attached picture stream. The tagged file is written under a temp name
//! and renamed over the primary output, so a half-written file is never
//! published and the untagged output survives a failed pass.

use std::path::{Path, PathBuf};

use crate::core::config;
use crate::core::error::AppError;
use crate::core::process::{run_tool, stderr_tail};
use crate::download::metadata::TrackMetadata;

/// Descriptive tags attached to the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub comment: Option<String>,
}

impl TagSet {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none() && self.comment.is_none()
    }

    /// Fill fields the caller left empty from enrichment metadata.
    pub fn merge_defaults(&mut self, meta: &TrackMetadata) {
        if self.title.is_none() {
            self.title = meta.title.clone();
        }
        if self.artist.is_none() {
            self.artist = meta.author.clone();
        }
    }

    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(ref title) = self.title {
            pairs.push(("title", title.as_str()));
        }
        if let Some(ref artist) = self.artist {
            pairs.push(("artist", artist.as_str()));
        }
        if let Some(ref album) = self.album {
            pairs.push(("album", album.as_str()));
        }
        if let Some(ref comment) = self.comment {
            pairs.push(("comment", comment.as_str()));
        }
        pairs
    }
}

/// Assemble the stream-copy tagging pass.
pub fn build_tag_args(input: &Path, cover: Option<&Path>, tags: &TagSet, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(input.to_string_lossy().into_owned());

    if let Some(cover) = cover {
        args.push("-i".to_string());
        args.push(cover.to_string_lossy().into_owned());
        // Audio from the first input, picture from the second; id3v2.3 so
        // the picture lands as an APIC frame
        args.extend(
            [
                "-map",
                "0:a",
                "-map",
                "1:0",
                "-codec:a",
                "copy",
                "-codec:v",
                "copy",
                "-id3v2_version",
                "3",
                "-metadata:s:v",
                "comment=Cover (front)",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
    } else {
        args.push("-codec:a".to_string());
        args.push("copy".to_string());
    }

    for (key, value) in tags.pairs() {
        args.push("-metadata".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push(output.to_string_lossy().into_owned());
    args
}

/// Attach tags (and optionally a cover) to `target` in place.
///
/// Writes `<target>.tagged.mp3` first, then renames it over `target`.
pub async fn write_tags(ffmpeg: &str, target: &Path, tags: &TagSet, cover: Option<&Path>) -> Result<(), AppError> {
    let tagged = tagged_temp_path(target);
    let args = build_tag_args(target, cover, tags, &tagged);

    match run_tool(ffmpeg, &args, config::process::transcode_timeout()).await {
        Ok(_) => {}
        Err(err) => {
            let _ = tokio::fs::remove_file(&tagged).await;
            return Err(match err {
                AppError::Timeout(secs) => AppError::Timeout(secs),
                AppError::ToolExecution(msg) => AppError::TaggingFailed(stderr_tail(&msg)),
                other => other,
            });
        }
    }

    tokio::fs::rename(&tagged, target)
        .await
        .map_err(|e| AppError::TaggingFailed(format!("failed to replace output with tagged variant: {}", e)))
}

/// Best-effort cover download into the job directory.
pub async fn fetch_cover(url: &str, job_dir: &Path) -> Option<PathBuf> {
    let client = reqwest::Client::builder()
        .timeout(config::enrichment::timeout())
        .build()
        .ok()?;

    let bytes = match client.get(url).send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => match response.bytes().await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return None,
        },
        Err(e) => {
            log::warn!("[tag] cover fetch failed ({}): {}", url, e);
            return None;
        }
    };

    let path = job_dir.join("cover.jpg");
    match tokio::fs::write(&path, &bytes).await {
        Ok(()) => Some(path),
        Err(e) => {
            log::warn!("[tag] failed to store cover: {}", e);
            None
        }
    }
}

fn tagged_temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    target.with_file_name(format!("{}.tagged.mp3", name))
}
