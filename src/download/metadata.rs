//! Best-effort metadata enrichment for tag defaults.
//!
//! Looks up title/author/thumbnail through a public oEmbed endpoint first,
//! falling back to the downloader's own metadata-only invocation. Failure
//! never fails the job; the lookup degrades to empty metadata and the
//! output simply goes untagged.

use url::Url;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::process::run_tool;

/// Title/author/thumbnail discovered for a source URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl TrackMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.thumbnail_url.is_none()
    }
}

/// Look up metadata for `url`, trying the oEmbed endpoint first and the
/// downloader's JSON dump second. Never fails.
pub async fn enrich(url: &Url, ytdlp_path: Option<&str>) -> TrackMetadata {
    match oembed_lookup(config::enrichment::OEMBED_ENDPOINT, url).await {
        Ok(meta) if !meta.is_empty() => {
            log::debug!("[enrich] oEmbed hit for {}: {:?}", url, meta.title);
            return meta;
        }
        Ok(_) => log::debug!("[enrich] oEmbed returned nothing useful for {}", url),
        Err(e) => log::debug!("[enrich] oEmbed lookup failed for {}: {}", url, e),
    }

    if let Some(bin) = ytdlp_path {
        match ytdlp_lookup(bin, url).await {
            Ok(meta) if !meta.is_empty() => return meta,
            Ok(_) => {}
            Err(e) => log::debug!("[enrich] downloader metadata dump failed: {}", e),
        }
    }

    TrackMetadata::default()
}

#[derive(serde::Deserialize)]
struct OembedResponse {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}

/// Query a public oEmbed endpoint for the URL's embed metadata.
pub(crate) async fn oembed_lookup(endpoint: &str, url: &Url) -> Result<TrackMetadata, AppError> {
    let client = reqwest::Client::builder()
        .timeout(config::enrichment::timeout())
        .build()?;

    let response = client
        .get(endpoint)
        .query(&[("url", url.as_str())])
        .send()
        .await?
        .error_for_status()?;

    let body: OembedResponse = response.json().await?;
    Ok(TrackMetadata {
        title: non_empty(body.title),
        author: non_empty(body.author_name),
        thumbnail_url: non_empty(body.thumbnail_url),
    })
}

/// Ask the downloader itself for metadata, without downloading.
async fn ytdlp_lookup(bin: &str, url: &Url) -> Result<TrackMetadata, AppError> {
    let args: Vec<String> = ["--no-warnings", "--no-playlist", "--dump-json", url.as_str()]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let stdout = run_tool(bin, &args, config::process::probe_timeout()).await?;
    Ok(parse_ytdlp_json(&stdout))
}

/// Pull title/author/thumbnail out of a `--dump-json` line.
pub fn parse_ytdlp_json(stdout: &str) -> TrackMetadata {
    let value: serde_json::Value = match stdout
        .lines()
        .find_map(|line| serde_json::from_str(line).ok())
    {
        Some(v) => v,
        None => return TrackMetadata::default(),
    };

    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
    };

    TrackMetadata {
        title: field(&["title"]),
        author: field(&["artist", "uploader", "channel"]),
        thumbnail_url: field(&["thumbnail"]),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
