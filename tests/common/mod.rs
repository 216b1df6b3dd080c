//! Shared helpers for integration tests: stub external tools and pipeline
//! wiring.
//!
//! The stubs are generated shell scripts standing in for yt-dlp/ffmpeg.
//! Each records its argv into a log file so tests can assert on the exact
//! invocation, and produces the files the real tool would leave behind.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tunepress::download::cookies::CookieStore;
use tunepress::jobs::JobRegistry;
use tunepress::tools::{ToolCache, ToolCandidates};
use tunepress::Pipeline;

/// Write an executable shell script into `dir` and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stub yt-dlp: answers the version probe, records argv, and drops a fake
/// artifact into the `-o` template's directory.
pub fn stub_ytdlp_ok(dir: &Path, args_log: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-yt-dlp",
        &format!(
            r#"if [ "$1" = "--version" ]; then echo "2026.01.31"; exit 0; fi
echo "$@" >> "{log}"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
outdir=$(dirname "$out")
printf 'fake-audio-bytes' > "$outdir/audio.m4a"
exit 0"#,
            log = args_log.display()
        ),
    )
}

/// Stub yt-dlp that fails every download invocation.
pub fn stub_ytdlp_failing(dir: &Path, args_log: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-yt-dlp",
        &format!(
            r#"if [ "$1" = "--version" ]; then echo "2026.01.31"; exit 0; fi
echo "$@" >> "{log}"
echo "ERROR: This content is not available on this app" >&2
exit 1"#,
            log = args_log.display()
        ),
    )
}

/// Stub yt-dlp that succeeds only when `--cookies` is among its arguments.
pub fn stub_ytdlp_needs_cookies(dir: &Path, args_log: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-yt-dlp",
        &format!(
            r#"if [ "$1" = "--version" ]; then echo "2026.01.31"; exit 0; fi
echo "$@" >> "{log}"
out=""
prev=""
with_cookies=0
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  if [ "$a" = "--cookies" ]; then with_cookies=1; fi
  prev="$a"
done
if [ "$with_cookies" = "1" ]; then
  outdir=$(dirname "$out")
  printf 'fake-audio-bytes' > "$outdir/audio.m4a"
  exit 0
fi
echo "ERROR: Sign in to confirm you are not a bot" >&2
exit 1"#,
            log = args_log.display()
        ),
    )
}

/// Stub yt-dlp that reports success but creates no file at all.
pub fn stub_ytdlp_silent(dir: &Path, args_log: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-yt-dlp",
        &format!(
            r#"if [ "$1" = "--version" ]; then echo "2026.01.31"; exit 0; fi
echo "$@" >> "{log}"
exit 0"#,
            log = args_log.display()
        ),
    )
}

/// Stub ffmpeg: rejects `--version` but answers `-version` (exercising the
/// locator's second probe flag), records argv, and writes its last
/// argument as the output file.
pub fn stub_ffmpeg_ok(dir: &Path, args_log: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-ffmpeg",
        &format!(
            r#"if [ "$1" = "--version" ]; then exit 1; fi
if [ "$1" = "-version" ]; then echo "ffmpeg version 6.0-fake"; exit 0; fi
echo "$@" >> "{log}"
for a in "$@"; do last="$a"; done
printf 'fake-mp3-bytes' > "$last"
exit 0"#,
            log = args_log.display()
        ),
    )
}

/// Stub ffmpeg that fails every transcode invocation.
pub fn stub_ffmpeg_failing(dir: &Path, args_log: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-ffmpeg",
        &format!(
            r#"if [ "$1" = "-version" ]; then echo "ffmpeg version 6.0-fake"; exit 0; fi
if [ "$1" = "--version" ]; then exit 1; fi
echo "$@" >> "{log}"
echo "Error while decoding stream" >&2
exit 1"#,
            log = args_log.display()
        ),
    )
}

/// A probed tool cache bound to the given stub paths.
pub async fn tool_cache(ytdlp: Option<&Path>, ffmpeg: Option<&Path>) -> Arc<ToolCache> {
    let to_candidates = |p: Option<&Path>| {
        p.map(|p| vec![p.to_string_lossy().into_owned()])
            .unwrap_or_default()
    };

    let cache = Arc::new(ToolCache::new(ToolCandidates {
        ytdlp: to_candidates(ytdlp),
        ffmpeg: to_candidates(ffmpeg),
        python: Vec::new(),
    }));
    cache.probe().await;
    cache
}

/// Pipeline wired against a temp jobs root and cookie path, enrichment
/// disabled so tests never reach the network.
pub fn pipeline_with(
    tools: Arc<ToolCache>,
    jobs_root: &Path,
    cookies_path: &Path,
) -> (Arc<Pipeline>, Arc<JobRegistry>, Arc<CookieStore>) {
    let jobs = Arc::new(JobRegistry::new(jobs_root));
    let cookies = Arc::new(CookieStore::new(cookies_path));
    let pipeline = Arc::new(
        Pipeline::with_policy(
            tools,
            jobs.clone(),
            cookies.clone(),
            vec!["android".to_string()],
            false,
            PathBuf::from("/nonexistent/pytube_fetch.py"),
            4,
        )
        .without_enrichment(),
    );
    (pipeline, jobs, cookies)
}

/// Contents of a stub's argv log; empty string when nothing was recorded.
pub fn read_args_log(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Netscape-format cookie payload used across tests.
pub const COOKIE_PAYLOAD: &str = "# Netscape HTTP Cookie File\n\
.example.com\tTRUE\t/\tTRUE\t1999999999\tSID\tabc123\n";

// ── HTTP helpers for router-level tests ──

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// One-shot a request and return (status, raw body bytes).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, bytes)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
    (status, parse_json(&bytes))
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, parse_json(&bytes))
}

/// POST a raw text body, optionally with a bearer token.
pub async fn post_text(app: Router, uri: &str, bearer: Option<&str>, body: &str) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/plain");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let (status, bytes) = send(app, builder.body(Body::from(body.to_string())).unwrap()).await;
    (status, parse_json(&bytes))
}

pub async fn get_with_bearer(app: Router, uri: &str, bearer: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let (status, bytes) = send(app, builder.body(Body::empty()).unwrap()).await;
    (status, parse_json(&bytes))
}

fn parse_json(bytes: &[u8]) -> serde_json::Value {
    if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(serde_json::Value::Null)
    }
}
