//! yt-dlp backend with the multi-strategy fallback ladder.
//!
//! A first invocation can fail because the remote site blocks a particular
//! extraction-client identity, so strategies are tried in a fixed priority
//! order: the default client, then each configured alternate identity, and
//! finally, when a credential file exists and strict no-credential mode
//! is off, one attempt with cookies attached. The ladder contents are
//! compatibility policy carried as configuration, not contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::process::{run_tool, stderr_tail};
use crate::download::cookies::CookieStore;
use crate::download::source::{FetchRequest, MediaSource};

/// Stream selection for a normal (transcoded) run: best audio, whatever
/// the container.
const FORMAT_BEST: &str = "bestaudio/best";

/// Stream selection for pass-through mode: prefer containers that can be
/// served as-is without re-encoding.
const FORMAT_PASSTHROUGH: &str = "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio";

/// One rung of the fallback ladder.
#[derive(Debug, Clone, PartialEq)]
enum Strategy {
    /// Default client identity, no credentials
    Default,
    /// Alternate extraction-client identity, no credentials
    AltClient(String),
    /// Default client with the credential file attached
    WithCookies,
}

impl Strategy {
    fn label(&self) -> String {
        match self {
            Strategy::Default => "default".to_string(),
            Strategy::AltClient(client) => format!("client={}", client),
            Strategy::WithCookies => "cookies".to_string(),
        }
    }
}

/// Primary downloader backend.
pub struct YtDlpSource {
    bin: String,
    cookies: Arc<CookieStore>,
    client_ladder: Vec<String>,
    strict_no_cookies: bool,
}

impl YtDlpSource {
    pub fn new(bin: String, cookies: Arc<CookieStore>, client_ladder: Vec<String>, strict_no_cookies: bool) -> Self {
        Self {
            bin,
            cookies,
            client_ladder,
            strict_no_cookies,
        }
    }

    /// The ladder for this request: credential-free strategies first, the
    /// cookie attempt last and only when permitted and available.
    fn strategies(&self) -> Vec<Strategy> {
        let mut strategies = vec![Strategy::Default];
        strategies.extend(self.client_ladder.iter().cloned().map(Strategy::AltClient));

        if !self.strict_no_cookies && self.cookies.is_present() {
            strategies.push(Strategy::WithCookies);
        }

        strategies
    }

    fn build_args(&self, request: &FetchRequest, strategy: &Strategy) -> Vec<String> {
        let format = if request.passthrough { FORMAT_PASSTHROUGH } else { FORMAT_BEST };
        let template = request.job_dir.join("audio.%(ext)s");

        let mut args: Vec<String> = [
            "--no-warnings",
            "--no-playlist",
            "--geo-bypass",
            "-N",
            "2",
            "-f",
            format,
            "-o",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(template.to_string_lossy().into_owned());

        match strategy {
            Strategy::Default => {}
            Strategy::AltClient(client) => {
                args.push("--extractor-args".to_string());
                args.push(format!("youtube:player_client={}", client));
            }
            Strategy::WithCookies => {
                args.push("--cookies".to_string());
                args.push(self.cookies.path().to_string_lossy().into_owned());
            }
        }

        args.push(request.url.to_string());
        args
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_audio(&self, request: &FetchRequest) -> Result<(), AppError> {
        let strategies = self.strategies();
        let total = strategies.len();
        let mut last_error: Option<String> = None;

        for (attempt, strategy) in strategies.iter().enumerate() {
            log::info!(
                "[yt-dlp] attempt {}/{} [{}] for {}",
                attempt + 1,
                total,
                strategy.label(),
                request.url
            );

            let args = self.build_args(request, strategy);
            match run_tool(&self.bin, &args, config::process::download_timeout()).await {
                Ok(_) => {
                    log::info!("[yt-dlp] strategy [{}] succeeded", strategy.label());
                    return Ok(());
                }
                // A hung download will hang every strategy; surface the
                // timeout instead of burning the whole ladder on it.
                Err(AppError::Timeout(secs)) => {
                    log::warn!("[yt-dlp] strategy [{}] timed out after {}s", strategy.label(), secs);
                    return Err(AppError::Timeout(secs));
                }
                Err(e) => {
                    let detail = match e {
                        AppError::ToolExecution(msg) => msg,
                        other => other.to_string(),
                    };
                    log::warn!(
                        "[yt-dlp] strategy [{}] failed: {}",
                        strategy.label(),
                        detail.lines().next_back().unwrap_or("unknown")
                    );
                    last_error = Some(detail);
                }
            }
        }

        let tail = stderr_tail(last_error.as_deref().unwrap_or("no strategy produced output"));
        Err(AppError::DownloadFailed(tail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use url::Url;

    fn absent_cookies() -> Arc<CookieStore> {
        Arc::new(CookieStore::new("/nonexistent/tunepress-cookies.txt"))
    }

    async fn present_cookies(dir: &tempfile::TempDir) -> Arc<CookieStore> {
        let store = CookieStore::new(dir.path().join("cookies.txt"));
        store
            .replace("# Netscape HTTP Cookie File\n.example.com\tTRUE\t/\tTRUE\t0\tSID\tv\n")
            .await
            .unwrap();
        Arc::new(store)
    }

    fn request(passthrough: bool) -> FetchRequest {
        FetchRequest {
            url: Url::parse("https://example.com/watch?v=abc").unwrap(),
            job_dir: PathBuf::from("/tmp/job"),
            passthrough,
        }
    }

    #[test]
    fn test_default_args_shape() {
        let source = YtDlpSource::new("yt-dlp".into(), absent_cookies(), vec![], false);
        let args = source.build_args(&request(false), &Strategy::Default);

        assert_eq!(args[0], "--no-warnings");
        assert!(args.contains(&"-f".to_string()));
        assert!(args.contains(&FORMAT_BEST.to_string()));
        assert!(args.contains(&"/tmp/job/audio.%(ext)s".to_string()));
        assert_eq!(args.last().unwrap(), "https://example.com/watch?v=abc");
        assert!(!args.iter().any(|a| a == "--cookies"));
        assert!(!args.iter().any(|a| a == "--extractor-args"));
    }

    #[test]
    fn test_passthrough_prefers_compressed_containers() {
        let source = YtDlpSource::new("yt-dlp".into(), absent_cookies(), vec![], false);
        let args = source.build_args(&request(true), &Strategy::Default);
        assert!(args.contains(&FORMAT_PASSTHROUGH.to_string()));
    }

    #[test]
    fn test_alt_client_args() {
        let source = YtDlpSource::new("yt-dlp".into(), absent_cookies(), vec![], false);
        let args = source.build_args(&request(false), &Strategy::AltClient("android".into()));

        let pos = args.iter().position(|a| a == "--extractor-args").unwrap();
        assert_eq!(args[pos + 1], "youtube:player_client=android");
    }

    #[tokio::test]
    async fn test_cookie_args_point_at_store_path() {
        let dir = tempfile::tempdir().unwrap();
        let cookies = present_cookies(&dir).await;
        let expected = cookies.path().to_string_lossy().into_owned();

        let source = YtDlpSource::new("yt-dlp".into(), cookies, vec![], false);
        let args = source.build_args(&request(false), &Strategy::WithCookies);

        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], expected);
    }

    #[test]
    fn test_ladder_without_credentials() {
        let source = YtDlpSource::new(
            "yt-dlp".into(),
            absent_cookies(),
            vec!["android".into(), "web_safari".into()],
            false,
        );
        let strategies = source.strategies();
        assert_eq!(
            strategies,
            vec![
                Strategy::Default,
                Strategy::AltClient("android".into()),
                Strategy::AltClient("web_safari".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_ladder_appends_cookie_attempt_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let cookies = present_cookies(&dir).await;

        let source = YtDlpSource::new("yt-dlp".into(), cookies, vec!["android".into()], false);
        let strategies = source.strategies();
        assert_eq!(strategies.last(), Some(&Strategy::WithCookies));
        assert_eq!(strategies.len(), 3);
    }

    #[tokio::test]
    async fn test_strict_mode_never_attaches_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let cookies = present_cookies(&dir).await;

        let source = YtDlpSource::new("yt-dlp".into(), cookies, vec![], true);
        assert!(!source.strategies().contains(&Strategy::WithCookies));
    }
}
