use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use tunepress::api::{self, ApiState};
use tunepress::core::{config, logging};
use tunepress::download::cookies::CookieStore;
use tunepress::jobs::{self, JobRegistry};
use tunepress::tools::ToolCache;
use tunepress::Pipeline;

#[derive(Parser)]
#[command(name = "tunepress", version, about = "HTTP backend for converting media URLs to audio files")]
struct Cli {
    /// Listening port (overrides TUNEPRESS_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Jobs root directory (overrides TUNEPRESS_JOBS_ROOT)
    #[arg(long)]
    jobs_root: Option<PathBuf>,

    /// Probe the external tools, print the bindings, and exit
    #[arg(long)]
    probe_tools: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logger(config::LOG_FILE.as_str())?;

    let tools = Arc::new(ToolCache::from_env());
    let bindings = tools.probe().await;

    if cli.probe_tools {
        let describe = |tool: &Option<tunepress::tools::Tool>| match tool {
            Some(t) => format!("{} ({})", t.path, t.version),
            None => "NOT FOUND".to_string(),
        };
        println!("yt-dlp: {}", describe(&bindings.ytdlp));
        println!("ffmpeg: {}", describe(&bindings.ffmpeg));
        println!("python: {}", describe(&bindings.python));
        return Ok(());
    }

    if bindings.ytdlp.is_none() && bindings.python.is_none() {
        log::warn!("no downloader found: /api/convert will fail until yt-dlp (or python + pytube) is installed");
    }
    if bindings.ffmpeg.is_none() {
        log::warn!("ffmpeg not found, running in pass-through mode (original audio, no conversion)");
    }
    if config::ADMIN_TOKEN.is_none() {
        log::warn!("TUNEPRESS_ADMIN_TOKEN not set, admin endpoints are open");
    }

    let jobs = Arc::new(
        cli.jobs_root
            .map(JobRegistry::new)
            .unwrap_or_else(JobRegistry::from_env),
    );
    tokio::fs::create_dir_all(jobs.root()).await?;

    let cookies = Arc::new(CookieStore::from_env());

    let _sweeper = jobs::spawn_sweeper(
        jobs.clone(),
        config::retention::job_ttl(),
        config::retention::sweep_interval(),
    );

    let pipeline = Arc::new(Pipeline::new(tools.clone(), jobs.clone(), cookies.clone()));
    let state = ApiState {
        pipeline,
        tools,
        cookies,
        admin_token: config::ADMIN_TOKEN.clone(),
    };
    let app = api::build_router(state, jobs.root());

    let port = cli.port.unwrap_or(*config::PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("backend listening on http://{}", addr);
    log::info!("  POST /api/convert          - convert a media URL");
    log::info!("  GET  /diag                 - tool diagnostics");
    log::info!("  GET  /jobs/<id>/<file>     - published outputs");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
