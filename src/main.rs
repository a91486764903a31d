use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use ytm_station::catalog::YtMusicClientFactory;
use ytm_station::config::{AcquisitionConfig, ClientMode};
use ytm_station::gateway::CatalogGateway;
use ytm_station::pipeline::{AcquisitionPipeline, TokioProcessRunner};
use ytm_station::server::{self, AppState};

#[derive(Parser)]
#[command(name = "ytm-station")]
#[command(about = "YouTube Music gateway and library downloader", long_about = None)]
struct Cli {
    /// Path to the YouTube Music credential file (OAuth token or browser headers)
    #[arg(long, env = "YTMUSIC_AUTH_FILE", default_value = "oauth.json")]
    auth_file: PathBuf,

    /// Path to music library folder
    #[arg(short, long, env = "MUSIC_LIB_DIR")]
    library: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Media downloader executable
    #[arg(long, env = "YTM_DOWNLOADER", default_value = "yt-dlp")]
    downloader: String,

    /// Library importer executable
    #[arg(long, env = "YTM_IMPORTER", default_value = "beet")]
    importer: String,

    /// Audio codec the downloader extracts to
    #[arg(long, default_value = "opus")]
    audio_format: String,

    /// Timeout for each pipeline stage, in seconds
    #[arg(long, default_value = "900")]
    stage_timeout: u64,

    /// Catalog client lifetime
    #[arg(long, value_enum, default_value_t = ClientMode::Shared)]
    client_mode: ClientMode,

    /// Also refresh library metadata after playlist downloads
    #[arg(long)]
    reindex_collections: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ytm_station=debug,ytmusic_rs=info,tower_http=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    let acquisition = AcquisitionConfig {
        downloader: cli.downloader,
        importer: cli.importer,
        audio_format: cli.audio_format,
        stage_timeout: Duration::from_secs(cli.stage_timeout),
        reindex_collections: cli.reindex_collections,
        ..AcquisitionConfig::new(cli.library)
    };
    acquisition.validate()?;

    tracing::info!("Starting YTM Station");
    tracing::info!("Library path: {}", acquisition.library_dir.display());
    tracing::info!("Auth file: {}", cli.auth_file.display());

    let factory = YtMusicClientFactory::new(&cli.auth_file, cli.client_mode)
        .context("Failed to initialize catalog client")?;

    let state = AppState {
        gateway: Arc::new(CatalogGateway::new(Arc::new(factory))),
        pipeline: Arc::new(AcquisitionPipeline::new(
            acquisition,
            Arc::new(TokioProcessRunner),
        )),
    };

    let app = server::create_router(state);
    let addr = format!("0.0.0.0:{}", cli.port);

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET    /health                      - Health check");
    tracing::info!("  GET    /search?q=&filter=&limit=    - Search the catalog");
    tracing::info!("  GET    /artist/:id, /album/:id, /song/:id, /playlist/:id");
    tracing::info!("  POST   /playlist/create             - Create a playlist");
    tracing::info!("  POST   /playlist/:id/items          - Add items");
    tracing::info!("  DELETE /playlist/:id/items/remove   - Remove items");
    tracing::info!("  DELETE /playlist/:id/delete         - Delete a playlist");
    tracing::info!("  GET    /watch-playlist, /lyrics/:id, /library/playlists, /charts");
    tracing::info!("  POST   /download/song, /download/playlist");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
