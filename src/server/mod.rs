use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::engine::FfmpegEngine;
use crate::pipeline::{quality::QualitySpec, VideoPipeline};
use crate::resolver::YtDlpResolver;
use crate::storage::StorageLayout;
use crate::tools;

pub mod routes_video;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub pipeline: Arc<VideoPipeline>,
    pub config: Arc<Config>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Batch production: download + transcode, then serve from cache
        .route("/get_video", get(routes_video::get_video))
        // Live transcode stream
        .route("/git_video", get(routes_video::git_video))
        // Completed artifacts by file name
        .route("/videos/:filename", get(routes_video::serve_video))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let storage = StorageLayout::new(&config.storage.download_dir, &config.storage.cache_dir)
        .context("Failed to prepare storage directories")?;

    let resolver = Arc::new(YtDlpResolver::new(tools::resolve_tool(
        "yt-dlp",
        config.tools.ytdlp.as_deref(),
    )));
    let engine = Arc::new(FfmpegEngine::new(tools::resolve_tool(
        "ffmpeg",
        config.tools.ffmpeg.as_deref(),
    )));

    let pipeline = VideoPipeline::new(
        storage,
        resolver,
        engine,
        QualitySpec::new(config.video.quality),
        config.video.url_format.clone(),
    );

    let ctx = AppContext {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    };

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
