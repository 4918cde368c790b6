mod config;

use std::sync::Arc;

use tracing::{error, info, warn};

use inkwell_api::unsplash::UnsplashClient;
use inkwell_api::{AppState, AppStateInner};
use inkwell_db::Database;
use inkwell_stream::openai::OpenAiCompletions;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwell=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {}. Set it in your .env file and restart.", e);
            std::process::exit(1);
        }
    };

    if config.unsplash_access_key.is_empty() {
        warn!("UNSPLASH_ACCESS_KEY is not set; image search will fail");
    }

    let db = Database::open(&config.db_path)?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    info!("Generating with model {} at {}", config.openai.model, config.openai.base_url);

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        completions: Arc::new(OpenAiCompletions::new(config.openai)),
        images: Arc::new(UnsplashClient::new(config.unsplash_access_key)),
        upload_dir: config.upload_dir,
    });

    let app = inkwell_api::router(state);

    info!("Inkwell server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            },
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
