// Xiaohongshu media scrape service.
//
// Resolves short links, drives a headless browser to the article page and
// returns discovered media URLs over HTTP.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xhscrape::config::ScrapeConfig;
use xhscrape::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ScrapeConfig::from_env()?;
    let listen_addr = config.listen_addr;
    info!(?config, "starting xhscrape");

    let state = AppState::new(config)?;
    let shutdown = state.shutdown_token();
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(%listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received, cancelling in-flight scrapes");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
