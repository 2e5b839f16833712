//! HTTP API for scraping articles.
//!
//! - `GET /scrap?url=&headings=&paragraphs=` runs one scrape
//! - `GET /test` and `GET /health` are liveness checks

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::scrapers::{ChromiumEngine, ScrapeService};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScrapeService>,
}

impl AppState {
    pub fn new(service: ScrapeService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Build the state with a Chromium engine configured from `settings`.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let engine = Arc::new(ChromiumEngine::new(settings.browser.clone()));
        Ok(Self::new(ScrapeService::from_settings(settings, engine)?))
    }
}

/// Start the web server and run until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state.clone());

    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.service.engine().shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
