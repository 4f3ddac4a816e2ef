//! Web layer module
//!
//! HTTP interface for the avatar relay: the ingestion endpoint, the live
//! WebSocket channel, and a health check. Handlers are thin and delegate to
//! the enrichment pipeline and broadcaster.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{broadcast::Broadcaster, config::Config, enrichment::EnrichmentPipeline};

pub mod api;
pub mod websocket;

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(
        config: &Config,
        pipeline: EnrichmentPipeline,
        broadcaster: Arc<Broadcaster>,
    ) -> Result<Self> {
        let app = Self::router(AppState {
            pipeline,
            broadcaster,
        });

        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;

        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(api::health_check))
            .route("/api/v1/avatar-positions", post(api::ingest_avatar_positions))
            .route("/map/avatar-positions", get(websocket::avatar_positions_ws))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: EnrichmentPipeline,
    pub broadcaster: Arc<Broadcaster>,
}
