//! Server initialization and main run loop
//!
//! Contains the main `run()` function that starts all server components.

use super::config::AppConfig;
use super::shutdown::shutdown_signal;
use crate::api::AppState;
use anyhow::{Context, Result};
use axum::{http::HeaderValue, routing::get, Router};
use heximage_core::{
    backend, BroadcastHub, ChangeFeed, DrawGateway, HubConfig, PixelStore, SharedBackend,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Store-side services, built once per process and shared by reference
#[derive(Clone)]
pub struct CanvasServices {
    pub backend: SharedBackend,
    pub store: PixelStore,
    pub feed: ChangeFeed,
}

/// Open the backing store and wire the pixel store and change feed to it
pub async fn init_canvas(config: &AppConfig) -> Result<CanvasServices> {
    let geometry = config.canvas.geometry()?;
    let backend = backend::open(&config.redis.url)
        .await
        .context("Can't connect to the canvas store")?;

    info!(
        geometry = %geometry,
        key = %config.canvas.key,
        topic = %config.canvas.updates_topic,
        "Canvas store ready"
    );

    Ok(CanvasServices {
        store: PixelStore::new(backend.clone(), geometry, config.canvas.key.clone()),
        feed: ChangeFeed::new(backend.clone(), config.canvas.updates_topic.clone()),
        backend,
    })
}

/// Build the router for all endpoints
pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(crate::api::health_routes(state.clone()))
        .merge(crate::api::api_router(state.clone()))
        .merge(crate::websocket::websocket_router(state))
        .route("/", get(|| async { "heximage" }))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Run the server
pub async fn run(config: AppConfig, listen_addr: Option<String>) -> Result<()> {
    info!("Starting heximage v{}", env!("CARGO_PKG_VERSION"));

    let services = init_canvas(&config).await?;

    let cancel = CancellationToken::new();
    let (hub, hub_tasks) = BroadcastHub::spawn(
        services.feed.clone(),
        HubConfig::from(&config.hub),
        cancel.clone(),
    )
    .await
    .context("Failed to start the broadcast hub")?;

    let state = Arc::new(AppState {
        gateway: DrawGateway::new(services.store.clone(), services.feed.clone()),
        hub,
        backend: services.backend.clone(),
    });

    let app = build_router(state, &config.server.cors_origins);

    let addr: SocketAddr = listen_addr
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port))
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("HTTP server error")?;

    cancel.cancel();
    if let Err(e) = hub_tasks.coordinator.await {
        warn!("Broadcast hub task error: {}", e);
    }
    hub_tasks.feed_reader.abort();

    info!("heximage shutdown complete");
    Ok(())
}
