//! Read-only HTTP status API
//!
//! Observes the player without being able to drive it; commands only arrive
//! through the shared store.

pub mod health;
pub mod sse;
pub mod status;

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::mixer::MixerCapability;
use crate::playback::PlaybackCapability;
use crate::publisher::NotificationPublisher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Store access plus the in-process event bus
    pub publisher: NotificationPublisher,
    pub engine: Arc<dyn PlaybackCapability>,
    pub mixer: Arc<dyn MixerCapability>,
    /// Service start, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        publisher: NotificationPublisher,
        engine: Arc<dyn PlaybackCapability>,
        mixer: Arc<dyn MixerCapability>,
    ) -> Self {
        Self {
            publisher,
            engine,
            mixer,
            startup_time: Utc::now(),
        }
    }
}

/// Build the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::health_routes())
        .merge(status::status_routes())
        .merge(sse::sse_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the task is dropped
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Status API listening on http://{}", addr);

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))
}
