//! Player status endpoint
//!
//! Reports what the shared store says, alongside the engine's own view.
//! The two can briefly disagree while a command is being applied.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use fmp_common::TrackRequest;
use serde::Serialize;
use tracing::error;

use super::AppState;
use crate::error::Result;
use crate::playback::EngineState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Track being played, from the current-track record
    pub current: Option<TrackRequest>,
    pub queue_length: usize,
    pub paused: bool,
    pub muted: bool,
    /// Last persisted volume; absent until the first `set_volume`
    pub volume: Option<u8>,
    pub engine_state: EngineState,
    /// Level the mixer currently reports; absent if it could not be read
    pub mixer_volume: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /status
pub async fn get_status(
    State(state): State<AppState>,
) -> std::result::Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    match read_status(&state).await {
        Ok(status) => Ok(Json(status)),
        Err(e) => {
            error!("Failed to read player status: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

async fn read_status(state: &AppState) -> Result<StatusResponse> {
    let publisher = &state.publisher;
    let store = publisher.store();
    let keys = publisher.keys();

    let current = publisher.current().await?;
    let queue_length = store.list_len(&keys.queue).await?;
    let paused = store.get(&keys.paused).await?.as_deref() == Some("1");
    let muted = store.get(&keys.mute).await?.as_deref() == Some("1");
    let volume = store
        .get(&keys.volume)
        .await?
        .and_then(|raw| raw.parse::<u8>().ok());

    Ok(StatusResponse {
        current,
        queue_length,
        paused,
        muted,
        volume,
        engine_state: state.engine.state().await,
        mixer_volume: state.mixer.volume().await.ok(),
    })
}

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
