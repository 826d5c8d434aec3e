//! Playback capability
//!
//! The orchestrator drives an engine through [`PlaybackCapability`]. Engines
//! own decoding and output; the orchestrator only sequences them.
//!
//! Contract:
//! - `play()` never fails at the call site. A track that cannot be loaded
//!   still resolves its [`Completion`] (with [`EndReason::Failed`]).
//! - Every `play()` resolves its handle exactly once, including when the
//!   track is stopped or replaced.
//! - `pause()` is only valid while playing, `resume()` only while paused.

pub mod completion;
pub mod simulated;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use completion::{Completion, CompletionNotifier, EndReason, WaitOutcome};
pub use simulated::SimulatedEngine;

/// Engine state as reported by the engine itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Playing => write!(f, "playing"),
            EngineState::Paused => write!(f, "paused"),
        }
    }
}

#[async_trait]
pub trait PlaybackCapability: Send + Sync {
    /// Start playing `uri`, replacing anything already playing
    async fn play(&self, uri: &str) -> Completion;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Stop the current track; its completion fires with `Stopped`
    async fn stop(&self) -> Result<()>;

    async fn state(&self) -> EngineState;
}
