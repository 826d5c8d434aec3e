//! Per-play completion handles
//!
//! Every `play()` hands back a fresh [`Completion`]; the engine keeps the
//! matching [`CompletionNotifier`] and fires it exactly once when the track
//! ends for any reason. A handle can only ever observe its own track, so a
//! late signal from a previous track cannot release the wait for the next.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::{EngineState, PlaybackCapability};

/// How often a bounded wait checks whether the track is paused
const PAUSE_POLL: Duration = Duration::from_millis(25);

/// Why a track stopped playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Played to the end
    Finished,
    /// Stopped by a command or replaced by another play
    Stopped,
    /// The engine could not load the track
    Failed,
    /// The engine dropped the notifier without firing it
    Abandoned,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Finished => write!(f, "finished"),
            EndReason::Stopped => write!(f, "stopped"),
            EndReason::Failed => write!(f, "failed"),
            EndReason::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Result of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ended(EndReason),
    TimedOut,
}

/// Engine side of a completion handle
#[derive(Debug)]
pub struct CompletionNotifier {
    tx: oneshot::Sender<EndReason>,
}

impl CompletionNotifier {
    /// Signal the end of the track. Consumes the notifier, so it can fire
    /// at most once.
    pub fn fire(self, reason: EndReason) {
        // Waiter may have given up (timeout); nothing to do then
        let _ = self.tx.send(reason);
    }
}

/// Waiter side of a completion handle
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<EndReason>,
}

impl Completion {
    /// Create a linked notifier/handle pair for one play call
    pub fn channel() -> (CompletionNotifier, Completion) {
        let (tx, rx) = oneshot::channel();
        (CompletionNotifier { tx }, Completion { rx })
    }

    /// A handle that is already resolved, for plays that end on the spot
    pub fn resolved(reason: EndReason) -> Completion {
        let (notifier, completion) = Self::channel();
        notifier.fire(reason);
        completion
    }

    /// Wait without a bound
    pub async fn wait(self) -> EndReason {
        self.rx.await.unwrap_or(EndReason::Abandoned)
    }

    /// Wait for at most `budget` of playing time; `None` waits without a bound
    ///
    /// Time during which `engine` reports [`EngineState::Paused`] is not
    /// charged against the budget (to within one poll interval), so a track
    /// that is merely paused never times out.
    pub async fn wait_playing(
        self,
        budget: Option<Duration>,
        engine: &dyn PlaybackCapability,
    ) -> WaitOutcome {
        let Some(budget) = budget else {
            return WaitOutcome::Ended(self.wait().await);
        };

        let wait = self.wait();
        tokio::pin!(wait);
        let mut played = Duration::ZERO;
        while played < budget {
            let slice = (budget - played).min(PAUSE_POLL);
            let started = Instant::now();
            tokio::select! {
                reason = &mut wait => return WaitOutcome::Ended(reason),
                _ = tokio::time::sleep(slice) => {}
            }
            if engine.state().await != EngineState::Paused {
                played += started.elapsed();
            }
        }
        WaitOutcome::TimedOut
    }
}
