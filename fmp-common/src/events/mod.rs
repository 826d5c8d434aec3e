//! Event types for the FM Player
//!
//! Inbound commands and outbound notifications, plus the in-process
//! [`EventBus`] that mirrors notifications to local listeners (SSE clients,
//! tests).

mod command_types;

pub use command_types::{decode, Command, Decoded, COMMAND_NAMES};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::track::{Requester, TrackRequest};
use crate::Result;

/// State-change notification published for any subscriber
///
/// Serialized as `{"event": "<name>", ...fields}`. Delivery is best effort:
/// nothing is retried, nothing waits for subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A track was handed to the engine
    Play {
        uri: String,
        #[serde(rename = "user")]
        requester: Requester,
    },

    /// A track finished, was stopped, or failed to load
    End {
        uri: String,
        #[serde(rename = "user")]
        requester: Requester,
    },

    /// A track never reported completion within the configured timeout and
    /// was abandoned. Always followed by `End` for the same track.
    Stalled {
        uri: String,
        #[serde(rename = "user")]
        requester: Requester,
    },

    VolumeChanged { volume: u8 },

    MuteChanged { mute: bool },

    Paused,

    Resumed,
}

impl Notification {
    pub fn play(track: &TrackRequest) -> Self {
        Notification::Play {
            uri: track.uri.clone(),
            requester: track.requester.clone(),
        }
    }

    pub fn end(track: &TrackRequest) -> Self {
        Notification::End {
            uri: track.uri.clone(),
            requester: track.requester.clone(),
        }
    }

    pub fn stalled(track: &TrackRequest) -> Self {
        Notification::Stalled {
            uri: track.uri.clone(),
            requester: track.requester.clone(),
        }
    }

    /// Wire event name
    pub fn event_name(&self) -> &'static str {
        match self {
            Notification::Play { .. } => "play",
            Notification::End { .. } => "end",
            Notification::Stalled { .. } => "stalled",
            Notification::VolumeChanged { .. } => "volume_changed",
            Notification::MuteChanged { .. } => "mute_changed",
            Notification::Paused => "paused",
            Notification::Resumed => "resumed",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// In-process distribution of notifications
///
/// Wraps `tokio::sync::broadcast`:
/// - Non-blocking publish (slow subscribers don't block the player loops)
/// - Multiple concurrent subscribers
/// - Lagged subscribers lose the oldest notifications
///
/// # Examples
///
/// ```
/// use fmp_common::events::{EventBus, Notification};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(Notification::Paused);
/// assert_eq!(rx.try_recv().unwrap(), Notification::Paused);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Notification>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` notifications per
    /// subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Emit a notification
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        notification: Notification,
    ) -> std::result::Result<usize, broadcast::error::SendError<Notification>> {
        self.tx.send(notification)
    }

    /// Emit a notification, ignoring if nobody is listening
    pub fn emit_lossy(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
