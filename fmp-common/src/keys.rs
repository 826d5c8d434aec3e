//! Store key and channel names
//!
//! Defaults match the key layout the FM Player has always used, so producers
//! and observers written against it keep working.

use serde::Deserialize;

/// Default work queue list key
pub const DEFAULT_QUEUE_KEY: &str = "fm:player:queue";
/// Default current-track record key
pub const DEFAULT_CURRENT_KEY: &str = "fm:player:current";
/// Default paused flag key
pub const DEFAULT_PAUSED_KEY: &str = "fm:player:paused";
/// Default mute flag key
pub const DEFAULT_MUTE_KEY: &str = "fm:player:mute";
/// Default volume key
pub const DEFAULT_VOLUME_KEY: &str = "fm:player:volume";
/// Default channel for both commands and notifications
pub const DEFAULT_CHANNEL: &str = "fm:player:events";

/// Names of everything the player reads or writes in the shared store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreKeys {
    /// FIFO list of pending track requests
    pub queue: String,
    /// JSON current-track record, present only while a track plays
    pub current: String,
    /// Paused flag (0/1)
    pub paused: String,
    /// Mute flag (0/1)
    pub mute: String,
    /// Requested volume (0-100)
    pub volume: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE_KEY.to_string(),
            current: DEFAULT_CURRENT_KEY.to_string(),
            paused: DEFAULT_PAUSED_KEY.to_string(),
            mute: DEFAULT_MUTE_KEY.to_string(),
            volume: DEFAULT_VOLUME_KEY.to_string(),
        }
    }
}

impl StoreKeys {
    /// All keys paired with their config field name, for validation
    pub fn named(&self) -> [(&'static str, &str); 5] {
        [
            ("keys.queue", &self.queue),
            ("keys.current", &self.current),
            ("keys.paused", &self.paused),
            ("keys.mute", &self.mute),
            ("keys.volume", &self.volume),
        ]
    }
}

/// Pub/sub channel names
///
/// Commands and notifications may share one channel: notification event
/// names never collide with command names, so the dispatcher ignores its own
/// notifications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Channels {
    /// Channel the dispatcher subscribes to
    pub command: String,
    /// Channel notifications are published on
    pub notification: String,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            command: DEFAULT_CHANNEL.to_string(),
            notification: DEFAULT_CHANNEL.to_string(),
        }
    }
}

impl Channels {
    /// Use one channel for both directions
    pub fn shared(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            command: name.clone(),
            notification: name,
        }
    }
}
