//! Notification publisher
//!
//! Stateless helper shared by the dispatcher and the queue consumer. For each
//! notification it performs the matching state-key write, publishes the JSON
//! on the notification channel, and mirrors it onto the in-process
//! [`EventBus`].
//!
//! | Event            | Store write                          |
//! |------------------|--------------------------------------|
//! | `play`           | set current-track record, paused = 0 |
//! | `end`            | delete current-track record          |
//! | `volume_changed` | set volume                           |
//! | `mute_changed`   | set mute (0/1)                       |
//! | `paused`         | set paused = 1                       |
//! | `resumed`        | set paused = 0                       |
//! | `stalled`        | none                                 |
//!
//! The write happens before the publish, but subscribers must not rely on
//! that ordering.

use fmp_common::{EventBus, Notification, StoreKeys, TrackRequest};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::SharedStore;

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

#[derive(Clone)]
pub struct NotificationPublisher {
    store: Arc<dyn SharedStore>,
    keys: StoreKeys,
    channel: String,
    bus: EventBus,
}

impl NotificationPublisher {
    pub fn new(
        store: Arc<dyn SharedStore>,
        keys: StoreKeys,
        channel: impl Into<String>,
        bus: EventBus,
    ) -> Self {
        Self {
            store,
            keys,
            channel: channel.into(),
            bus,
        }
    }

    /// Persist, publish and mirror one notification
    pub async fn publish(&self, notification: &Notification) -> Result<()> {
        self.persist(notification).await?;

        let payload = notification.to_json()?;
        let receivers = self.store.publish(&self.channel, &payload).await?;
        debug!("Published {} to {} subscribers", payload, receivers);

        self.bus.emit_lossy(notification.clone());
        Ok(())
    }

    async fn persist(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::Play { uri, requester } => {
                let record = TrackRequest {
                    uri: uri.clone(),
                    requester: requester.clone(),
                };
                self.store.set(&self.keys.current, &record.to_json()?).await?;
                self.store.set(&self.keys.paused, flag(false)).await
            }
            Notification::End { .. } => {
                if !self.store.delete(&self.keys.current).await? {
                    debug!("No current track record to remove");
                }
                Ok(())
            }
            Notification::VolumeChanged { volume } => {
                self.store.set(&self.keys.volume, &volume.to_string()).await
            }
            Notification::MuteChanged { mute } => self.store.set(&self.keys.mute, flag(*mute)).await,
            Notification::Paused => self.store.set(&self.keys.paused, flag(true)).await,
            Notification::Resumed => self.store.set(&self.keys.paused, flag(false)).await,
            Notification::Stalled { .. } => Ok(()),
        }
    }

    /// Read the current-track record
    ///
    /// A record that no longer decodes is reported and treated as absent.
    pub async fn current(&self) -> Result<Option<TrackRequest>> {
        let Some(raw) = self.store.get(&self.keys.current).await? else {
            return Ok(None);
        };
        match TrackRequest::from_json(&raw) {
            Ok(track) => Ok(Some(track)),
            Err(e) => {
                warn!("Ignoring unreadable current track record {:?}: {}", raw, e);
                Ok(None)
            }
        }
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn SharedStore> {
        &self.store
    }
}
