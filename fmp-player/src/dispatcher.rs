//! Command dispatcher
//!
//! Applies remote commands to the engine and mixer and reflects the result.
//! Commands are advisory: the producer has no return channel, so an invalid
//! or currently inapplicable command is dropped, never raised. Every message
//! still yields a [`CommandOutcome`], returned to the caller and broadcast to
//! outcome subscribers.
//!
//! | Command          | Precondition        | Side effect on success               |
//! |------------------|---------------------|--------------------------------------|
//! | `pause`          | engine playing      | paused=1, `paused`                   |
//! | `resume`         | engine paused       | paused=0, `resumed`                  |
//! | `stop`           | none                | none beyond the engine stop          |
//! | `set_volume(v)`  | `0 <= v <= 100`     | volume=v, `volume_changed`           |
//! | `set_mute(m)`    | boolean `m`         | mute=0/1, `mute_changed`             |
//!
//! Volume and mute are not deduplicated: repeating a set republishes it.

use fmp_common::events::{self, Command, Decoded};
use fmp_common::Notification;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::mixer::MixerCapability;
use crate::playback::{EngineState, PlaybackCapability};
use crate::publisher::NotificationPublisher;
use crate::store::Subscription;

/// Why a command was valid but not applicable right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotPlaying,
    NotPaused,
}

/// Why a message was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    VolumeOutOfRange(i64),
    /// Not JSON, no `event`, or mistyped command fields
    Malformed(String),
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied(Command),
    Skipped { command: Command, reason: SkipReason },
    Rejected(Rejection),
    /// The engine or mixer refused; the change was dropped
    Failed { command: Command, error: String },
    /// Event name this player does not handle
    Ignored { event: String },
}

#[derive(Clone)]
pub struct CommandDispatcher {
    engine: Arc<dyn PlaybackCapability>,
    mixer: Arc<dyn MixerCapability>,
    publisher: NotificationPublisher,
    outcomes: broadcast::Sender<CommandOutcome>,
}

impl CommandDispatcher {
    pub fn new(
        engine: Arc<dyn PlaybackCapability>,
        mixer: Arc<dyn MixerCapability>,
        publisher: NotificationPublisher,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(64);
        Self {
            engine,
            mixer,
            publisher,
            outcomes,
        }
    }

    /// Receive the outcome of every message handled from now on
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<CommandOutcome> {
        self.outcomes.subscribe()
    }

    /// Apply messages in arrival order until the subscription ends
    pub async fn run(&self, mut messages: Subscription) {
        info!("Starting command loop");
        while let Some(raw) = messages.next().await {
            self.handle_message(&raw).await;
        }
        warn!("Command subscription closed");
    }

    /// Decode and apply one raw message
    pub async fn handle_message(&self, raw: &str) -> CommandOutcome {
        debug!("Got message: {}", raw);
        let outcome = match events::decode(raw) {
            Ok(Decoded::Command(command)) => self.apply(command).await,
            Ok(Decoded::Unknown(event)) => {
                debug!("Ignoring event '{}'", event);
                CommandOutcome::Ignored { event }
            }
            Err(e) => {
                debug!("Dropping malformed command {:?}: {}", raw, e);
                CommandOutcome::Rejected(Rejection::Malformed(e.to_string()))
            }
        };
        let _ = self.outcomes.send(outcome.clone());
        outcome
    }

    /// Apply an already decoded command
    pub async fn apply(&self, command: Command) -> CommandOutcome {
        debug!("Fire: {}", command);
        match command {
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
            Command::Stop => self.stop().await,
            Command::SetVolume { volume } => self.set_volume(volume).await,
            Command::SetMute { mute } => self.set_mute(mute).await,
        }
    }

    async fn pause(&self) -> CommandOutcome {
        let command = Command::Pause;
        if self.engine.state().await != EngineState::Playing {
            debug!("Cannot pause - no track playing");
            return CommandOutcome::Skipped {
                command,
                reason: SkipReason::NotPlaying,
            };
        }
        if let Err(e) = self.engine.pause().await {
            return Self::failed(command, e);
        }
        self.notify(Notification::Paused).await;
        CommandOutcome::Applied(command)
    }

    async fn resume(&self) -> CommandOutcome {
        let command = Command::Resume;
        if self.engine.state().await != EngineState::Paused {
            debug!("Cannot resume - not in paused state");
            return CommandOutcome::Skipped {
                command,
                reason: SkipReason::NotPaused,
            };
        }
        if let Err(e) = self.engine.resume().await {
            return Self::failed(command, e);
        }
        self.notify(Notification::Resumed).await;
        CommandOutcome::Applied(command)
    }

    async fn stop(&self) -> CommandOutcome {
        debug!("Stop current track");
        match self.engine.stop().await {
            Ok(()) => CommandOutcome::Applied(Command::Stop),
            Err(e) => Self::failed(Command::Stop, e),
        }
    }

    async fn set_volume(&self, volume: i64) -> CommandOutcome {
        let level = match u8::try_from(volume) {
            Ok(level) if level <= 100 => level,
            _ => {
                warn!("{} is not a valid volume level", volume);
                return CommandOutcome::Rejected(Rejection::VolumeOutOfRange(volume));
            }
        };
        let command = Command::SetVolume { volume };
        if let Err(e) = self.mixer.set_volume(level).await {
            return Self::failed(command, e);
        }
        debug!("Set volume: {}", level);
        self.notify(Notification::VolumeChanged { volume: level }).await;
        CommandOutcome::Applied(command)
    }

    async fn set_mute(&self, mute: bool) -> CommandOutcome {
        let command = Command::SetMute { mute };
        if let Err(e) = self.mixer.set_mute(mute).await {
            return Self::failed(command, e);
        }
        debug!("Set mute: {}", mute);
        self.notify(Notification::MuteChanged { mute }).await;
        CommandOutcome::Applied(command)
    }

    fn failed(command: Command, e: crate::Error) -> CommandOutcome {
        warn!("Dropping {}: {}", command, e);
        CommandOutcome::Failed {
            command,
            error: e.to_string(),
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.publisher.publish(&notification).await {
            error!("Failed to publish {}: {}", notification.event_name(), e);
        }
    }
}
