//! Player assembly
//!
//! Wires the store, engine and mixer into the two long-lived loops (command
//! dispatcher and queue consumer) and runs them as independent tasks. The
//! loops share nothing in-process beyond the capabilities themselves.

use fmp_common::config::TomlConfig;
use fmp_common::{Command, EventBus};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::consumer::QueueConsumer;
use crate::dispatcher::{CommandDispatcher, CommandOutcome};
use crate::error::Result;
use crate::mixer::MixerCapability;
use crate::playback::PlaybackCapability;
use crate::publisher::NotificationPublisher;
use crate::store::SharedStore;

/// Which loop stopped first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Commands,
    Queue,
}

/// Running loops
pub struct PlayerHandle {
    commands: JoinHandle<()>,
    queue: JoinHandle<()>,
}

impl PlayerHandle {
    /// Wait until either loop ends on its own
    pub async fn join(&mut self) -> LoopExit {
        tokio::select! {
            _ = &mut self.commands => LoopExit::Commands,
            _ = &mut self.queue => LoopExit::Queue,
        }
    }

    /// Terminate both loops. A track still playing is picked up again from
    /// the current-track record on next start.
    pub async fn shutdown(self) {
        self.commands.abort();
        self.queue.abort();
        let _ = self.commands.await;
        let _ = self.queue.await;
        info!("Player loops stopped");
    }
}

pub struct Player {
    dispatcher: CommandDispatcher,
    consumer: Arc<QueueConsumer>,
    publisher: NotificationPublisher,
    command_channel: String,
}

impl Player {
    pub fn new(
        config: &TomlConfig,
        store: Arc<dyn SharedStore>,
        engine: Arc<dyn PlaybackCapability>,
        mixer: Arc<dyn MixerCapability>,
        bus: EventBus,
    ) -> Self {
        let publisher = NotificationPublisher::new(
            store,
            config.keys.clone(),
            config.channels.notification.clone(),
            bus,
        );
        let dispatcher =
            CommandDispatcher::new(Arc::clone(&engine), mixer, publisher.clone());
        let consumer = QueueConsumer::new(Arc::clone(&engine), publisher.clone())
            .with_completion_timeout(config.completion_timeout())
            .with_idle_poll(config.idle_poll_range());

        Self {
            dispatcher,
            consumer: Arc::new(consumer),
            publisher,
            command_channel: config.channels.command.clone(),
        }
    }

    pub fn publisher(&self) -> &NotificationPublisher {
        &self.publisher
    }

    /// Push startup volume and mute through the dispatcher so the persisted
    /// keys and subscribers see them
    pub async fn apply_initial_state(&self, volume: u8, mute: bool) {
        let commands = [
            Command::SetVolume {
                volume: i64::from(volume),
            },
            Command::SetMute { mute },
        ];
        for command in commands {
            match self.dispatcher.apply(command.clone()).await {
                CommandOutcome::Applied(_) => info!("Applied startup {}", command),
                other => warn!("Startup {} not applied: {:?}", command, other),
            }
        }
    }

    /// Subscribe to the command channel and spawn both loops
    ///
    /// The subscription is in place before this returns, so no command
    /// published afterwards is missed.
    pub async fn start(&self) -> Result<PlayerHandle> {
        let messages = self.publisher.store().subscribe(&self.command_channel).await?;
        info!("Listening for commands on '{}'", self.command_channel);

        let dispatcher = self.dispatcher.clone();
        let commands = tokio::spawn(async move { dispatcher.run(messages).await });

        let consumer = Arc::clone(&self.consumer);
        let queue = tokio::spawn(async move { consumer.run().await });

        Ok(PlayerHandle { commands, queue })
    }
}
