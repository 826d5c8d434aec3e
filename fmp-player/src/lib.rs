//! # FM Player (fmp-player)
//!
//! Headless playback orchestrator driven entirely through a shared store.
//!
//! **Purpose:** Consume a FIFO queue of track requests one at a time, apply
//! remote transport/volume commands, and publish every state change as a
//! notification.
//!
//! **Architecture:** Two independent loops share only the capabilities:
//! - [`dispatcher::CommandDispatcher`]: command channel -> engine / mixer
//! - [`consumer::QueueConsumer`]: work queue -> engine, one track at a time
//!
//! Both report through [`publisher::NotificationPublisher`], which persists
//! state keys, publishes on the notification channel and feeds the
//! in-process event bus behind the read-only status API.

pub mod api;
pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod mixer;
pub mod playback;
pub mod player;
pub mod publisher;
pub mod store;

pub use error::{Error, Result};
pub use player::{Player, PlayerHandle};
