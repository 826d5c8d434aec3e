//! # FM Player Common Library
//!
//! Shared code for the FM Player daemon and anything that talks to it:
//! - Wire types for commands, notifications and track records
//! - Store key and channel names
//! - TOML bootstrap configuration loading
//! - The in-process notification bus

pub mod config;
pub mod error;
pub mod events;
pub mod keys;
pub mod track;

pub use error::{Error, Result};
pub use events::{Command, EventBus, Notification};
pub use keys::{Channels, StoreKeys};
pub use track::{Requester, TrackRequest};
