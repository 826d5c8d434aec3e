//! Shared store abstraction
//!
//! The player's only link to the outside world: a FIFO work queue, a handful
//! of state keys, and a publish/subscribe channel carrying UTF-8 text.
//!
//! The store is treated as externally synchronized. `pop_front` is assumed
//! atomic, and only one queue consumer runs per queue.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;
use fmp_common::config::{StoreBackend, StoreConfig};
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Messages received on a subscribed channel, in publish order
pub type Subscription = BoxStream<'static, String>;

/// List, key/value and pub/sub operations the player relies on
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Round-trip check used once at startup
    async fn ping(&self) -> Result<()>;

    /// Append to the tail of a list, returning the new length
    async fn push_back(&self, list: &str, value: &str) -> Result<usize>;

    /// Remove and return the head of a list
    async fn pop_front(&self, list: &str) -> Result<Option<String>>;

    async fn list_len(&self, list: &str) -> Result<usize>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Fire-and-forget publish, returning how many subscribers got it
    async fn publish(&self, channel: &str, message: &str) -> Result<usize>;

    /// Start receiving messages published on `channel` from now on
    async fn subscribe(&self, channel: &str) -> Result<Subscription>;
}

/// Open the configured backend
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn SharedStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-process memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => Ok(Arc::new(RedisStore::connect(&config.url).await?)),
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => Err(crate::Error::Config(
            "store.backend = \"redis\" requires building with the `redis` feature".to_string(),
        )),
    }
}
