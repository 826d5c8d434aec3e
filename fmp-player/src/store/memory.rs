//! In-process shared store
//!
//! Backs the `memory` store backend and the test suites. Lists and keys live
//! behind one async mutex; each pub/sub channel is a broadcast channel
//! created on first use.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use super::{SharedStore, Subscription};
use crate::error::Result;

/// Messages buffered per subscriber before the slowest starts losing them
const CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct MemoryInner {
    lists: HashMap<String, VecDeque<String>>,
    values: HashMap<String, String>,
    channels: HashMap<String, broadcast::Sender<String>>,
}

/// Shared store living entirely in this process
///
/// Cloning yields another handle onto the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn push_back(&self, list: &str, value: &str) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let entries = inner.lists.entry(list.to_string()).or_default();
        entries.push_back(value.to_string());
        Ok(entries.len())
    }

    async fn pop_front(&self, list: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        let popped = inner.lists.get_mut(list).and_then(|entries| entries.pop_front());
        if inner.lists.get(list).is_some_and(|entries| entries.is_empty()) {
            inner.lists.remove(list);
        }
        Ok(popped)
    }

    async fn list_len(&self, list: &str) -> Result<usize> {
        let inner = self.inner.lock().await;
        Ok(inner.lists.get(list).map_or(0, |entries| entries.len()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .lock()
            .await
            .values
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.inner.lock().await.values.remove(key).is_some())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize> {
        let inner = self.inner.lock().await;
        let delivered = inner
            .channels
            .get(channel)
            .and_then(|tx| tx.send(message.to_string()).ok())
            .unwrap_or(0);
        Ok(delivered)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        let rx = {
            let mut inner = self.inner.lock().await;
            inner
                .channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };

        let channel = channel.to_string();
        let stream = BroadcastStream::new(rx).filter_map(move |item| {
            let channel = channel.clone();
            async move {
                match item {
                    Ok(message) => Some(message),
                    Err(BroadcastStreamRecvError::Lagged(missed)) => {
                        warn!("Subscriber on '{}' lagged, {} messages lost", channel, missed);
                        None
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}
