//! Redis-backed shared store
//!
//! Lists map to RPUSH/LPOP/LLEN, keys to GET/SET/DEL, and channels to Redis
//! pub/sub. Commands share one multiplexed connection; every subscription
//! opens its own pub/sub connection.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, warn};

use super::{SharedStore, Subscription};
use crate::error::Result;

pub struct RedisStore {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the server at `url` (`redis://host:port/db`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to Redis at {}", url);
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn push_back(&self, list: &str, value: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.rpush(list, value).await?;
        Ok(len)
    }

    async fn pop_front(&self, list: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let popped: Option<String> = conn.lpop(list, None).await?;
        Ok(popped)
    }

    async fn list_len(&self, list: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(list).await?;
        Ok(len)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let receivers: usize = conn.publish(channel, message).await?;
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        info!("Subscribed to Redis channel '{}'", channel);

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!("Dropping non-text message on '{}': {}", msg.get_channel_name(), e);
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}
