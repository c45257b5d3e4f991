use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use super::{cache_key, CacheError, OrderCache};
use crate::domain::order::Order;

/// Redis-backed order cache storing one JSON document per order.
///
/// `ConnectionManager` reconnects on its own, so a Redis restart shows up
/// as a handful of absorbed errors rather than a dead cache.
#[derive(Clone)]
pub struct RedisOrderCache {
    conn: ConnectionManager,
}

impl RedisOrderCache {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("✅ Connected to Redis");
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderCache for RedisOrderCache {
    async fn get(&self, id: Uuid) -> Result<Option<Order>, CacheError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(cache_key(id)).await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, order: &Order, ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(order)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(cache_key(order.id), json, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(cache_key(id)).await?;
        Ok(())
    }
}
