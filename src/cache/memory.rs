use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CacheError, OrderCache};
use crate::domain::order::Order;

/// Process-local cache with per-entry expiry. Expired entries are dropped
/// on lookup and swept on every write.
#[derive(Default)]
pub struct InMemoryOrderCache {
    entries: Mutex<HashMap<Uuid, (Order, Instant)>>,
}

impl InMemoryOrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }
}

#[async_trait]
impl OrderCache for InMemoryOrderCache {
    async fn get(&self, id: Uuid) -> Result<Option<Order>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(&id) {
            Some((order, expires_at)) if *expires_at > Instant::now() => Ok(Some(order.clone())),
            Some(_) => {
                entries.remove(&id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, order: &Order, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(order.id, (order.clone(), now + ttl));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), CacheError> {
        self.entries.lock().await.remove(&id);
        Ok(())
    }
}
