// ============================================================================
// Cache Port - cache-aside store for single orders
// ============================================================================
//
// The cache is never authoritative. Entries are written only after a
// successful read from the repository and are invalidated after every
// committed write. Failures here are reported to the caller, who decides
// whether to absorb them.
//
// ============================================================================

mod memory;
mod redis;

pub use self::memory::InMemoryOrderCache;
pub use self::redis::RedisOrderCache;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::Order;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Key under which an order is cached.
pub fn cache_key(id: Uuid) -> String {
    format!("order:{id}")
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cached order could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<::redis::RedisError> for CacheError {
    fn from(e: ::redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait OrderCache: Send + Sync {
    /// `Ok(None)` is a miss.
    async fn get(&self, id: Uuid) -> Result<Option<Order>, CacheError>;

    async fn set(&self, order: &Order, ttl: Duration) -> Result<(), CacheError>;

    /// Deleting an absent key is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        let id = Uuid::parse_str("5f0c6a55-4cf1-4b8e-9d39-0c2a43a6bd4b").unwrap();
        assert_eq!(cache_key(id), "order:5f0c6a55-4cf1-4b8e-9d39-0c2a43a6bd4b");
    }
}
