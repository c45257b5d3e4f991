// ============================================================================
// Persistence Port - durable order storage with optimistic locking
// ============================================================================
//
// The relational store is the single source of truth. Every write is
// guarded by the version the caller read; a mismatch is reported, never
// blocked on.
//
// Variants:
// - postgres/ - production adapter (sqlx)
// - memory/   - in-process adapter for tests and local runs
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::{Order, OrderError, OrderStatus};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("order not found: {0}")]
    NotFound(Uuid),

    #[error("order {id} changed since version {expected_version} was read")]
    ConcurrentModification { id: Uuid, expected_version: i64 },

    #[error("order {0} already exists")]
    Conflict(Uuid),

    #[error("storage backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::Backend(e.into())
    }
}

impl From<RepositoryError> for OrderError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(id) => OrderError::NotFound(id),
            RepositoryError::ConcurrentModification { id, .. } => OrderError::ConcurrentModification(id),
            other => OrderError::Internal(other.into()),
        }
    }
}

/// Optional filters shared by both listing queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub status: Option<OrderStatus>,
}

/// One page of orders plus the number of orders matching the filter.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total_count: i64,
}

/// Durable storage for orders.
///
/// Soft-deleted orders are invisible to every method except where noted.
/// Listings are ordered newest first so pagination is stable across pages.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order with version 1 and return the stored row.
    async fn create(&self, order: Order) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError>;

    /// Conditional write guarded by `order.id` and `order.version`.
    ///
    /// Returns the stored row with the version incremented by one. When no
    /// row matched, reports `NotFound` if no live row exists and
    /// `ConcurrentModification` if it exists with a different version.
    async fn update(&self, order: Order) -> Result<Order, RepositoryError>;

    /// Mark the order deleted. `NotFound` if absent or already deleted.
    async fn soft_delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn list(&self, filter: &ListFilter, limit: i64, offset: i64) -> Result<OrderPage, RepositoryError>;

    async fn list_by_customer(
        &self,
        customer_id: &str,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<OrderPage, RepositoryError>;

    /// Liveness probe used by readiness checks.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
