use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ListFilter, OrderPage, OrderRepository, RepositoryError};
use crate::domain::order::Order;

// ============================================================================
// In-Memory Order Repository
// ============================================================================
//
// Same contract as the Postgres adapter, held behind a single RwLock so the
// version check and the write happen atomically. Rows are never removed;
// soft deletes only stamp `deleted_at`.
//
// ============================================================================

struct StoredOrder {
    // Insertion sequence, breaks created_at ties so listing stays stable
    seq: u64,
    order: Order,
}

#[derive(Default)]
struct Rows {
    next_seq: u64,
    by_id: HashMap<Uuid, StoredOrder>,
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    rows: RwLock<Rows>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn page<F>(&self, matches: F, limit: i64, offset: i64) -> OrderPage
    where
        F: Fn(&Order) -> bool,
    {
        let rows = self.rows.read().await;

        let mut live: Vec<&StoredOrder> = rows
            .by_id
            .values()
            .filter(|row| !row.order.is_deleted() && matches(&row.order))
            .collect();

        live.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        let total_count = live.len() as i64;
        let orders = live
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|row| row.order.clone())
            .collect();

        OrderPage { orders, total_count }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.by_id.contains_key(&order.id) {
            return Err(RepositoryError::Conflict(order.id));
        }

        order.version = 1;
        order.deleted_at = None;

        rows.next_seq += 1;
        let seq = rows.next_seq;
        rows.by_id.insert(order.id, StoredOrder { seq, order: order.clone() });

        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError> {
        let rows = self.rows.read().await;
        rows.by_id
            .get(&id)
            .filter(|row| !row.order.is_deleted())
            .map(|row| row.order.clone())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn update(&self, order: Order) -> Result<Order, RepositoryError> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .by_id
            .get_mut(&order.id)
            .filter(|row| !row.order.is_deleted())
            .ok_or(RepositoryError::NotFound(order.id))?;

        if stored.order.version != order.version {
            return Err(RepositoryError::ConcurrentModification {
                id: order.id,
                expected_version: order.version,
            });
        }

        let current = &mut stored.order;
        current.customer_id = order.customer_id;
        current.items = order.items;
        current.status = order.status;
        current.total = order.total;
        current.version += 1;
        current.updated_at = Utc::now();

        Ok(current.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .by_id
            .get_mut(&id)
            .filter(|row| !row.order.is_deleted())
            .ok_or(RepositoryError::NotFound(id))?;

        let now = Utc::now();
        stored.order.deleted_at = Some(now);
        stored.order.updated_at = now;
        stored.order.version += 1;

        Ok(())
    }

    async fn list(&self, filter: &ListFilter, limit: i64, offset: i64) -> Result<OrderPage, RepositoryError> {
        let status = filter.status;
        Ok(self
            .page(|order| status.map_or(true, |s| order.status == s), limit, offset)
            .await)
    }

    async fn list_by_customer(
        &self,
        customer_id: &str,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<OrderPage, RepositoryError> {
        let status = filter.status;
        Ok(self
            .page(
                |order| order.customer_id == customer_id && status.map_or(true, |s| order.status == s),
                limit,
                offset,
            )
            .await)
    }
}
