use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::cache::{CacheError, OrderCache, DEFAULT_TTL};
use crate::domain::order::{
    attach_items, CreateOrder, ListOrders, Order, OrderError, OrderEventType, OrderStatus, PaginatedOrders,
    UpdateOrder,
};
use crate::messaging::{EventPublisher, PublishError};
use crate::metrics::Metrics;
use crate::persistence::{ListFilter, OrderRepository, RepositoryError};

// ============================================================================
// Order Orchestrator - the single entry point for order use cases
// ============================================================================
//
// Coordinates the three ports:
//
//   validate (no I/O) -> Persistence (authoritative) -> Cache (derived)
//                                                    -> Publisher (log)
//
// Only Persistence can fail a call. Cache and Publisher failures are
// logged, counted and swallowed. The orchestrator holds no mutable state;
// concurrent writers are serialized by the version guard in Persistence.
//
// Every port call is bounded by `io_timeout`. Dropping the returned future
// aborts whatever call is in flight.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_ttl: Duration,
    pub io_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            io_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct OrderOrchestrator {
    repo: Arc<dyn OrderRepository>,
    cache: Arc<dyn OrderCache>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    config: OrchestratorConfig,
}

impl OrderOrchestrator {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        cache: Arc<dyn OrderCache>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            repo,
            cache,
            publisher,
            metrics,
            config,
        }
    }

    // ========================================================================
    // Use Cases
    // ========================================================================

    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.do_create_order(cmd).await;
        self.observe("create_order", started, &result);
        result
    }

    async fn do_create_order(&self, cmd: CreateOrder) -> Result<Order, OrderError> {
        let order = Order::create(&cmd.customer_id, cmd.items)?;
        let order = self.persist(self.repo.create(order)).await?;

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            total = %order.total,
            "✅ Order created"
        );

        self.announce(OrderEventType::Created, order.id, self.publisher.publish_created(&order))
            .await;

        Ok(order)
    }

    /// Cache first, then the repository. Only found orders are cached.
    pub async fn get_order(&self, id: Uuid) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.do_get_order(id).await;
        self.observe("get_order", started, &result);
        result
    }

    async fn do_get_order(&self, id: Uuid) -> Result<Order, OrderError> {
        if let Some(order) = self.cache_get(id).await {
            return Ok(order);
        }

        let order = self.persist(self.repo.find_by_id(id)).await?;
        self.cache_set(&order).await;
        Ok(order)
    }

    /// Partial update. Supplied items replace the current ones; a supplied
    /// status must be a legal transition from the current one.
    pub async fn update_order(&self, id: Uuid, cmd: UpdateOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.do_update_order(id, cmd).await;
        self.observe("update_order", started, &result);
        result
    }

    async fn do_update_order(&self, id: Uuid, cmd: UpdateOrder) -> Result<Order, OrderError> {
        let items = cmd.items.map(attach_items).transpose()?;

        // Always the authoritative copy: its version guards the write
        let mut order = self.persist(self.repo.find_by_id(id)).await?;

        if let Some(status) = cmd.status {
            order.transition_to(status)?;
        }
        if let Some(items) = items {
            order.replace_items(items)?;
        }
        order.validate()?;

        let order = self.persist(self.repo.update(order)).await?;
        tracing::info!(order_id = %order.id, version = order.version, "✅ Order updated");

        self.cache_invalidate(order.id).await;
        self.announce(OrderEventType::Updated, order.id, self.publisher.publish_updated(&order))
            .await;

        Ok(order)
    }

    pub async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.do_update_order_status(id, status).await;
        self.observe("update_order_status", started, &result);
        result
    }

    async fn do_update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, OrderError> {
        let mut order = self.persist(self.repo.find_by_id(id)).await?;
        let previous = order.transition_to(status)?;

        let order = self.persist(self.repo.update(order)).await?;
        tracing::info!(
            order_id = %order.id,
            from = %previous,
            to = %status,
            version = order.version,
            "✅ Order status changed"
        );

        self.cache_invalidate(order.id).await;
        self.announce(
            OrderEventType::StatusChanged,
            order.id,
            self.publisher.publish_status_changed(&order, previous, status),
        )
        .await;

        Ok(order)
    }

    /// Soft delete, then drop any cached copy.
    pub async fn delete_order(&self, id: Uuid) -> Result<(), OrderError> {
        let started = Instant::now();
        let result = self.do_delete_order(id).await;
        self.observe("delete_order", started, &result);
        result
    }

    async fn do_delete_order(&self, id: Uuid) -> Result<(), OrderError> {
        self.persist(self.repo.find_by_id(id)).await?;
        self.persist(self.repo.soft_delete(id)).await?;
        tracing::info!(order_id = %id, "🗑️ Order deleted");

        self.cache_invalidate(id).await;
        Ok(())
    }

    pub async fn list_orders(&self, query: ListOrders) -> Result<PaginatedOrders, OrderError> {
        let started = Instant::now();
        let result = self.do_list_orders(query).await;
        self.observe("list_orders", started, &result);
        result
    }

    async fn do_list_orders(&self, query: ListOrders) -> Result<PaginatedOrders, OrderError> {
        let page = query.normalized_page();
        let page_size = query.normalized_page_size();
        let offset = query.offset();
        let filter = ListFilter { status: query.status };

        let result = match query.customer_filter() {
            Some(customer_id) => {
                self.persist(self.repo.list_by_customer(customer_id, &filter, page_size, offset))
                    .await?
            }
            None => self.persist(self.repo.list(&filter, page_size, offset)).await?,
        };

        Ok(PaginatedOrders {
            total_pages: PaginatedOrders::total_pages(result.total_count, page_size),
            orders: result.orders,
            page,
            page_size,
            total_count: result.total_count,
        })
    }

    /// Probe the authoritative store. Used by readiness checks.
    pub async fn ping_store(&self) -> Result<(), OrderError> {
        self.persist(self.repo.ping()).await
    }

    // ========================================================================
    // Port Wrappers
    // ========================================================================

    async fn persist<T>(&self, call: impl Future<Output = Result<T, RepositoryError>>) -> Result<T, OrderError> {
        match tokio::time::timeout(self.config.io_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if let RepositoryError::ConcurrentModification { id, expected_version } = &e {
                    tracing::warn!(order_id = %id, expected_version, "Concurrent modification detected");
                    self.metrics.record_concurrent_modification();
                }
                Err(e.into())
            }
            Err(_) => {
                tracing::error!(timeout_ms = self.config.io_timeout.as_millis() as u64, "❌ Persistence call timed out");
                Err(OrderError::Unavailable("persistence call timed out".to_string()))
            }
        }
    }

    async fn cache_get(&self, id: Uuid) -> Option<Order> {
        match self.bounded(self.cache.get(id)).await {
            Ok(Some(order)) => {
                self.metrics.record_cache_lookup("hit");
                Some(order)
            }
            Ok(None) => {
                self.metrics.record_cache_lookup("miss");
                None
            }
            Err(e) => {
                tracing::warn!(order_id = %id, error = %e, "Cache read failed, falling back to store");
                self.metrics.record_cache_lookup("error");
                self.metrics.record_cache_error("get");
                None
            }
        }
    }

    async fn cache_set(&self, order: &Order) {
        if let Err(e) = self.bounded(self.cache.set(order, self.config.cache_ttl)).await {
            tracing::warn!(order_id = %order.id, error = %e, "Cache write failed");
            self.metrics.record_cache_error("set");
        }
    }

    async fn cache_invalidate(&self, id: Uuid) {
        if let Err(e) = self.bounded(self.cache.delete(id)).await {
            tracing::warn!(order_id = %id, error = %e, "Cache invalidation failed");
            self.metrics.record_cache_error("delete");
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, CacheError>>) -> Result<T, CacheError> {
        tokio::time::timeout(self.config.io_timeout, call)
            .await
            .unwrap_or_else(|_| Err(CacheError::Backend("cache call timed out".to_string())))
    }

    /// Publish after commit. Failures never reach the caller.
    async fn announce(
        &self,
        event_type: OrderEventType,
        order_id: Uuid,
        call: impl Future<Output = Result<(), PublishError>>,
    ) {
        let failure = match tokio::time::timeout(self.config.io_timeout, call).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "publish timed out".to_string(),
        };

        tracing::warn!(
            order_id = %order_id,
            event_type = event_type.as_str(),
            error = %failure,
            "Event publish failed after commit"
        );
        self.metrics.record_publish_failure(event_type.as_str());
    }

    fn observe<T>(&self, operation: &str, started: Instant, result: &Result<T, OrderError>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(OrderError::Validation(_)) => "validation",
            Err(OrderError::NotFound(_)) => "not_found",
            Err(OrderError::InvalidTransition { .. }) => "invalid_transition",
            Err(OrderError::ConcurrentModification(_)) => "conflict",
            Err(OrderError::Unavailable(_)) => "unavailable",
            Err(OrderError::Internal(_)) => "internal",
        };
        if let Err(e) = result {
            tracing::debug!(operation, outcome, error = %e, "Order operation failed");
        }
        self.metrics
            .record_operation(operation, outcome, started.elapsed().as_secs_f64());
    }
}
