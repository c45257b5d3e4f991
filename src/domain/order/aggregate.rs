use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{OrderError, ValidationError};
use super::value_objects::{NewOrderItem, OrderItem, OrderStatus};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// Invariants:
// - total == sum of item subtotals, recomputed whenever items change
// - version starts at 1 and moves by exactly 1 per successful mutation
// - a live order always has at least one item
//
// Versioning itself is owned by the repository; the aggregate only carries
// the token it was read with.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub version: i64,

    // Current State
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total: Decimal,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a new pending order from caller input.
    ///
    /// Fails before any item is attached if the customer id or any item is
    /// invalid. The returned order has version 0 until it is persisted.
    pub fn create(customer_id: &str, items: Vec<NewOrderItem>) -> Result<Self, ValidationError> {
        if customer_id.trim().is_empty() {
            return Err(ValidationError::MissingCustomerId);
        }
        let items = attach_items(items)?;

        let now = Utc::now();
        let mut order = Self {
            id: Uuid::new_v4(),
            version: 0,
            customer_id: customer_id.to_string(),
            items,
            status: OrderStatus::Pending,
            total: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        order.total = order.calculate_total()?;
        order.validate()?;

        Ok(order)
    }

    pub fn calculate_total(&self) -> Result<Decimal, ValidationError> {
        total_of(&self.items)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.customer_id.trim().is_empty() {
            return Err(ValidationError::MissingCustomerId);
        }
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }

    /// Replace items wholesale with freshly attached ones and recompute total.
    ///
    /// Leaves the order untouched if the new total overflows.
    pub fn replace_items(&mut self, items: Vec<OrderItem>) -> Result<(), ValidationError> {
        self.total = total_of(&items)?;
        self.items = items;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move to `next` if the state machine allows it.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        let previous = self.status;
        if !previous.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: previous,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Validate every caller item, then attach them all.
///
/// Validation happens up front so a bad item leaves nothing half-built.
pub fn attach_items(items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::NoItems);
    }
    for item in &items {
        item.validate()?;
    }
    let attached = items.into_iter().map(OrderItem::attach).collect::<Result<Vec<_>, _>>()?;
    total_of(&attached)?;
    Ok(attached)
}

fn total_of(items: &[OrderItem]) -> Result<Decimal, ValidationError> {
    items.iter().try_fold(Decimal::ZERO, |total, item| {
        total.checked_add(item.subtotal).ok_or(ValidationError::AmountOverflow)
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
