use rust_decimal::Decimal;
use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Validation Errors - detected from in-memory state, no I/O
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("customer id is required")]
    MissingCustomerId,

    #[error("order must have at least one item")]
    NoItems,

    #[error("product id is required")]
    MissingProductId,

    #[error("product name is required")]
    MissingProductName,

    #[error("quantity must be greater than 0, got {0}")]
    InvalidQuantity(i32),

    #[error("price must be greater than 0, got {0}")]
    InvalidPrice(Decimal),

    #[error("order amount exceeds the supported range")]
    AmountOverflow,

    #[error("invalid order status: {0}")]
    InvalidStatus(String),
}

// ============================================================================
// Order Errors - what callers of the orchestrator observe
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("order not found: {0}")]
    NotFound(Uuid),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order {0} was modified by another process")]
    ConcurrentModification(Uuid),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl OrderError {
    /// Stable machine-readable code, used by transport adapters.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::Validation(ValidationError::MissingCustomerId) => "INVALID_CUSTOMER_ID",
            OrderError::Validation(ValidationError::NoItems) => "NO_ITEMS",
            OrderError::Validation(ValidationError::InvalidStatus(_)) => "INVALID_STATUS",
            OrderError::Validation(ValidationError::AmountOverflow) => "INVALID_AMOUNT",
            OrderError::Validation(_) => "INVALID_ITEM",
            OrderError::NotFound(_) => "ORDER_NOT_FOUND",
            OrderError::InvalidTransition { .. } => "INVALID_TRANSITION",
            OrderError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            OrderError::Unavailable(_) => "UNAVAILABLE",
            OrderError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
