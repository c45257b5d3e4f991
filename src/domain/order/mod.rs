// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderItem, NewOrderItem, OrderStatus state machine)
// - Events (the wire record written to the event log)
// - Commands (CreateOrder, UpdateOrder, ListOrders)
// - Errors (ValidationError, OrderError)
// - Aggregate (Order with its invariants)
//
// Nothing here performs I/O.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
