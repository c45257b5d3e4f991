// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Entities, the status state machine and validation rules. This layer has
// no dependency on storage, cache or broker code.
//
// ============================================================================

pub mod order;
