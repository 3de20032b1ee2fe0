// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory. This layer is separate from the
// event sourcing infrastructure and from the placement job that drives it.
//
// ============================================================================

pub mod order;
pub mod standing_order;
