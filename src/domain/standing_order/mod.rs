// ============================================================================
// Standing Order Domain
// ============================================================================
//
// Recurring-purchase templates, the order cycles they belong to, and the
// proxy orders linking the two to concrete orders.
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod repository;

pub use value_objects::*;
pub use errors::*;
pub use repository::*;
