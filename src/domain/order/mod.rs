// ============================================================================
// Order Domain - Business Logic for Order Aggregate
// ============================================================================
//
// - Value objects (LineItem, OrderState, QuantityChanges)
// - Events (OrderCreated, LineItemQuantityCapped, OrderStateAdvanced)
// - Commands (CreateOrder, CapQuantities, AdvanceTo)
// - Errors (OrderError, ValidationErrors)
// - Aggregate (OrderAggregate)
// - Checkout state machine (transition, CheckoutRules)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod state_machine;
pub mod command_handler;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use state_machine::*;
pub use command_handler::*;
