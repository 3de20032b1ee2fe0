//! Cycle-close placement of standing orders.

mod locks;
mod orchestrator;
mod reconciler;
mod report;


pub use locks::OrderLocks;
pub use orchestrator::PlacementOrchestrator;
pub use reconciler::StockReconciler;
pub use report::{PlacementReport, PlacementResult, ProxyOrderOutcome};
