pub mod alerting;
pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod inventory;
pub mod messaging;
pub mod metrics;
pub mod placement;
pub mod utils;
