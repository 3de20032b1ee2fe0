mod notification;
mod outbox;
mod resilient;

pub use notification::{NotifiedLineItem, PlacementNotification, PlacementNotifier};
pub use outbox::{OutboxMessage, OutboxNotifier};
pub use resilient::ResilientNotifier;
