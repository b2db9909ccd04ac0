//! Staged outbound mutations and their replay
//!
//! Writes made while the network is unavailable are staged here and replayed
//! once connectivity returns, with at-least-once delivery and removal only on
//! confirmed success.

pub mod mutation;
pub mod queue;

pub use mutation::{DeliveryConfig, DeliveryMethod, PayloadTransform, QueuedMutation};
pub use queue::{Outbox, SyncQueue, SyncReport};
