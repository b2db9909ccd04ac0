//! Durable local store
//!
//! Namespaced, crash-durable key-value persistence with lazy expiry. Used by
//! application code for read-through copies of remote records and by the
//! outboxes for staged writes.

pub mod storage;

use std::time::Duration;

/// Fixed collection names.
///
/// The store is provisioned for exactly these collections; there is no
/// create-on-demand API.
pub mod collections {
    /// Application-level sync queue entries
    pub const SYNC_QUEUE: &str = "sync_queue";
    /// Quiz results staged by the gateway while offline
    pub const PENDING_QUIZ_RESULTS: &str = "pending_quiz_results";
    /// Progress updates staged by the gateway while offline
    pub const PENDING_PROGRESS: &str = "pending_progress";
    /// Read-through copies of animal records
    pub const CACHED_ANIMALS: &str = "cached_animals";
    /// Read-through copies of quiz records
    pub const CACHED_QUIZZES: &str = "cached_quizzes";
}

/// Retention for read-through record copies
pub struct StoreTtl;

impl StoreTtl {
    /// Animal encyclopedia entries change rarely
    pub const ANIMALS: Duration = Duration::from_secs(24 * 60 * 60); // 24 hr
    /// Quizzes are edited by teachers, keep shorter
    pub const QUIZZES: Duration = Duration::from_secs(6 * 60 * 60); // 6 hr
}

/// Options for a single put
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Time until the record expires; expired records are never returned
    /// by reads and are lazily evicted when a read encounters them.
    pub expiry: Option<Duration>,
}

impl StoreOptions {
    /// No expiry; the record persists until deleted or its collection is cleared
    pub fn keep() -> Self {
        Self::default()
    }

    /// Expire after the given duration
    pub fn expire_after(expiry: Duration) -> Self {
        Self {
            expiry: Some(expiry),
        }
    }
}

pub use storage::OfflineStore;
