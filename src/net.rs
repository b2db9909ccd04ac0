//! Connectivity reporting
//!
//! The offline layer never probes the network itself; the embedding
//! application reports transitions here, and the rest of the system reads
//! the flag (sync-pass guard) or watches edges (reconciliation trigger).

use std::sync::Arc;
use tokio::sync::watch;

/// Shared online/offline flag.
///
/// Cloning hands out another handle to the same underlying state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Create a handle with the given initial state
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Create a handle that starts online
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Current state
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Report a transition. No-op (and no watcher wakeup) if unchanged.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            log::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::online()
    }
}
