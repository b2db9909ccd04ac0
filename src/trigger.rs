//! Reconciliation trigger
//!
//! Binds connectivity restoration and platform background-sync signals to
//! replay. Purely event-driven: there is no polling loop, so nothing runs
//! until a signal arrives.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gateway::{Gateway, SyncTag};
use crate::net::Connectivity;
use crate::outbox::SyncQueue;

/// Handle for the background reconciliation task
pub struct ReconciliationTrigger {
    handle: JoinHandle<()>,
    signals: mpsc::Sender<SyncTag>,
}

impl ReconciliationTrigger {
    /// Spawn the trigger task.
    ///
    /// On every offline-to-online transition the sync queue is drained; on
    /// every recognized background-sync tag the gateway's matching
    /// deferred-write outbox is drained. The task ends when the trigger
    /// handle is dropped and the connectivity source goes away.
    pub fn spawn(connectivity: &Connectivity, queue: SyncQueue, gateway: Arc<Gateway>) -> Self {
        let (signals, mut signal_rx) = mpsc::channel::<SyncTag>(16);
        let mut watch_rx = connectivity.subscribe();

        let handle = tokio::spawn(async move {
            let mut was_online = *watch_rx.borrow();
            loop {
                tokio::select! {
                    changed = watch_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *watch_rx.borrow_and_update();
                        if online && !was_online {
                            log::info!("Connectivity restored, replaying sync queue");
                            queue.attempt_sync().await;
                        }
                        was_online = online;
                    }
                    signal = signal_rx.recv() => {
                        match signal {
                            Some(tag) => {
                                gateway.handle_sync(tag).await;
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        Self { handle, signals }
    }

    /// Deliver a platform background-sync signal.
    ///
    /// Unrecognized tags never reach this point; parse with
    /// [`SyncTag::from_str`](std::str::FromStr) first.
    pub async fn signal(&self, tag: SyncTag) {
        if self.signals.send(tag).await.is_err() {
            log::warn!("Reconciliation task is gone, dropping sync signal");
        }
    }

    /// Stop the background task
    pub fn shutdown(self) {
        self.handle.abort();
    }
}
