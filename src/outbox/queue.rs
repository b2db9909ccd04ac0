//! Durable outbox and the application-level sync queue
//!
//! One replay mechanism, two users: the application's [`SyncQueue`] and the
//! gateway's deferred-write staging both run on [`Outbox`], parameterized by
//! storage collection. Delivery is at-least-once: an entry leaves the queue
//! only on a confirmed HTTP success, so the remote endpoints must treat
//! re-delivery of an already-applied mutation (same record id) as a safe
//! upsert.

use serde_json::Value;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;

use super::mutation::{DeliveryConfig, QueuedMutation};
use crate::error::QueueError;
use crate::net::Connectivity;
use crate::store::{OfflineStore, StoreOptions};

/// Outcome of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries in the snapshot this pass worked through
    pub attempted: usize,
    /// Entries confirmed by the server and removed
    pub delivered: usize,
    /// Entries left queued for a future pass
    pub failed: usize,
}

impl SyncReport {
    fn none() -> Self {
        Self::default()
    }
}

/// A persisted queue of pending mutations with idempotent-ack replay.
///
/// The in-memory queue is authoritative so staging keeps working when local
/// persistence is degraded; the store mirror is what survives a restart.
#[derive(Clone)]
pub struct Outbox {
    store: OfflineStore,
    collection: String,
    http: reqwest::Client,
    entries: Arc<StdMutex<Vec<QueuedMutation>>>,
    /// Held for the duration of a pass; `try_lock` failure means a pass is
    /// already in flight and the caller backs off.
    pass_guard: Arc<AsyncMutex<()>>,
}

impl Outbox {
    /// Create an outbox over the given store collection, reloading any
    /// entries a previous session persisted.
    pub fn new(store: OfflineStore, collection: impl Into<String>, http: reqwest::Client) -> Self {
        let collection = collection.into();
        let entries: Vec<QueuedMutation> = store.get_all(&collection);
        if !entries.is_empty() {
            log::info!(
                "Reloaded {} pending mutation(s) from {}",
                entries.len(),
                collection
            );
        }

        Self {
            store,
            collection,
            http,
            entries: Arc::new(StdMutex::new(entries)),
            pass_guard: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Stage a mutation, keyed by the payload's `id`.
    ///
    /// Re-staging an id overwrites the payload in place, keeping the entry's
    /// original queue position. The entry is persisted immediately
    /// (best-effort).
    pub fn enqueue(&self, data: Value, config: DeliveryConfig) -> Result<(), QueueError> {
        let mutation = QueuedMutation::new(data, config)?;
        let id = mutation.id.clone();

        {
            let mut entries = self.lock_entries();
            match entries.iter_mut().find(|m| m.id == id) {
                Some(existing) => *existing = mutation.clone(),
                None => entries.push(mutation.clone()),
            }
        }

        self.store
            .put(&self.collection, &id, &mutation, StoreOptions::keep());
        log::debug!("Staged mutation {} in {}", id, self.collection);
        Ok(())
    }

    /// Replay the queue against its endpoints.
    ///
    /// No-op if a pass is already in flight or the queue is empty. Works
    /// through a snapshot of the entries at pass start, so concurrent
    /// enqueues are picked up by the next pass rather than this one. An
    /// entry is removed only on HTTP success; failures stay queued, with no
    /// in-pass retry or backoff (passes are externally re-triggered).
    pub async fn drain(&self) -> SyncReport {
        let Ok(_pass) = self.pass_guard.try_lock() else {
            log::debug!("Sync pass for {} already running, skipping", self.collection);
            return SyncReport::none();
        };

        let snapshot: Vec<QueuedMutation> = self.lock_entries().clone();
        if snapshot.is_empty() {
            return SyncReport::none();
        }

        let mut report = SyncReport {
            attempted: snapshot.len(),
            ..SyncReport::none()
        };

        for mutation in &snapshot {
            match self.deliver(mutation).await {
                Ok(()) => {
                    self.remove(&mutation.id);
                    report.delivered += 1;
                    log::debug!("Synced mutation {}", mutation.id);
                }
                Err(reason) => {
                    report.failed += 1;
                    log::warn!("Failed to sync mutation {}: {}", mutation.id, reason);
                }
            }
        }

        log::info!(
            "Sync pass over {}: {} delivered, {} pending",
            self.collection,
            report.delivered,
            report.failed
        );
        report
    }

    async fn deliver(&self, mutation: &QueuedMutation) -> Result<(), String> {
        let payload = mutation.config.transform.apply(&mutation.data);

        let mut request = self
            .http
            .request(mutation.config.method.as_reqwest(), &mutation.config.endpoint)
            .json(&payload);
        for (name, value) in &mutation.config.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("server responded {}", status))
        }
    }

    fn remove(&self, id: &str) {
        self.lock_entries().retain(|m| m.id != id);
        self.store.delete(&self.collection, id);
    }

    /// Number of mutations waiting for delivery
    pub fn pending_count(&self) -> usize {
        self.lock_entries().len()
    }

    /// Ids of pending mutations in queue order
    pub fn pending_ids(&self) -> Vec<String> {
        self.lock_entries().iter().map(|m| m.id.clone()).collect()
    }

    /// Drop every pending mutation (administrative/debug operation)
    pub fn clear(&self) {
        self.lock_entries().clear();
        self.store.clear(&self.collection);
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<QueuedMutation>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Application-level sync queue.
///
/// An [`Outbox`] bound to the connectivity flag: staging while online kicks
/// off an immediate best-effort pass, and [`attempt_sync`](Self::attempt_sync)
/// refuses to run while the runtime reports offline.
#[derive(Clone)]
pub struct SyncQueue {
    outbox: Outbox,
    connectivity: Connectivity,
}

impl SyncQueue {
    pub fn new(store: OfflineStore, http: reqwest::Client, connectivity: Connectivity) -> Self {
        Self {
            outbox: Outbox::new(store, crate::store::collections::SYNC_QUEUE, http),
            connectivity,
        }
    }

    /// Stage a mutation. If the runtime reports online, a sync pass is
    /// started in the background (fire-and-forget).
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, data: Value, config: DeliveryConfig) -> Result<(), QueueError> {
        self.outbox.enqueue(data, config)?;

        if self.connectivity.is_online() {
            let queue = self.clone();
            tokio::spawn(async move {
                queue.attempt_sync().await;
            });
        }
        Ok(())
    }

    /// Run one sync pass, unless offline, empty, or a pass is already
    /// in flight.
    pub async fn attempt_sync(&self) -> SyncReport {
        if !self.connectivity.is_online() {
            log::debug!("Offline, skipping sync pass");
            return SyncReport::default();
        }
        self.outbox.drain().await
    }

    /// Number of mutations waiting for delivery
    pub fn pending_count(&self) -> usize {
        self.outbox.pending_count()
    }

    /// Ids of pending mutations in queue order
    pub fn pending_ids(&self) -> Vec<String> {
        self.outbox.pending_ids()
    }

    /// Drop every pending mutation (administrative/debug operation)
    pub fn clear(&self) {
        self.outbox.clear()
    }
}
