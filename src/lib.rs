//! Offline cache and sync layer for the Wildlife Guardians learning platform
//!
//! The platform's UI talks to a hosted data service; this crate keeps it
//! usable when the network is not. Four pieces, leaf-first:
//!
//! - [`store::OfflineStore`]: durable, namespaced local records with lazy
//!   expiry. Best-effort by contract: persistence failures degrade to empty
//!   results, never errors.
//! - [`outbox`]: staged outbound mutations with at-least-once replay. One
//!   mechanism ([`outbox::Outbox`]) behind both the application-level
//!   [`outbox::SyncQueue`] and the gateway's deferred writes.
//! - [`gateway::Gateway`]: request interception, with per-class caching
//!   strategies over versioned cache namespaces, offline fallbacks, and
//!   background-sync replay of deferred writes.
//! - [`trigger::ReconciliationTrigger`]: binds connectivity restoration
//!   and background-sync signals to the replay routines.
//!
//! All components are explicit constructed instances; wire them up once at
//! application start:
//!
//! ```no_run
//! use std::sync::Arc;
//! use wildlife_offline::config::OfflineConfig;
//! use wildlife_offline::gateway::{Gateway, ResponseCache};
//! use wildlife_offline::net::Connectivity;
//! use wildlife_offline::outbox::SyncQueue;
//! use wildlife_offline::store::OfflineStore;
//! use wildlife_offline::trigger::ReconciliationTrigger;
//!
//! # async fn wire() -> wildlife_offline::error::Result<()> {
//! let config = OfflineConfig::default();
//! let store = OfflineStore::open_at(&config.data_dir());
//! let cache = ResponseCache::open_at(&config.data_dir());
//! let connectivity = Connectivity::online();
//!
//! let queue = SyncQueue::new(store.clone(), reqwest::Client::new(), connectivity.clone());
//! let gateway = Arc::new(Gateway::new(config, store, cache)?);
//! gateway.install().await;
//! gateway.activate();
//!
//! let trigger = ReconciliationTrigger::spawn(&connectivity, queue, gateway);
//! # let _ = trigger;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod net;
pub mod outbox;
pub mod store;
pub mod trigger;

pub use client::{CachedWildlifeClient, Fetched, WildlifeApi, WildlifeClient, WriteDisposition};
pub use config::OfflineConfig;
pub use error::{ApiError, Error, QueueError, Result};
pub use gateway::{Gateway, GatewayRequest, GatewayResponse, ResponseCache, SyncTag};
pub use net::Connectivity;
pub use outbox::{DeliveryConfig, DeliveryMethod, Outbox, SyncQueue, SyncReport};
pub use store::{OfflineStore, StoreOptions};
pub use trigger::ReconciliationTrigger;
