//! Offline-aware wrapper for the data service client
//!
//! Reads are network-first with write-through of the records into the local
//! store; when the network is unreachable they fall back to the stored
//! copies. Writes go straight to the service while online and are staged in
//! the sync queue otherwise, so nothing the user does is lost to a dead
//! connection.

use std::sync::RwLock;

use serde_json::Value;

use super::WildlifeApi;
use super::models::{Activity, Animal, Badge, Quiz, QuizResult, UserProgress};
use crate::config::OfflineConfig;
use crate::error::{ApiError, Error, Result};
use crate::net::Connectivity;
use crate::outbox::{DeliveryConfig, DeliveryMethod, SyncQueue};
use crate::store::{OfflineStore, StoreOptions, StoreTtl, collections};

/// Data plus a flag telling the UI it is looking at an offline copy
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    pub offline: bool,
}

impl<T> Fetched<T> {
    fn live(data: T) -> Self {
        Self {
            data,
            offline: false,
        }
    }

    fn stored(data: T) -> Self {
        Self {
            data,
            offline: true,
        }
    }
}

/// What happened to a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    /// The service acknowledged the write
    Delivered,
    /// Staged in the sync queue for replay on reconnect
    Queued,
}

/// Offline-aware facade over any [`WildlifeApi`] implementation
pub struct CachedWildlifeClient<C: WildlifeApi> {
    inner: C,
    store: OfflineStore,
    queue: SyncQueue,
    connectivity: Connectivity,
    api_base: String,
    session_token: RwLock<Option<String>>,
}

impl<C: WildlifeApi> CachedWildlifeClient<C> {
    pub fn new(
        inner: C,
        store: OfflineStore,
        queue: SyncQueue,
        connectivity: Connectivity,
        config: &OfflineConfig,
    ) -> Self {
        Self {
            inner,
            store,
            queue,
            connectivity,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            session_token: RwLock::new(None),
        }
    }

    /// Token attached to queued deliveries staged after this call
    pub fn set_session_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.session_token.write() {
            *guard = token;
        }
    }

    /// The sync queue backing offline writes
    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// List animals, from the network when possible, else the local store
    pub async fn list_animals(&self) -> Result<Fetched<Vec<Animal>>> {
        if !self.connectivity.is_online() {
            return self.animals_from_store(None);
        }

        match self.inner.list_animals().await {
            Ok(animals) => {
                for animal in &animals {
                    self.store.put(
                        collections::CACHED_ANIMALS,
                        &animal.id,
                        animal,
                        StoreOptions::expire_after(StoreTtl::ANIMALS),
                    );
                }
                Ok(Fetched::live(animals))
            }
            Err(Error::Api(e)) if e.is_network() => self.animals_from_store(Some(e)),
            Err(e) => Err(e),
        }
    }

    /// Get one animal, falling back to its stored copy
    pub async fn get_animal(&self, id: &str) -> Result<Fetched<Animal>> {
        if !self.connectivity.is_online() {
            return self.animal_from_store(id, None);
        }

        match self.inner.get_animal(id).await {
            Ok(animal) => {
                self.store.put(
                    collections::CACHED_ANIMALS,
                    &animal.id,
                    &animal,
                    StoreOptions::expire_after(StoreTtl::ANIMALS),
                );
                Ok(Fetched::live(animal))
            }
            Err(Error::Api(e)) if e.is_network() => self.animal_from_store(id, Some(e)),
            Err(e) => Err(e),
        }
    }

    /// List quizzes, from the network when possible, else the local store
    pub async fn list_quizzes(&self) -> Result<Fetched<Vec<Quiz>>> {
        if !self.connectivity.is_online() {
            return self.quizzes_from_store(None);
        }

        match self.inner.list_quizzes().await {
            Ok(quizzes) => {
                for quiz in &quizzes {
                    self.store.put(
                        collections::CACHED_QUIZZES,
                        &quiz.id,
                        quiz,
                        StoreOptions::expire_after(StoreTtl::QUIZZES),
                    );
                }
                Ok(Fetched::live(quizzes))
            }
            Err(Error::Api(e)) if e.is_network() => self.quizzes_from_store(Some(e)),
            Err(e) => Err(e),
        }
    }

    /// Get one quiz, falling back to its stored copy
    pub async fn get_quiz(&self, id: &str) -> Result<Fetched<Quiz>> {
        if !self.connectivity.is_online() {
            return self.quiz_from_store(id, None);
        }

        match self.inner.get_quiz(id).await {
            Ok(quiz) => {
                self.store.put(
                    collections::CACHED_QUIZZES,
                    &quiz.id,
                    &quiz,
                    StoreOptions::expire_after(StoreTtl::QUIZZES),
                );
                Ok(Fetched::live(quiz))
            }
            Err(Error::Api(e)) if e.is_network() => self.quiz_from_store(id, Some(e)),
            Err(e) => Err(e),
        }
    }

    /// List badges. Badges are not cached locally; offline callers get
    /// [`ApiError::Offline`].
    pub async fn list_badges(&self) -> Result<Vec<Badge>> {
        if !self.connectivity.is_online() {
            return Err(ApiError::Offline.into());
        }
        self.inner.list_badges().await
    }

    /// Record a quiz attempt, staging it for replay when the service is
    /// unreachable
    pub async fn submit_quiz_result(&self, result: &QuizResult) -> Result<WriteDisposition> {
        if !self.connectivity.is_online() {
            return self.stage(result, "/quiz-results", DeliveryMethod::Post);
        }

        match self.inner.submit_quiz_result(result).await {
            Ok(()) => Ok(WriteDisposition::Delivered),
            Err(Error::Api(e)) if e.is_network() => {
                self.stage(result, "/quiz-results", DeliveryMethod::Post)
            }
            Err(e) => Err(e),
        }
    }

    /// Update the user's progress snapshot, staging it for replay when the
    /// service is unreachable
    pub async fn update_progress(&self, progress: &UserProgress) -> Result<WriteDisposition> {
        if !self.connectivity.is_online() {
            return self.stage(progress, "/user/progress", DeliveryMethod::Put);
        }

        match self.inner.update_progress(progress).await {
            Ok(()) => Ok(WriteDisposition::Delivered),
            Err(Error::Api(e)) if e.is_network() => {
                self.stage(progress, "/user/progress", DeliveryMethod::Put)
            }
            Err(e) => Err(e),
        }
    }

    /// Append to the activity log. Best-effort: offline activity is dropped,
    /// not staged.
    pub async fn log_activity(&self, activity: &Activity) -> Result<()> {
        if !self.connectivity.is_online() {
            log::debug!("Offline, dropping activity log entry {}", activity.id);
            return Ok(());
        }
        match self.inner.log_activity(activity).await {
            Ok(()) => Ok(()),
            Err(Error::Api(e)) if e.is_network() => {
                log::debug!("Network failure, dropping activity log entry {}", activity.id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn stage<T: serde::Serialize>(
        &self,
        record: &T,
        path: &str,
        method: DeliveryMethod,
    ) -> Result<WriteDisposition> {
        let mut config = DeliveryConfig::new(format!("{}{}", self.api_base, path), method);
        if let Some(token) = self
            .session_token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
        {
            config = config.with_bearer_token(&token);
        }

        let data: Value = serde_json::to_value(record)?;
        self.queue.enqueue(data, config)?;
        Ok(WriteDisposition::Queued)
    }

    fn animals_from_store(&self, cause: Option<ApiError>) -> Result<Fetched<Vec<Animal>>> {
        let cached: Vec<Animal> = self.store.get_all(collections::CACHED_ANIMALS);
        if cached.is_empty() {
            Err(cause.unwrap_or(ApiError::Offline).into())
        } else {
            log::debug!("Serving {} animals from the local store", cached.len());
            Ok(Fetched::stored(cached))
        }
    }

    fn animal_from_store(&self, id: &str, cause: Option<ApiError>) -> Result<Fetched<Animal>> {
        match self.store.get(collections::CACHED_ANIMALS, id) {
            Some(animal) => Ok(Fetched::stored(animal)),
            None => Err(cause.unwrap_or(ApiError::Offline).into()),
        }
    }

    fn quizzes_from_store(&self, cause: Option<ApiError>) -> Result<Fetched<Vec<Quiz>>> {
        let cached: Vec<Quiz> = self.store.get_all(collections::CACHED_QUIZZES);
        if cached.is_empty() {
            Err(cause.unwrap_or(ApiError::Offline).into())
        } else {
            log::debug!("Serving {} quizzes from the local store", cached.len());
            Ok(Fetched::stored(cached))
        }
    }

    fn quiz_from_store(&self, id: &str, cause: Option<ApiError>) -> Result<Fetched<Quiz>> {
        match self.store.get(collections::CACHED_QUIZZES, id) {
            Some(quiz) => Ok(Fetched::stored(quiz)),
            None => Err(cause.unwrap_or(ApiError::Offline).into()),
        }
    }
}
