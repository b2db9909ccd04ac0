//! Remote data service client
//!
//! The service is an opaque resource-style HTTP backend; this module is the
//! only place that knows its endpoints. The offline layer assumes the write
//! endpoints are idempotent by record id, so a replayed mutation lands as a
//! safe upsert.

use async_trait::async_trait;

use crate::error::Result;

pub mod cached;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod wildlife;

pub use cached::{CachedWildlifeClient, Fetched, WriteDisposition};
#[cfg(test)]
#[allow(unused_imports)]
pub use mock::MockWildlifeClient;
pub use models::{
    Activity, Animal, ApiEnvelope, Badge, Quiz, QuizQuestion, QuizResult, User, UserProgress,
};
pub use wildlife::WildlifeClient;

/// Operations the application and the offline layer invoke on the remote
/// data service.
#[async_trait]
pub trait WildlifeApi: Send + Sync {
    /// List all animals
    async fn list_animals(&self) -> Result<Vec<Animal>>;

    /// Get a single animal by id
    async fn get_animal(&self, id: &str) -> Result<Animal>;

    /// List published quizzes with their questions
    async fn list_quizzes(&self) -> Result<Vec<Quiz>>;

    /// Get a single quiz by id
    async fn get_quiz(&self, id: &str) -> Result<Quiz>;

    /// List all badges
    async fn list_badges(&self) -> Result<Vec<Badge>>;

    /// Record a completed quiz attempt. Idempotent by `result.id`.
    async fn submit_quiz_result(&self, result: &QuizResult) -> Result<()>;

    /// Update a user's progress snapshot. Idempotent by `progress.id`.
    async fn update_progress(&self, progress: &UserProgress) -> Result<()>;

    /// Append to the activity log
    async fn log_activity(&self, activity: &Activity) -> Result<()>;
}
