//! Mock data service client for testing
//!
//! Implements the API trait without the network. Configure responses via
//! builder methods, flip `set_unreachable` to simulate a dead network, and
//! inspect call counts and captured writes afterwards.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::WildlifeApi;
use super::models::{Activity, Animal, Badge, Quiz, QuizResult, UserProgress};
use crate::error::{ApiError, Result};

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub list_animals: usize,
    pub get_animal: usize,
    pub list_quizzes: usize,
    pub get_quiz: usize,
    pub list_badges: usize,
    pub submit_quiz_result: usize,
    pub update_progress: usize,
    pub log_activity: usize,
}

/// Mock API client for testing
#[derive(Default)]
pub struct MockWildlifeClient {
    animals: Arc<Mutex<Vec<Animal>>>,
    quizzes: Arc<Mutex<Vec<Quiz>>>,
    badges: Arc<Mutex<Vec<Badge>>>,
    /// Captured writes for test assertions
    submitted_results: Arc<Mutex<Vec<QuizResult>>>,
    progress_updates: Arc<Mutex<Vec<UserProgress>>>,
    activities: Arc<Mutex<Vec<Activity>>>,
    /// When set, every call fails with a network error
    unreachable: Arc<AtomicBool>,
    call_counts: Arc<Mutex<CallCounts>>,
}

impl MockWildlifeClient {
    pub fn new() -> Self {
        Self::default()
    }

    // Builders run before the mock is shared, so try_lock cannot contend.

    pub fn with_animals(self, animals: Vec<Animal>) -> Self {
        if let Ok(mut guard) = self.animals.try_lock() {
            *guard = animals;
        }
        self
    }

    pub fn with_quizzes(self, quizzes: Vec<Quiz>) -> Self {
        if let Ok(mut guard) = self.quizzes.try_lock() {
            *guard = quizzes;
        }
        self
    }

    pub fn with_badges(self, badges: Vec<Badge>) -> Self {
        if let Ok(mut guard) = self.badges.try_lock() {
            *guard = badges;
        }
        self
    }

    /// Simulate the network dropping (or returning)
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_counts.lock().await.clone()
    }

    pub async fn submitted_results(&self) -> Vec<QuizResult> {
        self.submitted_results.lock().await.clone()
    }

    pub async fn progress_updates(&self) -> Vec<UserProgress> {
        self.progress_updates.lock().await.clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(ApiError::Network("connection refused".to_string()).into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WildlifeApi for MockWildlifeClient {
    async fn list_animals(&self) -> Result<Vec<Animal>> {
        self.call_counts.lock().await.list_animals += 1;
        self.check_reachable()?;
        Ok(self.animals.lock().await.clone())
    }

    async fn get_animal(&self, id: &str) -> Result<Animal> {
        self.call_counts.lock().await.get_animal += 1;
        self.check_reachable()?;
        self.animals
            .lock()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()).into())
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        self.call_counts.lock().await.list_quizzes += 1;
        self.check_reachable()?;
        Ok(self.quizzes.lock().await.clone())
    }

    async fn get_quiz(&self, id: &str) -> Result<Quiz> {
        self.call_counts.lock().await.get_quiz += 1;
        self.check_reachable()?;
        self.quizzes
            .lock()
            .await
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()).into())
    }

    async fn list_badges(&self) -> Result<Vec<Badge>> {
        self.call_counts.lock().await.list_badges += 1;
        self.check_reachable()?;
        Ok(self.badges.lock().await.clone())
    }

    async fn submit_quiz_result(&self, result: &QuizResult) -> Result<()> {
        self.call_counts.lock().await.submit_quiz_result += 1;
        self.check_reachable()?;
        self.submitted_results.lock().await.push(result.clone());
        Ok(())
    }

    async fn update_progress(&self, progress: &UserProgress) -> Result<()> {
        self.call_counts.lock().await.update_progress += 1;
        self.check_reachable()?;
        self.progress_updates.lock().await.push(progress.clone());
        Ok(())
    }

    async fn log_activity(&self, activity: &Activity) -> Result<()> {
        self.call_counts.lock().await.log_activity += 1;
        self.check_reachable()?;
        self.activities.lock().await.push(activity.clone());
        Ok(())
    }
}
