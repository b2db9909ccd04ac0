//! Remote data service resource models
//!
//! Field names mirror the service's JSON (snake_case columns), with
//! optional fields for everything the service omits on some rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard response wrapper used by the remote service.
///
/// `offline` is set only on synthesized fallback payloads, never by the
/// live service; it defaults to false when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub offline: bool,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            offline: false,
        }
    }
}

/// Animal encyclopedia entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animal {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    /// Conservation status (critical, endangered, vulnerable, ...)
    pub status: String,
    pub habitat: String,
    pub population: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
}

/// Quiz with its questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    /// easy, medium or hard
    pub difficulty: String,
    #[serde(default)]
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// A single quiz question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub order_num: u32,
}

/// Achievement badge.
///
/// The service returns badges in two shapes: a plain badge row, and a
/// user-badge join row whose badge fields live under a nested `badges`
/// object. Both deserialize here; [`display_name`](Self::display_name) and
/// [`display_image`](Self::display_image) resolve the right field once, at
/// this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Nested badge row on user-badge join results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<BadgeDetails>,
}

/// Nested badge fields on a user-badge join row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Badge {
    pub fn display_name(&self) -> &str {
        self.badges
            .as_ref()
            .and_then(|b| b.name.as_deref())
            .or(self.name.as_deref())
            .unwrap_or("Unknown badge")
    }

    pub fn display_image(&self) -> Option<&str> {
        self.badges
            .as_ref()
            .and_then(|b| b.image_url.as_deref())
            .or(self.image_url.as_deref())
    }
}

/// Platform user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// student, teacher or admin
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A completed quiz attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub score: u32,
    pub max_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// A user's learning progress snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub quizzes_completed: u32,
    #[serde(default)]
    pub animals_viewed: u32,
    #[serde(default)]
    pub badges_earned: u32,
}

/// Activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub activity_type: String,
    #[serde(default)]
    pub activity_details: Value,
}
