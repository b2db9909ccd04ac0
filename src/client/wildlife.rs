//! Remote data service client implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::models::{
    Activity, Animal, ApiEnvelope, Badge, Quiz, QuizResult, UserProgress,
};
use super::WildlifeApi;
use crate::config::OfflineConfig;
use crate::error::{ApiError, Result};

/// Client-side request ceiling against the hosted backend
const RATE_LIMIT_PER_SECOND: u32 = 6;

/// HTTP client for the Wildlife Guardians data service
pub struct WildlifeClient {
    http: HttpClient,
    base_url: String,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    token: Arc<RwLock<Option<String>>>,
}

impl WildlifeClient {
    /// Create a client from the offline-layer configuration
    pub fn new(config: &OfflineConfig, token: Option<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quota = Quota::per_second(
            std::num::NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap_or(std::num::NonZeroU32::MIN),
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            rate_limiter,
            token: Arc::new(RwLock::new(token)),
        })
    }

    /// Replace the stored session token
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// The configured service base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);

        if let Some(token) = self.token.read().await.as_deref() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::from)?;

        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized.into()),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden.into()),
            StatusCode::NOT_FOUND => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Resource not found".to_string());
                Err(ApiError::NotFound(msg).into())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(ApiError::RateLimit(Duration::from_secs(retry_after)).into())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(msg).into())
            }
            s => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("HTTP {}", s));
                Err(ApiError::ServerError(msg).into())
            }
        }
    }

    async fn get_enveloped<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        let envelope = response
            .json::<ApiEnvelope<T>>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if !envelope.success {
            return Err(ApiError::InvalidResponse("service reported failure".to_string()).into());
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl WildlifeApi for WildlifeClient {
    async fn list_animals(&self) -> Result<Vec<Animal>> {
        self.get_enveloped("/animals").await
    }

    async fn get_animal(&self, id: &str) -> Result<Animal> {
        self.get_enveloped(&format!("/animals/{}", id)).await
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        self.get_enveloped("/quizzes").await
    }

    async fn get_quiz(&self, id: &str) -> Result<Quiz> {
        self.get_enveloped(&format!("/quizzes/{}", id)).await
    }

    async fn list_badges(&self) -> Result<Vec<Badge>> {
        self.get_enveloped("/badges").await
    }

    async fn submit_quiz_result(&self, result: &QuizResult) -> Result<()> {
        self.send(Method::POST, "/quiz-results", Some(result))
            .await?;
        Ok(())
    }

    async fn update_progress(&self, progress: &UserProgress) -> Result<()> {
        self.send(Method::PUT, "/user/progress", Some(progress))
            .await?;
        Ok(())
    }

    async fn log_activity(&self, activity: &Activity) -> Result<()> {
        self.send(Method::POST, "/activities", Some(activity))
            .await?;
        Ok(())
    }
}
