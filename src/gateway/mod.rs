//! Request gateway
//!
//! Sits between the application and the network: every outbound request is
//! classified and served with one of three strategies (network-first for API
//! calls, cache-first for app-shell assets, network-first with a document
//! fallback for the rest). The gateway owns the versioned cache namespaces
//! and their lifecycle, and holds its own deferred-write outboxes drained on
//! background-sync signals.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;

pub mod cache;
pub mod fallback;
pub mod key;
pub mod push;

pub use cache::{CachedResponse, ResponseCache};
pub use fallback::{FallbackProvider, NoFallbacks, WildlifeFallbacks};
pub use key::request_key;
pub use push::PushPayload;

use crate::config::OfflineConfig;
use crate::error::{ApiError, QueueError, Result};
use crate::outbox::{DeliveryConfig, DeliveryMethod, Outbox, SyncReport};
use crate::store::{OfflineStore, collections};

/// How a request is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestClass {
    /// Remote data service call
    Api,
    /// Known app-shell asset
    StaticAsset,
    /// Anything else
    Other,
}

/// Background-sync signal tags the gateway recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTag {
    QuizResults,
    UserProgress,
}

impl SyncTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTag::QuizResults => "sync-quiz-results",
            SyncTag::UserProgress => "sync-user-progress",
        }
    }
}

impl FromStr for SyncTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sync-quiz-results" => Ok(SyncTag::QuizResults),
            "sync-user-progress" => Ok(SyncTag::UserProgress),
            other => Err(format!("unrecognized sync tag: {}", other)),
        }
    }
}

/// An outbound request routed through the gateway
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl GatewayRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: reqwest::Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Where a gateway response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Live network response
    Network,
    /// Cached snapshot of an earlier response
    Cache,
    /// Synthesized offline payload
    Fallback,
}

/// The gateway's answer to a request. Always resolves; total failure is a
/// synthetic 503, never an error the caller has to handle.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl GatewayResponse {
    fn from_cache(cached: CachedResponse) -> Self {
        Self {
            status: cached.status,
            headers: cached.headers,
            body: cached.body,
            source: ResponseSource::Cache,
        }
    }

    fn fallback_json(payload: &Value) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: payload.to_string().into_bytes(),
            source: ResponseSource::Fallback,
        }
    }

    fn offline_503() -> Self {
        Self {
            status: 503,
            headers: Vec::new(),
            body: b"Offline - Please check your connection".to_vec(),
            source: ResponseSource::Fallback,
        }
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    fn snapshot(&self) -> CachedResponse {
        CachedResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Request-interception gateway
pub struct Gateway {
    config: OfflineConfig,
    http: reqwest::Client,
    cache: ResponseCache,
    fallbacks: Arc<dyn FallbackProvider>,
    quiz_results: Outbox,
    progress: Outbox,
}

impl Gateway {
    /// Build a gateway over the given store and response cache.
    ///
    /// The store backs the deferred-write outboxes; it is shared with (but
    /// uses different collections from) the application-level sync queue.
    pub fn new(config: OfflineConfig, store: OfflineStore, cache: ResponseCache) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quiz_results = Outbox::new(
            store.clone(),
            collections::PENDING_QUIZ_RESULTS,
            http.clone(),
        );
        let progress = Outbox::new(store, collections::PENDING_PROGRESS, http.clone());

        Ok(Self {
            config,
            http,
            cache,
            fallbacks: Arc::new(WildlifeFallbacks),
            quiz_results,
            progress,
        })
    }

    /// Replace the offline-payload policy
    pub fn with_fallbacks(mut self, fallbacks: Arc<dyn FallbackProvider>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Pre-seed the static namespace from the configured asset manifest.
    ///
    /// Assets are fetched concurrently; a failing asset is logged and
    /// skipped, never aborting the install.
    pub async fn install(&self) {
        log::info!(
            "Gateway installing, pre-seeding {} static assets",
            self.config.static_assets.len()
        );

        let namespace = self.config.static_cache_name();
        let fetches = self.config.static_assets.iter().map(|path| {
            let url = self.config.shell_url(path);
            let namespace = namespace.clone();
            async move {
                match self.try_network(&GatewayRequest::get(url.clone())).await {
                    Ok(response) if response.status == 200 => {
                        let key = request_key("GET", &url);
                        self.cache.put(&namespace, &key, &url, &response.snapshot());
                    }
                    Ok(response) => {
                        log::warn!("Skipping static asset {} (HTTP {})", url, response.status);
                    }
                    Err(e) => {
                        log::warn!("Failed to pre-seed static asset {}: {}", url, e);
                    }
                }
            }
        });

        join_all(fetches).await;
    }

    /// Rotate cache namespaces: every namespace whose name is not the
    /// current static or dynamic name is deleted. Returns the number of
    /// entries removed.
    pub fn activate(&self) -> usize {
        let current = vec![
            self.config.static_cache_name(),
            self.config.dynamic_cache_name(),
        ];
        let removed = self.cache.retain(&current);
        log::info!("Gateway activated; {} stale cache entries removed", removed);
        removed
    }

    /// Route a request through the matching strategy.
    ///
    /// Never returns an error: total failure surfaces as a synthetic 503.
    pub async fn fetch(&self, request: &GatewayRequest) -> GatewayResponse {
        match self.classify(&request.url) {
            RequestClass::Api => self.network_first_api(request).await,
            RequestClass::StaticAsset => self.cache_first(request).await,
            RequestClass::Other => self.network_first_document(request).await,
        }
    }

    fn classify(&self, url: &str) -> RequestClass {
        if url.starts_with(&self.config.api_base_url) {
            return RequestClass::Api;
        }

        let path = reqwest::Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string());

        let is_static = self
            .config
            .static_assets
            .iter()
            .any(|asset| path == *asset || path.ends_with(asset.as_str()));

        if is_static {
            RequestClass::StaticAsset
        } else {
            RequestClass::Other
        }
    }

    /// Network-first for API calls: write-through on 200, cached entry on
    /// failure, then the per-resource offline payload, then 503.
    async fn network_first_api(&self, request: &GatewayRequest) -> GatewayResponse {
        let key = request_key(request.method.as_str(), &request.url);
        let dynamic = self.config.dynamic_cache_name();

        match self.try_network(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.cache
                        .put(&dynamic, &key, &request.url, &response.snapshot());
                }
                response
            }
            Err(e) => {
                log::warn!("API request {} failed: {}", request.url, e);

                if let Some(cached) = self.cache.get(&dynamic, &key) {
                    return GatewayResponse::from_cache(cached);
                }

                let path = reqwest::Url::parse(&request.url)
                    .map(|u| u.path().to_string())
                    .unwrap_or_default();
                if let Some(payload) = self.fallbacks.fallback_for(&path) {
                    log::debug!("Serving synthesized offline payload for {}", path);
                    return GatewayResponse::fallback_json(&payload);
                }

                GatewayResponse::offline_503()
            }
        }
    }

    /// Cache-first for app-shell assets, populating lazily on first fetch
    async fn cache_first(&self, request: &GatewayRequest) -> GatewayResponse {
        let key = request_key(request.method.as_str(), &request.url);
        let namespace = self.config.static_cache_name();

        if let Some(cached) = self.cache.get(&namespace, &key) {
            return GatewayResponse::from_cache(cached);
        }

        match self.try_network(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.cache
                        .put(&namespace, &key, &request.url, &response.snapshot());
                }
                response
            }
            Err(e) => {
                log::warn!("Static asset {} unavailable: {}", request.url, e);
                GatewayResponse::offline_503()
            }
        }
    }

    /// Network-first for everything else, falling back to the cached entry
    /// and then the offline document
    async fn network_first_document(&self, request: &GatewayRequest) -> GatewayResponse {
        let key = request_key(request.method.as_str(), &request.url);
        let dynamic = self.config.dynamic_cache_name();

        match self.try_network(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.cache
                        .put(&dynamic, &key, &request.url, &response.snapshot());
                }
                response
            }
            Err(e) => {
                log::warn!("Request {} failed: {}", request.url, e);

                if let Some(cached) = self.cache.get(&dynamic, &key) {
                    return GatewayResponse::from_cache(cached);
                }

                // App shell as the generic offline document
                let document_url = self.config.shell_url(&self.config.offline_document);
                let document_key = request_key("GET", &document_url);
                if let Some(cached) = self
                    .cache
                    .get(&self.config.static_cache_name(), &document_key)
                {
                    return GatewayResponse::from_cache(cached);
                }

                GatewayResponse::offline_503()
            }
        }
    }

    async fn try_network(
        &self,
        request: &GatewayRequest,
    ) -> std::result::Result<GatewayResponse, String> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| e.to_string())?.to_vec();

        Ok(GatewayResponse {
            status,
            headers,
            body,
            source: ResponseSource::Network,
        })
    }

    /// Stage a quiz result for replay on the next quiz-result sync signal
    pub fn stage_quiz_result(
        &self,
        record: Value,
        token: Option<&str>,
    ) -> std::result::Result<(), QueueError> {
        let mut config = DeliveryConfig::new(
            format!("{}/quiz-results", self.config.api_base_url),
            DeliveryMethod::Post,
        );
        if let Some(token) = token {
            config = config.with_bearer_token(token);
        }
        self.quiz_results.enqueue(record, config)
    }

    /// Stage a progress update for replay on the next progress sync signal
    pub fn stage_progress(
        &self,
        record: Value,
        token: Option<&str>,
    ) -> std::result::Result<(), QueueError> {
        let mut config = DeliveryConfig::new(
            format!("{}/user/progress", self.config.api_base_url),
            DeliveryMethod::Put,
        );
        if let Some(token) = token {
            config = config.with_bearer_token(token);
        }
        self.progress.enqueue(record, config)
    }

    /// Drain the deferred-write outbox matching a background-sync tag
    pub async fn handle_sync(&self, tag: SyncTag) -> SyncReport {
        log::info!("Background sync triggered: {}", tag.as_str());
        match tag {
            SyncTag::QuizResults => self.quiz_results.drain().await,
            SyncTag::UserProgress => self.progress.drain().await,
        }
    }

    /// Deferred writes waiting behind a sync tag
    pub fn pending_deferred(&self, tag: SyncTag) -> usize {
        match tag {
            SyncTag::QuizResults => self.quiz_results.pending_count(),
            SyncTag::UserProgress => self.progress.pending_count(),
        }
    }

    /// Handle a pushed notification payload, returning what the embedder
    /// should render
    pub fn handle_push(&self, raw: &[u8]) -> Option<PushPayload> {
        PushPayload::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> Gateway {
        let config = OfflineConfig {
            api_base_url: "https://api.wildlife.test/api".to_string(),
            shell_base_url: "https://wildlife.test".to_string(),
            ..Default::default()
        };
        Gateway::new(config, OfflineStore::in_memory(), ResponseCache::in_memory()).unwrap()
    }

    #[test]
    fn test_api_prefix_wins_classification() {
        let gw = gateway();
        // Even though the path ends with a static-manifest suffix, the API
        // base prefix takes priority
        assert_eq!(
            gw.classify("https://api.wildlife.test/api/index.html"),
            RequestClass::Api
        );
        assert_eq!(
            gw.classify("https://api.wildlife.test/api/animals"),
            RequestClass::Api
        );
    }

    #[test]
    fn test_static_manifest_matches_exact_and_suffix() {
        let gw = gateway();
        assert_eq!(
            gw.classify("https://wildlife.test/index.html"),
            RequestClass::StaticAsset
        );
        assert_eq!(
            gw.classify("https://wildlife.test/app/index.html"),
            RequestClass::StaticAsset
        );
        assert_eq!(
            gw.classify("https://wildlife.test/some/page"),
            RequestClass::Other
        );
    }

    #[test]
    fn test_sync_tag_parsing() {
        assert_eq!(
            "sync-quiz-results".parse::<SyncTag>().unwrap(),
            SyncTag::QuizResults
        );
        assert_eq!(
            "sync-user-progress".parse::<SyncTag>().unwrap(),
            SyncTag::UserProgress
        );
        assert!("sync-other".parse::<SyncTag>().is_err());
    }

    #[tokio::test]
    async fn test_staged_deferred_writes_are_counted_per_tag() {
        let gw = gateway();
        gw.stage_quiz_result(serde_json::json!({"id": "r1"}), Some("tok"))
            .unwrap();
        gw.stage_quiz_result(serde_json::json!({"id": "r2"}), Some("tok"))
            .unwrap();
        gw.stage_progress(serde_json::json!({"id": "p1"}), None)
            .unwrap();

        assert_eq!(gw.pending_deferred(SyncTag::QuizResults), 2);
        assert_eq!(gw.pending_deferred(SyncTag::UserProgress), 1);
    }

    #[tokio::test]
    async fn test_offline_api_request_with_fallback_payload() {
        // Port 9 (discard) refuses connections immediately
        let config = OfflineConfig {
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let gw = Gateway::new(config, OfflineStore::in_memory(), ResponseCache::in_memory())
            .unwrap();

        let response = gw
            .fetch(&GatewayRequest::get("http://127.0.0.1:9/api/animals"))
            .await;

        assert_eq!(response.source, ResponseSource::Fallback);
        assert_eq!(response.status, 200);
        let body = response.json().unwrap();
        assert_eq!(body["offline"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_offline_api_request_without_fallback_is_503() {
        let config = OfflineConfig {
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let gw = Gateway::new(config, OfflineStore::in_memory(), ResponseCache::in_memory())
            .unwrap();

        let response = gw
            .fetch(&GatewayRequest::get("http://127.0.0.1:9/api/users"))
            .await;

        assert_eq!(response.status, 503);
        assert_eq!(response.source, ResponseSource::Fallback);
    }
}
