//! Queued mutation types
//!
//! A mutation binds a payload to the delivery configuration needed to replay
//! it later. Everything here is serializable so a queue survives restart.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::QueueError;

/// HTTP method allowed for queued delivery.
///
/// Restricting the type (rather than validating strings at send time) makes
/// a disallowed method unrepresentable in a stored queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryMethod {
    Post,
    Put,
    Patch,
}

impl DeliveryMethod {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            DeliveryMethod::Post => reqwest::Method::POST,
            DeliveryMethod::Put => reqwest::Method::PUT,
            DeliveryMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl FromStr for DeliveryMethod {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(DeliveryMethod::Post),
            "PUT" => Ok(DeliveryMethod::Put),
            "PATCH" => Ok(DeliveryMethod::Patch),
            other => Err(QueueError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Named payload transform applied just before delivery.
///
/// Transforms are an enum instead of a closure so the queue can be persisted
/// and reloaded; each variant names a reshaping the server expects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadTransform {
    /// Send the record as stored
    #[default]
    Identity,
    /// Wrap the record under a single top-level key, e.g. `{"result": {...}}`
    Wrap(String),
    /// Send only the named top-level field of the record
    Extract(String),
}

impl PayloadTransform {
    pub fn apply(&self, data: &Value) -> Value {
        match self {
            PayloadTransform::Identity => data.clone(),
            PayloadTransform::Wrap(key) => {
                let mut map = serde_json::Map::new();
                map.insert(key.clone(), data.clone());
                Value::Object(map)
            }
            PayloadTransform::Extract(key) => data.get(key).cloned().unwrap_or(Value::Null),
        }
    }
}

/// Where and how a queued mutation is delivered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Target endpoint URL
    pub endpoint: String,
    /// HTTP method
    pub method: DeliveryMethod,
    /// Extra headers beyond `Content-Type: application/json`
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Payload reshaping applied at delivery time
    #[serde(default)]
    pub transform: PayloadTransform,
}

impl DeliveryConfig {
    pub fn new(endpoint: impl Into<String>, method: DeliveryMethod) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            headers: Vec::new(),
            transform: PayloadTransform::Identity,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_bearer_token(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token))
    }

    pub fn with_transform(mut self, transform: PayloadTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// A single entry in an outbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMutation {
    /// Unique id, taken from the payload's `id` field
    pub id: String,
    /// The payload to deliver
    pub data: Value,
    /// Delivery configuration
    pub config: DeliveryConfig,
}

impl QueuedMutation {
    /// Build a mutation, eagerly validating that the payload carries an id.
    ///
    /// String and integer ids are accepted; anything else is a
    /// [`QueueError::MissingId`] at enqueue time.
    pub fn new(data: Value, config: DeliveryConfig) -> Result<Self, QueueError> {
        let id = match data.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(QueueError::MissingId),
        };

        Ok(Self { id, data, config })
    }
}
