//! Push notification payloads
//!
//! The gateway consumes these; rendering the system notification and
//! opening the click target are the embedder's concern.

use serde::{Deserialize, Serialize};

const DEFAULT_TITLE: &str = "Wildlife Guardians";
const DEFAULT_BODY: &str = "New wildlife content available!";

/// A pushed notification payload. Every field is optional; defaults cover
/// whatever the sender left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse a pushed JSON payload. Malformed payloads yield `None`; a push
    /// must never take down the worker.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        match serde_json::from_slice(raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("Ignoring malformed push payload: {}", e);
                None
            }
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or(DEFAULT_BODY)
    }

    /// Where a click on the notification navigates
    pub fn click_target(&self) -> &str {
        self.url.as_deref().unwrap_or("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let payload =
            PushPayload::parse(br#"{"title": "New quiz", "body": "Try it", "url": "/quizzes/q1"}"#)
                .unwrap();
        assert_eq!(payload.title(), "New quiz");
        assert_eq!(payload.body_text(), "Try it");
        assert_eq!(payload.click_target(), "/quizzes/q1");
    }

    #[test]
    fn test_empty_payload_gets_defaults() {
        let payload = PushPayload::parse(b"{}").unwrap();
        assert_eq!(payload.title(), "Wildlife Guardians");
        assert_eq!(payload.body_text(), "New wildlife content available!");
        assert_eq!(payload.click_target(), "/");
    }

    #[test]
    fn test_malformed_payload_is_ignored() {
        assert!(PushPayload::parse(b"not json").is_none());
    }
}
