//! Synthesized offline payloads for API endpoints
//!
//! When the network is down and nothing is cached, critical endpoints still
//! get a minimal renderable payload so the UI has something to show. The
//! content is a policy hook: embedders plug in their own provider.

use serde_json::{Value, json};

/// Per-resource offline payload policy
pub trait FallbackProvider: Send + Sync {
    /// Synthesize a minimal payload for an API path, if this provider
    /// recognizes the resource. The payload must carry `offline: true` so
    /// the UI can flag it.
    fn fallback_for(&self, path: &str) -> Option<Value>;
}

/// Default provider covering the endpoints the app cannot render without
#[derive(Debug, Clone, Copy, Default)]
pub struct WildlifeFallbacks;

impl FallbackProvider for WildlifeFallbacks {
    fn fallback_for(&self, path: &str) -> Option<Value> {
        if path.contains("/animals") {
            return Some(json!({
                "success": true,
                "data": [
                    {
                        "id": "offline-elephant",
                        "name": "African Elephant",
                        "status": "endangered",
                        "description": "Large mammals found in Africa",
                        "habitat": "Savanna",
                        "population": "415000",
                        "threats": ["Poaching", "habitat loss"]
                    }
                ],
                "offline": true
            }));
        }
        None
    }
}

/// Provider that never synthesizes anything; every uncached API request
/// falls through to the generic 503
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallbacks;

impl FallbackProvider for NoFallbacks {
    fn fallback_for(&self, _path: &str) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animals_fallback_is_flagged_offline() {
        let payload = WildlifeFallbacks.fallback_for("/animals").unwrap();
        assert_eq!(payload["offline"], json!(true));
        assert_eq!(payload["success"], json!(true));
        assert!(!payload["data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_nested_animal_paths_match() {
        assert!(WildlifeFallbacks.fallback_for("/animals/a1").is_some());
    }

    #[test]
    fn test_unknown_paths_have_no_fallback() {
        assert!(WildlifeFallbacks.fallback_for("/users").is_none());
        assert!(NoFallbacks.fallback_for("/animals").is_none());
    }
}
