//! Request key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Generate a deterministic cache key for a request.
///
/// The key is a SHA-256 hash of the method and full URL, so the same
/// request always lands on the same cached entry regardless of which
/// namespace it is stored in.
pub fn request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());

    format!("{:x}", hasher.finalize())
}
