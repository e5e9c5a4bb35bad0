use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};
use url::Url;

use crate::net::RequestOptions;

const CACHE_PREFIX: &str = "api_cache_";

/// Deterministic cache key for an (endpoint, options) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
  pub fn new(endpoint: &str, options: &RequestOptions) -> Result<Self> {
    let endpoint = normalize_endpoint(endpoint);

    // A JSON tuple keeps the two parts unambiguous.
    let input = serde_json::to_string(&(endpoint.as_str(), options))
      .map_err(|e| eyre!("Failed to serialize request options: {}", e))?;

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();

    Ok(Self(format!("{}{}", CACHE_PREFIX, hex::encode(result))))
  }

  /// Store key for this fingerprint
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Normalize an endpoint identifier for consistent hashing.
/// Absolute URLs take their canonical serialized form (lowercased host, default port dropped).
fn normalize_endpoint(endpoint: &str) -> String {
  let trimmed = endpoint.trim();
  match Url::parse(trimmed) {
    Ok(url) => url.to_string(),
    Err(_) => trimmed.to_string(),
  }
}
