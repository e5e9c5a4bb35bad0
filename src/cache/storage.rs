//! Response cache on top of the durable key-value store.

use color_eyre::Result;
use std::sync::Arc;

use super::fingerprint::Fingerprint;
use crate::store::KeyValueStore;

/// Last-known-good response bodies, one per fingerprint.
///
/// Entries are overwritten by newer successful fetches and never expire.
#[derive(Clone)]
pub struct CacheStore {
  store: Arc<dyn KeyValueStore>,
}

impl CacheStore {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// Cached body for `key`, if any.
  pub fn get(&self, key: &Fingerprint) -> Result<Option<String>> {
    self.store.get(key.as_str())
  }

  /// Record `body` as the latest good response for `key`.
  pub fn put(&self, key: &Fingerprint, body: &str) -> Result<()> {
    self.store.set(key.as_str(), body)
  }
}
