//! Saved matches, persisted under a single well-known name.

use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::reminders::EntityId;
use crate::store::KeyValueStore;

pub const SAVED_MATCHES_KEY: &str = "savedMatches";

/// Persisted set of saved match ids.
///
/// Stored as a JSON array in insertion order. This is the source of truth
/// that reminder jobs are kept consistent with.
#[derive(Clone)]
pub struct SelectionSet {
  store: Arc<dyn KeyValueStore>,
}

impl SelectionSet {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// Add `id`. Returns false if it was already present.
  pub fn add(&self, id: EntityId) -> Result<bool> {
    let mut ids = self.load()?;
    if ids.contains(&id) {
      return Ok(false);
    }
    ids.push(id);
    self.save(&ids)?;
    Ok(true)
  }

  /// Remove `id`. Returns false if it was not present.
  pub fn remove(&self, id: EntityId) -> Result<bool> {
    let mut ids = self.load()?;
    let before = ids.len();
    ids.retain(|existing| *existing != id);
    if ids.len() == before {
      return Ok(false);
    }
    self.save(&ids)?;
    Ok(true)
  }

  pub fn contains(&self, id: EntityId) -> Result<bool> {
    Ok(self.load()?.contains(&id))
  }

  pub fn all(&self) -> Result<BTreeSet<EntityId>> {
    Ok(self.load()?.into_iter().collect())
  }

  fn load(&self) -> Result<Vec<EntityId>> {
    let Some(raw) = self.store.get(SAVED_MATCHES_KEY)? else {
      return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
      Ok(ids) => Ok(ids),
      Err(e) => {
        tracing::warn!(error = %e, "Saved matches are unreadable, starting empty");
        Ok(Vec::new())
      }
    }
  }

  fn save(&self, ids: &[EntityId]) -> Result<()> {
    let raw =
      serde_json::to_string(ids).map_err(|e| eyre!("Failed to serialize saved matches: {}", e))?;
    self.store.set(SAVED_MATCHES_KEY, &raw)
  }
}
