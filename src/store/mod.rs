//! Durable key-value store consumed by the cache and the selection set.
//!
//! Values are opaque strings; callers own their serialization. Individual
//! operations are atomic, compound sequences are not.

#[cfg(test)]
mod memory;
mod sqlite;

use color_eyre::Result;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Trait for key-value storage backends.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `name`.
  fn get(&self, name: &str) -> Result<Option<String>>;

  /// Store `value` under `name`, replacing any previous value.
  fn set(&self, name: &str, value: &str) -> Result<()>;

  /// Remove `name`. Removing an absent name is not an error.
  #[allow(dead_code)]
  fn delete(&self, name: &str) -> Result<()>;
}
