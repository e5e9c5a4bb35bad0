use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyValueStore;

/// In-process store. Contents are lost with the process.
#[derive(Default)]
pub struct MemoryStore {
  rows: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, name: &str) -> Result<Option<String>> {
    let rows = self.rows.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(rows.get(name).cloned())
  }

  fn set(&self, name: &str, value: &str) -> Result<()> {
    let mut rows = self.rows.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    rows.insert(name.to_string(), value.to_string());
    Ok(())
  }

  fn delete(&self, name: &str) -> Result<()> {
    let mut rows = self.rows.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    rows.remove(name);
    Ok(())
  }
}
