use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use super::KeyValueStore;
use crate::db::Database;

/// SQLite-backed store on the shared client database.
#[derive(Clone)]
pub struct SqliteStore {
  db: Database,
}

impl SqliteStore {
  pub fn new(db: Database) -> Self {
    Self { db }
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, name: &str) -> Result<Option<String>> {
    let conn = self.db.conn()?;

    conn
      .query_row("SELECT value FROM kv WHERE name = ?", params![name], |row| {
        row.get(0)
      })
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", name, e))
  }

  fn set(&self, name: &str, value: &str) -> Result<()> {
    let conn = self.db.conn()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv (name, value, updated_at) VALUES (?, ?, datetime('now'))",
        params![name, value],
      )
      .map_err(|e| eyre!("Failed to write {}: {}", name, e))?;

    Ok(())
  }

  fn delete(&self, name: &str) -> Result<()> {
    let conn = self.db.conn()?;

    conn
      .execute("DELETE FROM kv WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete {}: {}", name, e))?;

    Ok(())
  }
}
