pub mod schema;

use color_eyre::{eyre::eyre, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared SQLite connection for the client's durable state.
///
/// Both the key-value store and the durable reminder engine hold a clone
/// of this handle, so they always see the same database file.
#[derive(Clone)]
pub struct Database {
  conn: Arc<Mutex<Connection>>,
  path: Option<PathBuf>,
}

impl Database {
  /// Open or create the database inside `data_dir`.
  pub fn open(data_dir: &Path) -> Result<Self> {
    let path = Self::path_in(data_dir);

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    let db = Self {
      conn: Arc::new(Mutex::new(conn)),
      path: Some(path),
    };
    db.run_migrations()?;

    Ok(db)
  }

  /// Open a private in-memory database. Nothing outlives the handle.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;

    let db = Self {
      conn: Arc::new(Mutex::new(conn)),
      path: None,
    };
    db.run_migrations()?;

    Ok(db)
  }

  /// Database file location for a given data directory
  pub fn path_in(data_dir: &Path) -> PathBuf {
    data_dir.join("quiniela.db")
  }

  /// Whether this database is backed by a file (and so survives restarts).
  pub fn is_persistent(&self) -> bool {
    self.path.is_some()
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(schema::SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  /// Lock the connection
  pub fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}
