//! Scheduling engine whose jobs live in the client database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::params;
use std::sync::Arc;

use super::engine::{NotificationPolicy, NotificationSink, SchedulingEngine};
use super::types::{JobId, Permission, ReminderJob};
use crate::db::Database;
use crate::store::KeyValueStore;

const PERMISSION_KEY: &str = "notificationPermission";

/// Jobs are rows in `reminder_jobs`; they outlive the process and are
/// delivered by whichever process next calls [`DurableEngine::deliver_due`].
pub struct DurableEngine {
  db: Database,
  store: Arc<dyn KeyValueStore>,
  policy: NotificationPolicy,
  sink: Arc<dyn NotificationSink>,
}

impl DurableEngine {
  pub fn new(
    db: Database,
    store: Arc<dyn KeyValueStore>,
    policy: NotificationPolicy,
    sink: Arc<dyn NotificationSink>,
  ) -> Self {
    Self {
      db,
      store,
      policy,
      sink,
    }
  }

  /// All scheduled jobs, earliest first.
  pub fn pending(&self) -> Result<Vec<ReminderJob>> {
    let conn = self.db.conn()?;

    let mut stmt = conn
      .prepare("SELECT id, title, body, trigger_at FROM reminder_jobs ORDER BY trigger_at, id")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows: Vec<(i64, String, String, Option<i64>)> = stmt
      .query_map([], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3).ok()))
      })
      .map_err(|e| eyre!("Failed to query reminder jobs: {}", e))?
      .collect::<Result<_, _>>()
      .map_err(|e| eyre!("Failed to read reminder job: {}", e))?;

    // An unreadable trigger time only loses that row, never the whole queue.
    let jobs = rows
      .into_iter()
      .filter_map(|(id, title, body, millis)| {
        let Some(trigger_at) = millis.and_then(DateTime::<Utc>::from_timestamp_millis) else {
          tracing::warn!(job = id, "Skipping reminder job with unreadable trigger time");
          return None;
        };
        Some(ReminderJob {
          id: JobId(id as u64),
          title,
          body,
          trigger_at,
        })
      })
      .collect();

    Ok(jobs)
  }

  /// Deliver and remove every job due at `now`. Returns how many fired.
  ///
  /// Jobs are removed before delivery, so each fires at most once.
  pub fn deliver_due(&self, now: DateTime<Utc>) -> Result<usize> {
    let due: Vec<ReminderJob> = self
      .pending()?
      .into_iter()
      .filter(|job| job.trigger_at <= now)
      .collect();

    if due.is_empty() {
      return Ok(0);
    }

    {
      let conn = self.db.conn()?;
      for job in &due {
        conn
          .execute("DELETE FROM reminder_jobs WHERE id = ?", params![job.id.0 as i64])
          .map_err(|e| eyre!("Failed to remove reminder job {}: {}", job.id, e))?;
      }
    }

    for job in &due {
      self.sink.deliver(job);
    }

    Ok(due.len())
  }
}

#[async_trait]
impl SchedulingEngine for DurableEngine {
  async fn schedule(&self, jobs: Vec<ReminderJob>) -> Result<()> {
    let conn = self.db.conn()?;

    for job in &jobs {
      conn
        .execute(
          "INSERT OR REPLACE INTO reminder_jobs (id, title, body, trigger_at) VALUES (?, ?, ?, ?)",
          params![
            job.id.0 as i64,
            job.title,
            job.body,
            job.trigger_at.timestamp_millis()
          ],
        )
        .map_err(|e| eyre!("Failed to store reminder job {}: {}", job.id, e))?;
    }

    Ok(())
  }

  async fn cancel(&self, ids: &[JobId]) -> Result<()> {
    let conn = self.db.conn()?;

    for id in ids {
      conn
        .execute("DELETE FROM reminder_jobs WHERE id = ?", params![id.0 as i64])
        .map_err(|e| eyre!("Failed to cancel reminder job {}: {}", id, e))?;
    }

    Ok(())
  }

  async fn query_permission(&self) -> Result<Permission> {
    Ok(
      self
        .store
        .get(PERMISSION_KEY)?
        .map(|s| Permission::parse(&s))
        .unwrap_or(Permission::NotYetAsked),
    )
  }

  async fn request_permission(&self) -> Result<Permission> {
    let decision = self.policy.resolve();
    self.store.set(PERMISSION_KEY, decision.as_str())?;
    Ok(decision)
  }

  fn name(&self) -> &'static str {
    "durable"
  }
}
