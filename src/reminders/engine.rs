use async_trait::async_trait;
use color_eyre::Result;
use serde::Deserialize;

use super::types::{JobId, Permission, ReminderJob};

/// Back-end that turns reminder jobs into notifications.
#[async_trait]
pub trait SchedulingEngine: Send + Sync {
  /// Submit jobs. A job whose id is already scheduled replaces it.
  async fn schedule(&self, jobs: Vec<ReminderJob>) -> Result<()>;

  /// Cancel jobs by id. Unknown ids are a no-op.
  async fn cancel(&self, ids: &[JobId]) -> Result<()>;

  async fn query_permission(&self) -> Result<Permission>;

  /// Ask for permission. Resolves to `Granted` or `Denied`.
  async fn request_permission(&self) -> Result<Permission>;

  /// Short name for logs
  fn name(&self) -> &'static str;
}

/// How a permission request resolves. A terminal has no prompt to show.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPolicy {
  #[default]
  Allow,
  Deny,
}

impl NotificationPolicy {
  pub fn resolve(&self) -> Permission {
    match self {
      Self::Allow => Permission::Granted,
      Self::Deny => Permission::Denied,
    }
  }
}

/// Where fired reminders are shown.
pub trait NotificationSink: Send + Sync {
  fn deliver(&self, job: &ReminderJob);
}

/// Prints reminders to stdout.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
  fn deliver(&self, job: &ReminderJob) {
    tracing::info!(job = %job.id, title = %job.title, "Reminder delivered");
    println!("[{}] {}: {}", job.trigger_at.format("%H:%M"), job.title, job.body);
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use std::sync::Mutex;

  /// Sink that records what it was given.
  #[derive(Default)]
  pub struct RecordingSink {
    pub delivered: Mutex<Vec<ReminderJob>>,
  }

  impl RecordingSink {
    pub fn ids(&self) -> Vec<JobId> {
      self.delivered.lock().unwrap().iter().map(|j| j.id).collect()
    }
  }

  impl NotificationSink for RecordingSink {
    fn deliver(&self, job: &ReminderJob) {
      self.delivered.lock().unwrap().push(job.clone());
    }
  }
}
