//! Fallback engine built on in-process timers.
//!
//! Jobs fire only while this process stays alive. After a restart they are
//! gone and cannot be listed or cancelled; that is an accepted limitation of
//! running without a durable store.

use async_trait::async_trait;
use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::engine::{NotificationPolicy, NotificationSink, SchedulingEngine};
use super::types::{JobId, Permission, ReminderJob};

/// Timer handle plus the generation that spawned it.
type Timers = Arc<Mutex<HashMap<JobId, (u64, JoinHandle<()>)>>>;

pub struct EphemeralEngine {
  timers: Timers,
  generation: Mutex<u64>,
  permission: Mutex<Permission>,
  policy: NotificationPolicy,
  sink: Arc<dyn NotificationSink>,
}

impl EphemeralEngine {
  pub fn new(policy: NotificationPolicy, sink: Arc<dyn NotificationSink>) -> Self {
    Self {
      timers: Arc::new(Mutex::new(HashMap::new())),
      generation: Mutex::new(0),
      permission: Mutex::new(Permission::NotYetAsked),
      policy,
      sink,
    }
  }

  /// Number of timers that have not fired yet.
  #[cfg(test)]
  pub fn armed(&self) -> usize {
    self
      .timers
      .lock()
      .map(|timers| timers.len())
      .unwrap_or_default()
  }

  fn next_generation(&self) -> Result<u64> {
    let mut generation = self
      .generation
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *generation += 1;
    Ok(*generation)
  }
}

#[async_trait]
impl SchedulingEngine for EphemeralEngine {
  async fn schedule(&self, jobs: Vec<ReminderJob>) -> Result<()> {
    for job in jobs {
      let delay = (job.trigger_at - Utc::now()).to_std().unwrap_or_default();
      let deadline = tokio::time::Instant::now() + delay;
      let generation = self.next_generation()?;
      let id = job.id;
      let sink = Arc::clone(&self.sink);
      let timers = Arc::clone(&self.timers);

      // Held across the spawn so the entry exists before the task can clear it.
      let mut armed = self
        .timers
        .lock()
        .map_err(|e| eyre!("Lock poisoned: {}", e))?;
      let handle = tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        sink.deliver(&job);
        if let Ok(mut timers) = timers.lock() {
          // Only clear our own entry; a replacement may already be armed.
          if timers.get(&id).is_some_and(|(g, _)| *g == generation) {
            timers.remove(&id);
          }
        }
      });
      if let Some((_, previous)) = armed.insert(id, (generation, handle)) {
        previous.abort();
      }
    }

    Ok(())
  }

  async fn cancel(&self, ids: &[JobId]) -> Result<()> {
    let mut timers = self
      .timers
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    for id in ids {
      if let Some((_, handle)) = timers.remove(id) {
        handle.abort();
      }
    }

    Ok(())
  }

  async fn query_permission(&self) -> Result<Permission> {
    self
      .permission
      .lock()
      .map(|p| *p)
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  async fn request_permission(&self) -> Result<Permission> {
    let decision = self.policy.resolve();
    *self
      .permission
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))? = decision;
    Ok(decision)
  }

  fn name(&self) -> &'static str {
    "ephemeral"
  }
}
