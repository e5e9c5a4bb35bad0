//! Local match reminders.
//!
//! A saved match gets up to two notifications: one a lead time before kickoff
//! and one at kickoff. Job ids are derived from the match id, so cancelling
//! needs no lookup table.

mod durable;
mod engine;
mod ephemeral;
mod scheduler;
mod types;

use serde::Deserialize;
use std::sync::Arc;

pub use durable::DurableEngine;
pub use engine::{ConsoleSink, NotificationPolicy, NotificationSink, SchedulingEngine};
pub use ephemeral::EphemeralEngine;
pub use scheduler::ReminderScheduler;
pub use types::{
  EntityId, JobId, MatchLabels, Permission, ReminderJob, ReminderOutcome, ReminderTemplates,
  ScheduleOutcome, Slot,
};

use crate::db::Database;
use crate::store::KeyValueStore;

/// Which scheduling engine to run.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
  /// Durable when the database is on disk, ephemeral otherwise
  #[default]
  Auto,
  Durable,
  Ephemeral,
}

impl std::str::FromStr for EngineKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "auto" => Ok(Self::Auto),
      "durable" => Ok(Self::Durable),
      "ephemeral" => Ok(Self::Ephemeral),
      other => Err(format!("unknown engine: {}", other)),
    }
  }
}

/// The engine chosen at startup.
#[derive(Clone)]
pub enum ActiveEngine {
  Durable(Arc<DurableEngine>),
  Ephemeral(Arc<EphemeralEngine>),
}

impl ActiveEngine {
  pub fn select(
    kind: EngineKind,
    db: &Database,
    store: Arc<dyn KeyValueStore>,
    policy: NotificationPolicy,
    sink: Arc<dyn NotificationSink>,
  ) -> Self {
    let durable = match kind {
      EngineKind::Durable => true,
      EngineKind::Ephemeral => false,
      EngineKind::Auto => db.is_persistent(),
    };

    if durable {
      Self::Durable(Arc::new(DurableEngine::new(db.clone(), store, policy, sink)))
    } else {
      tracing::warn!("Using in-process reminders; they will not survive a restart");
      Self::Ephemeral(Arc::new(EphemeralEngine::new(policy, sink)))
    }
  }

  pub fn engine(&self) -> Arc<dyn SchedulingEngine> {
    match self {
      Self::Durable(engine) => engine.clone() as Arc<dyn SchedulingEngine>,
      Self::Ephemeral(engine) => engine.clone() as Arc<dyn SchedulingEngine>,
    }
  }

  pub fn durable(&self) -> Option<&Arc<DurableEngine>> {
    match self {
      Self::Durable(engine) => Some(engine),
      Self::Ephemeral(_) => None,
    }
  }
}
