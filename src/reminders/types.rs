//! Core types for match reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a remote entity (a match).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One of the two fixed reminder offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
  /// Trigger time minus the lead time
  Before = 1,
  /// The trigger time itself
  AtStart = 2,
}

impl Slot {
  pub const ALL: [Slot; 2] = [Slot::Before, Slot::AtStart];
}

/// Scheduling-engine job id, derived from `(entity, slot)` as `entity * 1000 + slot`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
  /// `None` when the entity id is too large to encode.
  pub fn new(entity: EntityId, slot: Slot) -> Option<Self> {
    entity
      .0
      .checked_mul(1000)
      .and_then(|base| base.checked_add(slot as u64))
      .map(Self)
  }

  /// Both job ids of an entity.
  pub fn for_entity(entity: EntityId) -> Vec<Self> {
    Slot::ALL
      .iter()
      .filter_map(|slot| Self::new(entity, *slot))
      .collect()
  }
}

impl std::fmt::Display for JobId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A time-anchored notification handed to a scheduling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderJob {
  pub id: JobId,
  pub title: String,
  pub body: String,
  pub trigger_at: DateTime<Utc>,
}

/// How many of the two slots were submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
  ScheduledBoth,
  ScheduledOne,
  ScheduledNone,
}

impl ScheduleOutcome {
  pub fn from_count(count: usize) -> Self {
    match count {
      0 => Self::ScheduledNone,
      1 => Self::ScheduledOne,
      _ => Self::ScheduledBoth,
    }
  }
}

/// Notification permission as reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
  Granted,
  Denied,
  NotYetAsked,
}

impl Permission {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Granted => "granted",
      Self::Denied => "denied",
      Self::NotYetAsked => "prompt",
    }
  }

  /// Parse a stored permission; unknown values count as never asked.
  pub fn parse(s: &str) -> Self {
    match s {
      "granted" => Self::Granted,
      "denied" => Self::Denied,
      _ => Self::NotYetAsked,
    }
  }
}

/// What the reminder step of a save produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
  Scheduled(ScheduleOutcome),
  /// Permission is denied (or the request was refused); nothing was scheduled
  PermissionDenied,
  /// The engine failed; the selection itself still stands
  Failed(String),
}

/// Team names substituted into the message templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchLabels {
  pub home: String,
  pub away: String,
}

impl MatchLabels {
  pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
    Self {
      home: home.into(),
      away: away.into(),
    }
  }
}

/// Title and body templates per slot. `{home}` and `{away}` are replaced.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReminderTemplates {
  pub before_title: String,
  pub before_body: String,
  pub start_title: String,
  pub start_body: String,
}

impl Default for ReminderTemplates {
  fn default() -> Self {
    Self {
      before_title: "Match about to start!".to_string(),
      before_body: "{home} vs {away} kicks off soon.".to_string(),
      start_title: "The match has started!".to_string(),
      start_body: "{home} vs {away} has just kicked off.".to_string(),
    }
  }
}

impl ReminderTemplates {
  /// Rendered `(title, body)` for a slot.
  pub fn render(&self, slot: Slot, labels: &MatchLabels) -> (String, String) {
    let (title, body) = match slot {
      Slot::Before => (&self.before_title, &self.before_body),
      Slot::AtStart => (&self.start_title, &self.start_body),
    };
    (fill(title, labels), fill(body, labels))
  }
}

fn fill(template: &str, labels: &MatchLabels) -> String {
  template
    .replace("{home}", &labels.home)
    .replace("{away}", &labels.away)
}
