//! Converts a match time into reminder jobs on the active engine.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;

use super::engine::SchedulingEngine;
use super::types::{
  EntityId, JobId, MatchLabels, Permission, ReminderJob, ReminderOutcome, ReminderTemplates,
  ScheduleOutcome, Slot,
};

#[derive(Clone)]
pub struct ReminderScheduler {
  engine: Arc<dyn SchedulingEngine>,
  templates: ReminderTemplates,
}

impl ReminderScheduler {
  pub fn new(engine: Arc<dyn SchedulingEngine>, templates: ReminderTemplates) -> Self {
    Self { engine, templates }
  }

  /// Jobs for the slots still in the future at `now`.
  ///
  /// Slot 1 fires at `trigger_at - lead`, slot 2 at `trigger_at`. Past slots are skipped.
  pub fn plan(
    &self,
    now: DateTime<Utc>,
    entity: EntityId,
    trigger_at: DateTime<Utc>,
    lead: Duration,
    labels: &MatchLabels,
  ) -> Vec<ReminderJob> {
    Slot::ALL
      .iter()
      .filter_map(|&slot| {
        let at = match slot {
          Slot::Before => trigger_at - lead,
          Slot::AtStart => trigger_at,
        };
        if at <= now {
          return None;
        }
        let id = JobId::new(entity, slot)?;
        let (title, body) = self.templates.render(slot, labels);
        Some(ReminderJob {
          id,
          title,
          body,
          trigger_at: at,
        })
      })
      .collect()
  }

  /// Schedule reminders for an entity relative to the current time.
  pub async fn schedule_for_entity(
    &self,
    entity: EntityId,
    trigger_at: DateTime<Utc>,
    lead: Duration,
    labels: &MatchLabels,
  ) -> Result<ScheduleOutcome> {
    self
      .schedule_at(Utc::now(), entity, trigger_at, lead, labels)
      .await
  }

  pub async fn schedule_at(
    &self,
    now: DateTime<Utc>,
    entity: EntityId,
    trigger_at: DateTime<Utc>,
    lead: Duration,
    labels: &MatchLabels,
  ) -> Result<ScheduleOutcome> {
    // Slot 2 carries the larger id; if it fits, both do.
    if JobId::new(entity, Slot::AtStart).is_none() {
      return Err(eyre!("Match id {} is too large for reminder ids", entity));
    }

    let jobs = self.plan(now, entity, trigger_at, lead, labels);
    let outcome = ScheduleOutcome::from_count(jobs.len());

    if jobs.is_empty() {
      tracing::debug!(%entity, "All reminder slots already passed");
      return Ok(outcome);
    }

    self.engine.schedule(jobs).await?;
    tracing::debug!(%entity, ?outcome, engine = self.engine.name(), "Scheduled reminders");
    Ok(outcome)
  }

  /// Cancel both slots of an entity. Never fails; engine errors are logged.
  pub async fn cancel_for_entity(&self, entity: EntityId) {
    let ids = JobId::for_entity(entity);
    if let Err(e) = self.engine.cancel(&ids).await {
      tracing::warn!(%entity, error = %e, "Failed to cancel reminders");
    }
  }

  /// Permission-aware scheduling used when a match is saved.
  ///
  /// Denied skips scheduling. Never asked triggers a request first.
  pub async fn remind(
    &self,
    entity: EntityId,
    trigger_at: DateTime<Utc>,
    lead: Duration,
    labels: &MatchLabels,
  ) -> ReminderOutcome {
    match self.try_remind(entity, trigger_at, lead, labels).await {
      Ok(outcome) => outcome,
      Err(e) => {
        tracing::warn!(%entity, error = %e, "Failed to schedule reminders");
        ReminderOutcome::Failed(e.to_string())
      }
    }
  }

  async fn try_remind(
    &self,
    entity: EntityId,
    trigger_at: DateTime<Utc>,
    lead: Duration,
    labels: &MatchLabels,
  ) -> Result<ReminderOutcome> {
    let permission = match self.engine.query_permission().await? {
      Permission::NotYetAsked => self.engine.request_permission().await?,
      other => other,
    };

    if permission != Permission::Granted {
      tracing::warn!(%entity, ?permission, "Notifications not permitted, skipping reminders");
      return Ok(ReminderOutcome::PermissionDenied);
    }

    let outcome = self
      .schedule_for_entity(entity, trigger_at, lead, labels)
      .await?;
    Ok(ReminderOutcome::Scheduled(outcome))
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::Mutex;

  /// Engine that records calls and can be told to fail.
  pub struct FakeEngine {
    pub scheduled: Mutex<Vec<ReminderJob>>,
    pub cancelled: Mutex<Vec<JobId>>,
    pub permission: Mutex<Permission>,
    pub grant_on_request: bool,
    pub fail: bool,
  }

  impl FakeEngine {
    pub fn granted() -> Arc<Self> {
      Arc::new(Self::with(Permission::Granted, true, false))
    }

    pub fn with(permission: Permission, grant_on_request: bool, fail: bool) -> Self {
      Self {
        scheduled: Mutex::new(Vec::new()),
        cancelled: Mutex::new(Vec::new()),
        permission: Mutex::new(permission),
        grant_on_request,
        fail,
      }
    }
  }

  #[async_trait]
  impl SchedulingEngine for FakeEngine {
    async fn schedule(&self, jobs: Vec<ReminderJob>) -> Result<()> {
      if self.fail {
        return Err(eyre!("engine unavailable"));
      }
      self.scheduled.lock().unwrap().extend(jobs);
      Ok(())
    }

    async fn cancel(&self, ids: &[JobId]) -> Result<()> {
      if self.fail {
        return Err(eyre!("engine unavailable"));
      }
      self.cancelled.lock().unwrap().extend_from_slice(ids);
      Ok(())
    }

    async fn query_permission(&self) -> Result<Permission> {
      Ok(*self.permission.lock().unwrap())
    }

    async fn request_permission(&self) -> Result<Permission> {
      let decision = if self.grant_on_request {
        Permission::Granted
      } else {
        Permission::Denied
      };
      *self.permission.lock().unwrap() = decision;
      Ok(decision)
    }

    fn name(&self) -> &'static str {
      "fake"
    }
  }

  fn scheduler(engine: Arc<FakeEngine>) -> ReminderScheduler {
    ReminderScheduler::new(engine, ReminderTemplates::default())
  }

  fn labels() -> MatchLabels {
    MatchLabels::new("Argentina", "Brasil")
  }

  #[tokio::test]
  async fn test_both_slots_in_future() {
    let engine = FakeEngine::granted();
    let now = Utc::now();

    let outcome = scheduler(engine.clone())
      .schedule_at(now, EntityId(42), now + Duration::minutes(90), Duration::minutes(60), &labels())
      .await
      .unwrap();

    assert_eq!(outcome, ScheduleOutcome::ScheduledBoth);
    let jobs = engine.scheduled.lock().unwrap().clone();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, JobId(42001));
    assert_eq!(jobs[0].trigger_at, now + Duration::minutes(30));
    assert_eq!(jobs[1].id, JobId(42002));
    assert_eq!(jobs[1].trigger_at, now + Duration::minutes(90));
    assert_eq!(jobs[1].body, "Argentina vs Brasil has just kicked off.");
  }

  #[tokio::test]
  async fn test_only_start_slot_in_future() {
    let engine = FakeEngine::granted();
    let now = Utc::now();

    let outcome = scheduler(engine.clone())
      .schedule_at(now, EntityId(42), now + Duration::minutes(10), Duration::minutes(60), &labels())
      .await
      .unwrap();

    assert_eq!(outcome, ScheduleOutcome::ScheduledOne);
    let jobs = engine.scheduled.lock().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, JobId(42002));
    assert_eq!(jobs[0].trigger_at, now + Duration::minutes(10));
  }

  #[tokio::test]
  async fn test_already_started() {
    let engine = FakeEngine::granted();
    let now = Utc::now();

    let outcome = scheduler(engine.clone())
      .schedule_at(now, EntityId(42), now - Duration::minutes(5), Duration::minutes(60), &labels())
      .await
      .unwrap();

    assert_eq!(outcome, ScheduleOutcome::ScheduledNone);
    assert!(engine.scheduled.lock().unwrap().is_empty());
  }

  #[test]
  fn test_slot_exactly_now_is_skipped() {
    let now = Utc::now();
    let jobs = scheduler(FakeEngine::granted()).plan(
      now,
      EntityId(1),
      now + Duration::minutes(60),
      Duration::minutes(60),
      &labels(),
    );
    assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![JobId(1002)]);
  }

  #[tokio::test]
  async fn test_cancel_targets_both_ids() {
    let engine = FakeEngine::granted();
    scheduler(engine.clone()).cancel_for_entity(EntityId(42)).await;
    assert_eq!(
      engine.cancelled.lock().unwrap().clone(),
      vec![JobId(42001), JobId(42002)]
    );
  }

  #[tokio::test]
  async fn test_cancel_swallows_engine_errors() {
    let engine = Arc::new(FakeEngine::with(Permission::Granted, true, true));
    scheduler(engine).cancel_for_entity(EntityId(42)).await;
  }

  #[tokio::test]
  async fn test_remind_denied_skips_scheduling() {
    let engine = Arc::new(FakeEngine::with(Permission::Denied, true, false));
    let outcome = scheduler(engine.clone())
      .remind(EntityId(3), Utc::now() + Duration::hours(3), Duration::minutes(60), &labels())
      .await;

    assert_eq!(outcome, ReminderOutcome::PermissionDenied);
    assert!(engine.scheduled.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_remind_requests_when_not_asked() {
    let engine = Arc::new(FakeEngine::with(Permission::NotYetAsked, true, false));
    let outcome = scheduler(engine.clone())
      .remind(EntityId(3), Utc::now() + Duration::hours(3), Duration::minutes(60), &labels())
      .await;

    assert_eq!(outcome, ReminderOutcome::Scheduled(ScheduleOutcome::ScheduledBoth));
    assert_eq!(*engine.permission.lock().unwrap(), Permission::Granted);
  }

  #[tokio::test]
  async fn test_remind_refused_request() {
    let engine = Arc::new(FakeEngine::with(Permission::NotYetAsked, false, false));
    let outcome = scheduler(engine)
      .remind(EntityId(3), Utc::now() + Duration::hours(3), Duration::minutes(60), &labels())
      .await;

    assert_eq!(outcome, ReminderOutcome::PermissionDenied);
  }

  #[tokio::test]
  async fn test_remind_reports_engine_failure() {
    let engine = Arc::new(FakeEngine::with(Permission::Granted, true, true));
    let outcome = scheduler(engine)
      .remind(EntityId(3), Utc::now() + Duration::hours(3), Duration::minutes(60), &labels())
      .await;

    assert!(matches!(outcome, ReminderOutcome::Failed(_)));
  }

  #[tokio::test]
  async fn test_oversized_match_id_is_a_failure() {
    let engine = FakeEngine::granted();
    let at = Utc::now() + Duration::hours(3);
    let outcome = scheduler(engine.clone())
      .remind(EntityId(u64::MAX / 10), at, Duration::minutes(60), &labels())
      .await;

    assert!(matches!(outcome, ReminderOutcome::Failed(_)));
    assert!(engine.scheduled.lock().unwrap().is_empty());
  }
}
