//! Services consumed by the front end: cached requests and match saving.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::api::Endpoint;
use crate::cache::{CacheStore, FetchOutcome, ResilientFetcher};
use crate::config::{Config, NetworkMode};
use crate::db::Database;
use crate::net::{
  FixedNetworkState, HttpTransport, NetworkState, NetworkStateProvider, RequestOptions,
  ResolverProbe, Transport,
};
use crate::reminders::{
  ActiveEngine, EntityId, MatchLabels, NotificationSink, ReminderOutcome, ReminderScheduler,
  ScheduleOutcome,
};
use crate::selection::SelectionSet;
use crate::store::{KeyValueStore, SqliteStore};

/// Result of toggling a match's saved state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
  Saved(ReminderOutcome),
  Removed,
}

impl ToggleOutcome {
  /// Text shown to the user.
  pub fn message(&self) -> &'static str {
    match self {
      Self::Saved(ReminderOutcome::Scheduled(ScheduleOutcome::ScheduledBoth)) => {
        "Match saved. You will be reminded before kickoff and when it starts."
      }
      Self::Saved(ReminderOutcome::Scheduled(ScheduleOutcome::ScheduledOne)) => {
        "Match saved. It starts soon, you will be reminded at kickoff."
      }
      Self::Saved(ReminderOutcome::Scheduled(ScheduleOutcome::ScheduledNone)) => {
        "Match saved. It has already started, so no reminder was set."
      }
      Self::Saved(ReminderOutcome::PermissionDenied) => {
        "Match saved. Notifications are disabled, enable them to get reminders."
      }
      Self::Saved(ReminderOutcome::Failed(_)) => {
        "Match saved, but the reminder could not be scheduled."
      }
      Self::Removed => "Match removed from saved.",
    }
  }
}

/// Client services wired from configuration.
pub struct App {
  fetcher: ResilientFetcher,
  selection: SelectionSet,
  scheduler: ReminderScheduler,
  engine: ActiveEngine,
  lead_time: Duration,
  /// One queue per entity so toggles on the same match never interleave
  entity_locks: Mutex<HashMap<EntityId, Arc<tokio::sync::Mutex<()>>>>,
}

impl App {
  /// Build the services from configuration with the real network stack.
  pub fn new(config: &Config, sink: Arc<dyn NotificationSink>) -> Result<Self> {
    let data_dir = config.data_dir()?;
    let db = match Database::open(&data_dir) {
      Ok(db) => db,
      Err(e) => {
        tracing::warn!(error = %e, "Database unavailable, state will not persist");
        Database::open_in_memory()?
      }
    };

    let base_url = config.base_url()?;
    let network: Arc<dyn NetworkStateProvider> = match config.network.mode {
      NetworkMode::Auto => Arc::new(ResolverProbe::new(&base_url)),
      NetworkMode::Online => Arc::new(FixedNetworkState(NetworkState::Online)),
      NetworkMode::Offline => Arc::new(FixedNetworkState(NetworkState::Offline)),
    };

    Self::from_parts(config, db, network, Arc::new(HttpTransport::new()), sink)
  }

  /// Build the services with injected collaborators.
  pub fn from_parts(
    config: &Config,
    db: Database,
    network: Arc<dyn NetworkStateProvider>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn NotificationSink>,
  ) -> Result<Self> {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db.clone()));

    let fetcher = ResilientFetcher::new(
      config.base_url()?,
      network,
      transport,
      CacheStore::new(store.clone()),
    );

    let engine = ActiveEngine::select(
      config.reminders.engine,
      &db,
      store.clone(),
      config.reminders.notifications,
      sink,
    );
    let scheduler = ReminderScheduler::new(engine.engine(), config.reminders.templates.clone());

    Ok(Self {
      fetcher,
      selection: SelectionSet::new(store),
      scheduler,
      engine,
      lead_time: config.lead_time(),
      entity_locks: Mutex::new(HashMap::new()),
    })
  }

  /// Fetch with offline fallback.
  pub async fn cached_request(
    &self,
    endpoint: &Endpoint,
    options: &RequestOptions,
  ) -> Result<FetchOutcome> {
    self.fetcher.request(endpoint, options).await
  }

  /// Save or unsave a match and bring its reminders in line.
  ///
  /// Saving always succeeds locally; only the reminder part of the outcome varies.
  pub async fn toggle_selection(
    &self,
    entity: EntityId,
    trigger_at: DateTime<Utc>,
    lead: Option<Duration>,
    labels: &MatchLabels,
  ) -> Result<ToggleOutcome> {
    let lock = self.entity_lock(entity)?;
    let outcome = {
      let _guard = lock.lock().await;
      self.toggle_locked(entity, trigger_at, lead, labels).await
    };
    self.release_lock(entity, lock)?;
    outcome
  }

  async fn toggle_locked(
    &self,
    entity: EntityId,
    trigger_at: DateTime<Utc>,
    lead: Option<Duration>,
    labels: &MatchLabels,
  ) -> Result<ToggleOutcome> {
    if self.selection.contains(entity)? {
      self.selection.remove(entity)?;
      self.scheduler.cancel_for_entity(entity).await;
      return Ok(ToggleOutcome::Removed);
    }

    self.selection.add(entity)?;
    let lead = lead.unwrap_or(self.lead_time);
    let reminder = self.scheduler.remind(entity, trigger_at, lead, labels).await;
    Ok(ToggleOutcome::Saved(reminder))
  }

  pub fn is_selected(&self, entity: EntityId) -> Result<bool> {
    self.selection.contains(entity)
  }

  pub fn saved(&self) -> Result<BTreeSet<EntityId>> {
    self.selection.all()
  }

  pub fn engine(&self) -> &ActiveEngine {
    &self.engine
  }

  fn entity_lock(&self, entity: EntityId) -> Result<Arc<tokio::sync::Mutex<()>>> {
    let mut locks = self
      .entity_locks
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(locks.entry(entity).or_default().clone())
  }

  /// Forget the entity's queue once no other toggle holds a handle to it.
  fn release_lock(&self, entity: EntityId, lock: Arc<tokio::sync::Mutex<()>>) -> Result<()> {
    let mut locks = self
      .entity_locks
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    // One reference lives in the map, the other is ours.
    if Arc::strong_count(&lock) == 2 {
      locks.remove(&entity);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::{TransportError, TransportResponse};
  use crate::reminders::{DurableEngine, EngineKind, JobId, NotificationPolicy, ReminderJob};
  use async_trait::async_trait;

  struct DownTransport;

  #[async_trait]
  impl Transport for DownTransport {
    async fn send(
      &self,
      _url: &str,
      _options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
      Err(TransportError::Timeout("no route".into()))
    }
  }

  struct Silent;

  impl NotificationSink for Silent {
    fn deliver(&self, _job: &ReminderJob) {}
  }

  fn config(policy: NotificationPolicy) -> Config {
    let mut config = Config::default();
    config.reminders.engine = EngineKind::Durable;
    config.reminders.notifications = policy;
    config
  }

  fn app(policy: NotificationPolicy) -> App {
    app_with(config(policy))
  }

  fn app_with(config: Config) -> App {
    App::from_parts(
      &config,
      Database::open_in_memory().unwrap(),
      Arc::new(FixedNetworkState(NetworkState::Online)),
      Arc::new(DownTransport),
      Arc::new(Silent),
    )
    .unwrap()
  }

  fn durable(app: &App) -> &Arc<DurableEngine> {
    app.engine().durable().unwrap()
  }

  fn job_ids(app: &App) -> Vec<JobId> {
    durable(app).pending().unwrap().into_iter().map(|j| j.id).collect()
  }

  fn labels() -> MatchLabels {
    MatchLabels::new("España", "Japón")
  }

  #[tokio::test]
  async fn test_save_schedules_both_reminders() {
    let app = app(NotificationPolicy::Allow);
    let at = Utc::now() + Duration::hours(3);

    let outcome = app.toggle_selection(EntityId(42), at, None, &labels()).await.unwrap();

    assert_eq!(
      outcome,
      ToggleOutcome::Saved(ReminderOutcome::Scheduled(ScheduleOutcome::ScheduledBoth))
    );
    assert!(app.is_selected(EntityId(42)).unwrap());
    assert_eq!(job_ids(&app), vec![JobId(42001), JobId(42002)]);
  }

  #[tokio::test]
  async fn test_save_then_unsave_leaves_nothing() {
    let app = app(NotificationPolicy::Allow);
    let at = Utc::now() + Duration::hours(3);
    let before = app.saved().unwrap();

    app.toggle_selection(EntityId(42), at, None, &labels()).await.unwrap();
    let outcome = app.toggle_selection(EntityId(42), at, None, &labels()).await.unwrap();

    assert_eq!(outcome, ToggleOutcome::Removed);
    assert_eq!(app.saved().unwrap(), before);
    assert!(job_ids(&app).is_empty());
  }

  #[tokio::test]
  async fn test_concurrent_toggles_are_serialized() {
    let app = app(NotificationPolicy::Allow);
    let at = Utc::now() + Duration::hours(3);
    let labels = labels();

    let (first, second, third) = tokio::join!(
      app.toggle_selection(EntityId(8), at, None, &labels),
      app.toggle_selection(EntityId(8), at, None, &labels),
      app.toggle_selection(EntityId(8), at, None, &labels),
    );

    assert!(matches!(first.unwrap(), ToggleOutcome::Saved(_)));
    assert_eq!(second.unwrap(), ToggleOutcome::Removed);
    assert!(matches!(third.unwrap(), ToggleOutcome::Saved(_)));
    assert!(app.is_selected(EntityId(8)).unwrap());
    assert_eq!(job_ids(&app), vec![JobId(8001), JobId(8002)]);
    assert!(app.entity_locks.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_save_succeeds_when_notifications_denied() {
    let app = app(NotificationPolicy::Deny);
    let at = Utc::now() + Duration::hours(3);

    let outcome = app.toggle_selection(EntityId(5), at, None, &labels()).await.unwrap();

    assert_eq!(outcome, ToggleOutcome::Saved(ReminderOutcome::PermissionDenied));
    assert!(app.is_selected(EntityId(5)).unwrap());
    assert!(job_ids(&app).is_empty());
  }

  #[tokio::test]
  async fn test_started_match_is_saved_without_reminders() {
    let app = app(NotificationPolicy::Allow);
    let at = Utc::now() - Duration::minutes(5);

    let outcome = app
      .toggle_selection(EntityId(6), at, Some(Duration::minutes(60)), &labels())
      .await
      .unwrap();

    assert_eq!(
      outcome,
      ToggleOutcome::Saved(ReminderOutcome::Scheduled(ScheduleOutcome::ScheduledNone))
    );
    assert!(app.is_selected(EntityId(6)).unwrap());
    assert!(outcome.message().contains("already started"));
  }

  #[tokio::test]
  async fn test_cached_request_without_network_or_cache() {
    let app = app(NotificationPolicy::Allow);
    let outcome = app
      .cached_request(&Endpoint::Matches, &RequestOptions::get())
      .await
      .unwrap();
    assert_eq!(outcome.status(), 503);
  }

  #[tokio::test]
  async fn test_ephemeral_save_then_unsave_disarms_timers() {
    let mut config = config(NotificationPolicy::Allow);
    config.reminders.engine = EngineKind::Ephemeral;
    let app = app_with(config);
    let at = Utc::now() + Duration::hours(3);

    let saved = app.toggle_selection(EntityId(42), at, None, &labels()).await.unwrap();
    let ActiveEngine::Ephemeral(engine) = app.engine() else {
      panic!("expected the in-process engine");
    };
    assert_eq!(
      saved,
      ToggleOutcome::Saved(ReminderOutcome::Scheduled(ScheduleOutcome::ScheduledBoth))
    );
    assert_eq!(engine.armed(), 2);

    let removed = app.toggle_selection(EntityId(42), at, None, &labels()).await.unwrap();
    assert_eq!(removed, ToggleOutcome::Removed);
    assert_eq!(engine.armed(), 0);
    assert!(!app.is_selected(EntityId(42)).unwrap());
  }

  #[tokio::test]
  async fn test_oversized_match_id_is_saved_with_failed_reminder() {
    let app = app(NotificationPolicy::Allow);
    let at = Utc::now() + Duration::hours(3);

    let outcome = app
      .toggle_selection(EntityId(u64::MAX / 10), at, None, &labels())
      .await
      .unwrap();

    assert!(matches!(outcome, ToggleOutcome::Saved(ReminderOutcome::Failed(_))));
    assert!(outcome.message().contains("could not be scheduled"));
    assert!(app.is_selected(EntityId(u64::MAX / 10)).unwrap());
    assert!(job_ids(&app).is_empty());
  }
}
