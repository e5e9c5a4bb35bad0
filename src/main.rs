mod api;
mod app;
mod cache;
mod config;
mod db;
mod logging;
mod net;
mod reminders;
mod selection;
mod store;

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::Endpoint;
use crate::app::App;
use crate::cache::{FetchOutcome, ResponseSource};
use crate::config::NetworkMode;
use crate::net::{Method, RequestOptions};
use crate::reminders::{ConsoleSink, EngineKind, EntityId, MatchLabels};

#[derive(Parser, Debug)]
#[command(name = "quiniela")]
#[command(about = "Offline-friendly client for prediction pools, with match reminders")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/quiniela/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Never touch the network; answer from cache only
  #[arg(long)]
  offline: bool,

  /// Reminder engine: auto, durable or ephemeral
  #[arg(long)]
  engine: Option<EngineKind>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Request an API path, falling back to the cache when offline
  Fetch {
    /// Path relative to the API base URL, e.g. /matches
    endpoint: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: Method,

    /// Header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    body: Option<String>,
  },

  /// Save a match (or unsave it if already saved)
  Save {
    match_id: u64,

    /// Kickoff time, RFC 3339 (e.g. 2026-06-11T19:00:00Z)
    #[arg(long)]
    at: DateTime<Utc>,

    /// Minutes before kickoff for the first reminder
    #[arg(long)]
    lead: Option<u32>,

    #[arg(long, default_value = "Home")]
    home: String,

    #[arg(long, default_value = "Away")]
    away: String,
  },

  /// List saved matches
  Saved,

  /// Check whether a match is saved
  IsSaved { match_id: u64 },

  /// Deliver due reminders until interrupted
  Watch {
    /// Polling interval in seconds
    #[arg(long, default_value_t = 30)]
    interval: u64,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command-line overrides
  if args.offline {
    config.network.mode = NetworkMode::Offline;
  }
  if let Some(engine) = args.engine {
    config.reminders.engine = engine;
  }

  let log_guard = logging::init(&config.data_dir()?.join("logs"), &config.log.level)?;

  let app = App::new(&config, Arc::new(ConsoleSink))?;

  match args.command {
    Command::Fetch {
      endpoint,
      method,
      headers,
      body,
    } => {
      let mut options = RequestOptions::get().with_method(method);
      for header in &headers {
        let (name, value) = header
          .split_once(':')
          .ok_or_else(|| eyre!("Invalid header '{}', expected NAME:VALUE", header))?;
        options = options.with_header(name, value);
      }
      if let Some(body) = body {
        options = options.with_body(body);
      }

      let outcome = app
        .cached_request(&Endpoint::from(endpoint.as_str()), &options)
        .await?;
      print_outcome(&outcome);

      if matches!(outcome, FetchOutcome::Unavailable { .. }) {
        drop(log_guard);
        std::process::exit(1);
      }
    }
    Command::Save {
      match_id,
      at,
      lead,
      home,
      away,
    } => {
      let lead = lead.map(|m| Duration::minutes(i64::from(m)));
      let outcome = app
        .toggle_selection(EntityId(match_id), at, lead, &MatchLabels::new(home, away))
        .await?;
      println!("{}", outcome.message());

      if app.engine().durable().is_none() {
        eprintln!("note: reminders are in-process only and end with this command");
      }
    }
    Command::Saved => {
      for id in app.saved()? {
        println!("{}", id);
      }
    }
    Command::IsSaved { match_id } => {
      println!("{}", app.is_selected(EntityId(match_id))?);
    }
    Command::Watch { interval } => {
      let engine = app
        .engine()
        .durable()
        .cloned()
        .ok_or_else(|| eyre!("watch needs the durable reminder engine"))?;

      let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
      loop {
        tokio::select! {
          _ = ticker.tick() => {
            let fired = engine.deliver_due(Utc::now())?;
            if fired > 0 {
              tracing::debug!(fired, "Delivered due reminders");
            }
          }
          _ = tokio::signal::ctrl_c() => break,
        }
      }
    }
  }

  Ok(())
}

fn print_outcome(outcome: &FetchOutcome) {
  match outcome {
    FetchOutcome::Ok { status, body, source } => {
      match source {
        ResponseSource::Network => println!("{}", status),
        ResponseSource::Cache(reason) => println!("{} (cached, {:?})", status, reason),
      }
      println!("{}", pretty(body));
    }
    FetchOutcome::ServerError { status, body } => {
      println!("{}", status);
      println!("{}", pretty(body));
    }
    FetchOutcome::Unavailable { reason } => {
      println!("{} Service Unavailable ({:?}, no cached data)", outcome.status(), reason);
    }
  }
}

fn pretty(body: &str) -> String {
  serde_json::from_str::<serde_json::Value>(body)
    .and_then(|v| serde_json::to_string_pretty(&v))
    .unwrap_or_else(|_| body.to_string())
}
