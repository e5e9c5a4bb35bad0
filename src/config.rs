use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::reminders::{EngineKind, NotificationPolicy, ReminderTemplates};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub network: NetworkConfig,
  #[serde(default)]
  pub reminders: RemindersConfig,
  /// Where the database and logs live (defaults to the platform data directory)
  pub data_dir: Option<PathBuf>,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  "http://localhost:3000".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
  /// Probe connectivity on every request
  #[default]
  Auto,
  /// Always attempt the network
  Online,
  /// Never attempt the network; serve from cache only
  Offline,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
  #[serde(default)]
  pub mode: NetworkMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemindersConfig {
  /// Minutes before kickoff for the first reminder
  #[serde(default = "default_lead_minutes")]
  pub lead_minutes: u32,
  #[serde(default)]
  pub engine: EngineKind,
  /// Answer given to permission requests
  #[serde(default)]
  pub notifications: NotificationPolicy,
  #[serde(default)]
  pub templates: ReminderTemplates,
}

impl Default for RemindersConfig {
  fn default() -> Self {
    Self {
      lead_minutes: default_lead_minutes(),
      engine: EngineKind::default(),
      notifications: NotificationPolicy::default(),
      templates: ReminderTemplates::default(),
    }
  }
}

fn default_lead_minutes() -> u32 {
  60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./quiniela.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/quiniela/config.yaml
  ///
  /// Without any file the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("quiniela.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("quiniela").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.base_url()?;
    Ok(config)
  }

  /// Parsed API base URL.
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.api.base_url, e))
  }

  /// Data directory, falling back to the platform default.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("quiniela"))
  }

  pub fn lead_time(&self) -> chrono::Duration {
    chrono::Duration::minutes(i64::from(self.reminders.lead_minutes))
  }
}
