//! Endpoint catalog for the prediction-pool API.

use color_eyre::{eyre::eyre, Result};
use url::Url;

/// Known API routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
  // Auth
  Login,
  Register,

  // Users
  Users,
  UserById(u64),

  // Teams
  Teams,
  TeamById(u64),

  // Matches
  Matches,
  MatchById(u64),

  // Pools
  Pools,
  PoolById(u64),
  PoolParticipants(u64),
  PoolsJoinedByUser(u64),
  PoolsOwnedByUser(u64),
  JoinPool,

  // Predictions
  Predictions,
  PredictionById(u64),

  // Leaderboard
  Leaderboard,
  LeaderboardByPool(u64),

  Roles,
  RoleById(u64),

  Confederations,
  ConfederationById(u64),

  /// Any other path, passed through verbatim
  Custom(String),
}

impl Endpoint {
  /// Path relative to the API base URL.
  pub fn path(&self) -> String {
    match self {
      Self::Login => "/auth/login".to_string(),
      Self::Register => "/auth/register".to_string(),
      Self::Users => "/users".to_string(),
      Self::UserById(id) => format!("/users/{}", id),
      Self::Teams => "/teams".to_string(),
      Self::TeamById(id) => format!("/teams/{}", id),
      Self::Matches => "/matches".to_string(),
      Self::MatchById(id) => format!("/matches/{}", id),
      Self::Pools => "/pools".to_string(),
      Self::PoolById(id) => format!("/pools/{}", id),
      Self::PoolParticipants(id) => format!("/pools/{}/participants", id),
      Self::PoolsJoinedByUser(id) => format!("/pools/joined/{}", id),
      Self::PoolsOwnedByUser(id) => format!("/pools/owned/{}", id),
      Self::JoinPool => "/pools/join".to_string(),
      Self::Predictions => "/predictions".to_string(),
      Self::PredictionById(id) => format!("/predictions/{}", id),
      Self::Leaderboard => "/leaderboard".to_string(),
      Self::LeaderboardByPool(id) => format!("/leaderboard/{}", id),
      Self::Roles => "/api/roles".to_string(),
      Self::RoleById(id) => format!("/api/roles/{}", id),
      Self::Confederations => "/confederations".to_string(),
      Self::ConfederationById(id) => format!("/confederations/{}", id),
      Self::Custom(path) => {
        if path.starts_with('/') {
          path.clone()
        } else {
          format!("/{}", path)
        }
      }
    }
  }

  /// Absolute URL: the path is appended to `base`, keeping any base path prefix.
  pub fn url(&self, base: &Url) -> Result<Url> {
    let path = self.path();
    let full = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&full).map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }
}

impl From<&str> for Endpoint {
  /// Recognize catalog routes; anything else is passed through as `Custom`.
  fn from(path: &str) -> Self {
    let path = path.trim();
    if path.contains('?') {
      return Self::Custom(path.to_string());
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let id = |s: &str| s.parse::<u64>().ok();

    let known = match segments.as_slice() {
      ["auth", "login"] => Some(Self::Login),
      ["auth", "register"] => Some(Self::Register),
      ["users"] => Some(Self::Users),
      ["users", n] => id(*n).map(Self::UserById),
      ["teams"] => Some(Self::Teams),
      ["teams", n] => id(*n).map(Self::TeamById),
      ["matches"] => Some(Self::Matches),
      ["matches", n] => id(*n).map(Self::MatchById),
      ["pools"] => Some(Self::Pools),
      ["pools", "join"] => Some(Self::JoinPool),
      ["pools", "joined", n] => id(*n).map(Self::PoolsJoinedByUser),
      ["pools", "owned", n] => id(*n).map(Self::PoolsOwnedByUser),
      ["pools", n] => id(*n).map(Self::PoolById),
      ["pools", n, "participants"] => id(*n).map(Self::PoolParticipants),
      ["predictions"] => Some(Self::Predictions),
      ["predictions", n] => id(*n).map(Self::PredictionById),
      ["leaderboard"] => Some(Self::Leaderboard),
      ["leaderboard", n] => id(*n).map(Self::LeaderboardByPool),
      ["api", "roles"] => Some(Self::Roles),
      ["api", "roles", n] => id(*n).map(Self::RoleById),
      ["confederations"] => Some(Self::Confederations),
      ["confederations", n] => id(*n).map(Self::ConfederationById),
      _ => None,
    };

    known.unwrap_or_else(|| Self::Custom(path.to_string()))
  }
}
