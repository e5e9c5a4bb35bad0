//! Result types for the resilient fetch path.

/// Status reported for results synthesized from the cache.
pub const CACHED_STATUS: u16 = 200;

/// Status reported when neither network nor cache could answer.
pub const UNAVAILABLE_STATUS: u16 = 503;

/// Why the live network was not used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
  /// The network probe reported offline
  Offline,
  /// We were online but no response was obtained
  TransportFailure,
}

/// Indicates where a successful body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Fresh data from the server
  Network,
  /// Last-known-good data served from the cache
  Cache(FallbackReason),
}

/// Outcome of a resilient request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// A success body, live or cached
  Ok {
    status: u16,
    body: String,
    source: ResponseSource,
  },
  /// A reachable server answered with a non-success status
  ServerError { status: u16, body: String },
  /// No response and nothing cached
  Unavailable { reason: FallbackReason },
}

impl FetchOutcome {
  pub fn from_network(status: u16, body: String) -> Self {
    Self::Ok {
      status,
      body,
      source: ResponseSource::Network,
    }
  }

  pub fn from_cache(body: String, reason: FallbackReason) -> Self {
    Self::Ok {
      status: CACHED_STATUS,
      body,
      source: ResponseSource::Cache(reason),
    }
  }

  /// HTTP-style status for display.
  pub fn status(&self) -> u16 {
    match self {
      Self::Ok { status, .. } | Self::ServerError { status, .. } => *status,
      Self::Unavailable { .. } => UNAVAILABLE_STATUS,
    }
  }
}
