use async_trait::async_trait;
use url::Url;

/// Whether outbound connectivity is currently believed available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
  Online,
  Offline,
}

/// Source of the current network state.
///
/// Sampled once per request; implementations must not cache across calls.
#[async_trait]
pub trait NetworkStateProvider: Send + Sync {
  async fn current(&self) -> NetworkState;
}

/// Always reports the same state. Used for `--offline` and in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedNetworkState(pub NetworkState);

#[async_trait]
impl NetworkStateProvider for FixedNetworkState {
  async fn current(&self) -> NetworkState {
    self.0
  }
}

/// Reports Online when the API host resolves to at least one address.
///
/// This is a cheap hint, like a platform's online flag: a resolvable host
/// can still fail at connect time, which the fetcher handles separately.
#[derive(Debug, Clone)]
pub struct ResolverProbe {
  target: Option<String>,
}

impl ResolverProbe {
  pub fn new(base_url: &Url) -> Self {
    let target = base_url
      .host_str()
      .map(|host| format!("{}:{}", host, base_url.port_or_known_default().unwrap_or(80)));
    Self { target }
  }
}

#[async_trait]
impl NetworkStateProvider for ResolverProbe {
  async fn current(&self) -> NetworkState {
    let Some(target) = self.target.as_deref() else {
      // Nothing to resolve; let the transport decide.
      return NetworkState::Online;
    };

    match tokio::net::lookup_host(target).await {
      Ok(mut addrs) => {
        if addrs.next().is_some() {
          NetworkState::Online
        } else {
          NetworkState::Offline
        }
      }
      Err(e) => {
        tracing::debug!(host = target, error = %e, "API host did not resolve");
        NetworkState::Offline
      }
    }
  }
}
