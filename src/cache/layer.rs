//! Fetcher that orchestrates the network call against the cache.

use color_eyre::Result;
use std::sync::Arc;
use url::Url;

use super::fingerprint::Fingerprint;
use super::storage::CacheStore;
use super::traits::{FallbackReason, FetchOutcome};
use crate::api::Endpoint;
use crate::net::{NetworkState, NetworkStateProvider, RequestOptions, Transport};

/// Best-effort request path with offline support.
///
/// Reachable servers always win: any response obtained from the network,
/// success or error, is returned as-is. The cache is only read when no
/// response could be obtained.
#[derive(Clone)]
pub struct ResilientFetcher {
  base_url: Url,
  network: Arc<dyn NetworkStateProvider>,
  transport: Arc<dyn Transport>,
  cache: CacheStore,
}

impl ResilientFetcher {
  pub fn new(
    base_url: Url,
    network: Arc<dyn NetworkStateProvider>,
    transport: Arc<dyn Transport>,
    cache: CacheStore,
  ) -> Self {
    Self {
      base_url,
      network,
      transport,
      cache,
    }
  }

  /// Request a catalog endpoint relative to the configured base URL.
  pub async fn request(&self, endpoint: &Endpoint, options: &RequestOptions) -> Result<FetchOutcome> {
    let url = endpoint.url(&self.base_url)?;
    self.request_url(url.as_str(), options).await
  }

  /// Request an absolute URL.
  ///
  /// 1. Sample the network state
  /// 2. Online: send; a 2xx body is cached and returned, any other status is returned verbatim
  /// 3. Offline or transport failure: serve the cached body, else Unavailable
  pub async fn request_url(&self, url: &str, options: &RequestOptions) -> Result<FetchOutcome> {
    let key = Fingerprint::new(url, options)?;

    let reason = match self.network.current().await {
      NetworkState::Online => match self.transport.send(url, options).await {
        Ok(response) if response.is_success() => {
          // A failed cache write never masks a live response.
          if let Err(e) = self.remember(&key, &response.body) {
            tracing::warn!(url, error = %e, "Failed to cache response");
          }
          return Ok(FetchOutcome::from_network(response.status, response.body));
        }
        Ok(response) => {
          tracing::warn!(url, status = response.status, "Server returned non-success status");
          return Ok(FetchOutcome::ServerError {
            status: response.status,
            body: response.body,
          });
        }
        Err(e) => {
          tracing::warn!(url, error = %e, "Network error, falling back to cache");
          FallbackReason::TransportFailure
        }
      },
      NetworkState::Offline => {
        tracing::debug!(url, "Offline, serving from cache");
        FallbackReason::Offline
      }
    };

    self.fallback(&key, url, reason)
  }

  /// Cache a live success body. Only JSON bodies are recorded.
  fn remember(&self, key: &Fingerprint, body: &str) -> Result<()> {
    if serde_json::from_str::<serde_json::Value>(body).is_err() {
      tracing::debug!(%key, "Success body is not JSON, not caching");
      return Ok(());
    }

    self.cache.put(key, body)?;
    tracing::debug!(%key, "Cached response");
    Ok(())
  }

  fn fallback(&self, key: &Fingerprint, url: &str, reason: FallbackReason) -> Result<FetchOutcome> {
    let Some(body) = self.cache.get(key)? else {
      tracing::warn!(url, ?reason, "No cached data");
      return Ok(FetchOutcome::Unavailable { reason });
    };

    // A corrupt row behaves like a miss; it stays until a live fetch replaces it.
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&body) {
      tracing::warn!(url, error = %e, "Cached body is malformed, ignoring");
      return Ok(FetchOutcome::Unavailable { reason });
    }

    Ok(FetchOutcome::from_cache(body, reason))
  }
}
