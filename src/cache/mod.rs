//! Request cache for offline support.
//!
//! This module provides a best-effort fetch path that:
//! - Keys every request by a deterministic fingerprint of endpoint + options
//! - Records the last successful body per fingerprint (no expiry, no eviction)
//! - Serves the recorded body when the network is offline or unreachable
//! - Never serves cache over a response from a reachable server

mod fingerprint;
mod layer;
mod storage;
mod traits;

pub use fingerprint::Fingerprint;
pub use layer::ResilientFetcher;
pub use storage::CacheStore;
pub use traits::{FallbackReason, FetchOutcome, ResponseSource};
