//! Connectivity probing and the HTTP transport consumed by the fetcher.

mod probe;
mod transport;

pub use probe::{FixedNetworkState, NetworkState, NetworkStateProvider, ResolverProbe};
pub use transport::{
  HttpTransport, Method, RequestOptions, Transport, TransportError, TransportResponse,
};
