use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as _;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  #[default]
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Get => "GET",
      Self::Post => "POST",
      Self::Put => "PUT",
      Self::Patch => "PATCH",
      Self::Delete => "DELETE",
    }
  }
}

impl std::str::FromStr for Method {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "GET" => Ok(Self::Get),
      "POST" => Ok(Self::Post),
      "PUT" => Ok(Self::Put),
      "PATCH" => Ok(Self::Patch),
      "DELETE" => Ok(Self::Delete),
      other => Err(format!("unsupported method: {}", other)),
    }
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// Options for a single request.
///
/// Field order and the sorted header map make the serialized form canonical:
/// equal options always serialize to identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
  pub method: Method,
  /// Header names are stored lowercased
  pub headers: BTreeMap<String, String>,
  pub body: Option<String>,
}

impl RequestOptions {
  pub fn get() -> Self {
    Self::default()
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self
      .headers
      .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    self
  }

  pub fn with_body(mut self, body: impl Into<String>) -> Self {
    self.body = Some(body.into());
    self
  }
}

/// A response obtained from a reachable server, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
  pub status: u16,
  pub body: String,
}

impl TransportResponse {
  /// Whether the status is in the 2xx family
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// No response was obtained at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
  #[error("host unreachable: {0}")]
  Unreachable(String),
  #[error("request timed out: {0}")]
  Timeout(String),
  #[error("name resolution failed: {0}")]
  Dns(String),
  #[error("transport failure: {0}")]
  Other(String),
}

impl From<reqwest::Error> for TransportError {
  fn from(e: reqwest::Error) -> Self {
    let message = e.to_string();
    if e.is_timeout() {
      return Self::Timeout(message);
    }
    if e.is_connect() {
      let mut source = e.source();
      while let Some(inner) = source {
        if inner.to_string().to_ascii_lowercase().contains("dns") {
          return Self::Dns(message);
        }
        source = inner.source();
      }
      return Self::Unreachable(message);
    }
    Self::Other(message)
  }
}

/// Network transport consumed by the fetcher.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(
    &self,
    url: &str,
    options: &RequestOptions,
  ) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport. No timeout and no retries are configured.
#[derive(Clone, Default)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(
    &self,
    url: &str,
    options: &RequestOptions,
  ) -> Result<TransportResponse, TransportError> {
    let mut request = self.client.request(options.method.into(), url);
    for (name, value) in &options.headers {
      request = request.header(name, value);
    }
    if let Some(body) = &options.body {
      request = request.body(body.clone());
    }

    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    Ok(TransportResponse { status, body })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_headers_are_normalized() {
    let options = RequestOptions::get().with_header(" Content-Type ", "application/json ");
    assert_eq!(
      options.headers.get("content-type").map(String::as_str),
      Some("application/json")
    );
  }

  #[test]
  fn test_method_parse() {
    assert_eq!("post".parse::<Method>(), Ok(Method::Post));
    assert!("TRACE".parse::<Method>().is_err());
  }

  #[test]
  fn test_success_family() {
    let ok = TransportResponse {
      status: 204,
      body: String::new(),
    };
    let not_found = TransportResponse {
      status: 404,
      body: String::new(),
    };
    assert!(ok.is_success());
    assert!(!not_found.is_success());
  }

  #[tokio::test]
  async fn test_refused_connection_is_unreachable() {
    // Bind then release a port so nothing listens on it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = HttpTransport::new()
      .send(&format!("http://{addr}/matches"), &RequestOptions::get())
      .await;

    assert!(matches!(result, Err(TransportError::Unreachable(_))), "{result:?}");
  }

  #[tokio::test]
  async fn test_stalled_server_is_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold the socket without ever answering.
    let server = tokio::spawn(async move {
      let (socket, _) = listener.accept().await.unwrap();
      tokio::time::sleep(std::time::Duration::from_secs(5)).await;
      drop(socket);
    });
    let transport = HttpTransport {
      client: reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(100))
        .build()
        .unwrap(),
    };

    let result = transport
      .send(&format!("http://{addr}/matches"), &RequestOptions::get())
      .await;

    assert!(matches!(result, Err(TransportError::Timeout(_))), "{result:?}");
    server.abort();
  }

  #[tokio::test]
  async fn test_unknown_host_is_dns_failure() {
    // The .invalid TLD never resolves.
    let result = HttpTransport::new()
      .send("http://quiniela.invalid/matches", &RequestOptions::get())
      .await;

    assert!(matches!(result, Err(TransportError::Dns(_))), "{result:?}");
  }

  #[tokio::test]
  async fn test_malformed_url_is_other_failure() {
    let result = HttpTransport::new()
      .send("not a url", &RequestOptions::get())
      .await;

    assert!(matches!(result, Err(TransportError::Other(_))), "{result:?}");
  }
}
