//! Delivery of search requests to a gateway endpoint.

use std::future::Future;

use thiserror::Error;

use crate::request::SearchRequest;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("gateway answered with status {0}")]
    Status(u16),
}

/// Sends one request and yields the raw response body.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: SearchRequest) -> impl Future<Output = Result<String, TransportError>> + Send;
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::header::CONTENT_TYPE;
    use tracing::debug;

    use super::{Transport, TransportError};
    use crate::request::SearchRequest;

    impl From<reqwest::Error> for TransportError {
        fn from(e: reqwest::Error) -> Self {
            match e.status() {
                Some(status) => TransportError::Status(status.as_u16()),
                None => TransportError::Request(e.to_string()),
            }
        }
    }

    /// POSTs form-encoded requests to a single endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        endpoint: String,
    }

    impl HttpTransport {
        pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?;
            Ok(Self { client, endpoint: endpoint.into() })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    impl Transport for HttpTransport {
        async fn send(&self, request: SearchRequest) -> Result<String, TransportError> {
            debug!(endpoint = %self.endpoint, query = ?request.query(), "POST live search");
            let response = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(request.encode())
                .send()
                .await?
                .error_for_status()?;
            Ok(response.text().await?)
        }
    }
}
