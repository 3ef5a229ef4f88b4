//! HTTP pull-only transport implementation.
//!
//! Talks to the remote queue service over plain HTTP JSON:
//! - `GET {base}/queues/{parent_id}` returns the current payload
//! - `GET {base}/capabilities` returns the backend capability report
//!
//! Push delivery is not available over this transport; subscriptions are
//! refused up front and capability reports are clamped accordingly, so a
//! backend cannot claim a channel this transport is unable to carry.

use crate::client::{CapabilityReport, PushSubscription, QueueTransport, TransportType};
use crate::error::{classify_remote_message, TransportError};
use async_trait::async_trait;
use queue_sync_core::SnapshotPayload;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default per-request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport over the queue service's pull endpoints
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport against a base endpoint with the default timeout.
    ///
    /// Endpoint paths are joined against the base, so include a trailing
    /// slash when the service is mounted under a path prefix.
    pub fn new(base_url: Url) -> Result<Self, TransportError> {
        Self::with_request_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with an explicit per-request timeout
    pub fn with_request_timeout(
        base_url: Url,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("queue-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InvalidEndpoint {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url,
            request_timeout,
        })
    }

    /// Base endpoint this transport talks to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidEndpoint {
                message: format!("{}: {}", self.base_url, e),
            })
    }

    fn map_request_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                duration: self.request_timeout,
            }
        } else {
            TransportError::ConnectionFailed {
                message: error.to_string(),
            }
        }
    }

    /// Map a non-success response onto the error taxonomy.
    ///
    /// Known permanent message patterns take precedence over the raw status
    /// so partially provisioned backends classify correctly even behind a
    /// generic 4xx.
    async fn map_error_response(
        &self,
        status: u16,
        response: reqwest::Response,
    ) -> TransportError {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        if let Some(classified) = classify_remote_message(&body) {
            return classified;
        }

        TransportError::ServiceError {
            status,
            message: body,
        }
    }
}

#[async_trait]
impl QueueTransport for HttpTransport {
    async fn fetch_snapshot(&self, parent_id: &str) -> Result<SnapshotPayload, TransportError> {
        let url = self.endpoint(&format!("queues/{}", parent_id))?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::QueueNotFound {
                parent_id: parent_id.to_string(),
            });
        }

        if !status.is_success() {
            return Err(self.map_error_response(status.as_u16(), response).await);
        }

        response
            .json::<SnapshotPayload>()
            .await
            .map_err(|e| TransportError::Serialization {
                message: format!("Failed to parse queue payload: {}", e),
            })
    }

    async fn subscribe(&self, _parent_id: &str) -> Result<PushSubscription, TransportError> {
        Err(TransportError::PushUnsupported {
            transport: self.transport_type().to_string(),
        })
    }

    async fn probe_capabilities(&self) -> Result<CapabilityReport, TransportError> {
        let url = self.endpoint("capabilities")?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.map_error_response(status.as_u16(), response).await);
        }

        let mut report = response.json::<CapabilityReport>().await.map_err(|e| {
            TransportError::Serialization {
                message: format!("Failed to parse capability report: {}", e),
            }
        })?;

        // A pull-only transport cannot carry push no matter what the backend
        // claims to support.
        if report.subscriptions_available && !self.supports_push() {
            debug!(
                base_url = %self.base_url,
                "backend advertises push; clamped to pull-only transport"
            );
            report.subscriptions_available = false;
        }

        Ok(report)
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Http
    }

    fn supports_push(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
