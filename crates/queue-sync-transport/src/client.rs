//! Transport traits, subscriptions, and capability reports.

use crate::error::TransportError;
use async_trait::async_trait;
use queue_sync_core::SnapshotPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{mpsc, oneshot};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Main interface for queue synchronization across all transports
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Fetch the current queue payload for a parent aggregate
    async fn fetch_snapshot(&self, parent_id: &str) -> Result<SnapshotPayload, TransportError>;

    /// Open a push subscription for a parent aggregate
    ///
    /// The subscription yields payloads and errors until it is unsubscribed
    /// or the transport ends the stream.
    async fn subscribe(&self, parent_id: &str) -> Result<PushSubscription, TransportError>;

    /// Ask the backend which delivery features it currently supports
    ///
    /// Carries no business payload; the reply is introspective only.
    async fn probe_capabilities(&self) -> Result<CapabilityReport, TransportError>;

    /// Get transport type
    fn transport_type(&self) -> TransportType;

    /// Check if the transport can deliver over a push channel at all
    fn supports_push(&self) -> bool;
}

/// Supported transport implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// In-process transport for tests and demos
    InMemory,
    /// HTTP pull-only transport
    Http,
}

impl TransportType {
    /// Get string representation of the transport type
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::InMemory => "in-memory",
            TransportType::Http => "http",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend capability report returned by the probe operation.
///
/// Wire shape matches the remote service's introspection reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityReport {
    /// Whether push subscriptions are currently served
    pub subscriptions_available: bool,

    /// Whether mutations are currently served
    pub mutations_available: bool,

    /// Failure descriptions collected while probing
    #[serde(default)]
    pub errors: Vec<String>,
}

impl CapabilityReport {
    /// Report for a backend with every capability in service
    pub fn fully_available() -> Self {
        Self {
            subscriptions_available: true,
            mutations_available: true,
            errors: Vec::new(),
        }
    }

    /// Report for a backend that could not be probed.
    ///
    /// Subscriptions fail closed (a push channel that might not work is
    /// worse than polling); mutations fail open (blocking writes on a probe
    /// hiccup would strand the caller).
    pub fn degraded(errors: Vec<String>) -> Self {
        Self {
            subscriptions_available: false,
            mutations_available: true,
            errors,
        }
    }

    /// Whether the probe saw every capability with no failures
    pub fn is_fully_available(&self) -> bool {
        self.subscriptions_available && self.mutations_available && self.errors.is_empty()
    }
}

/// One event delivered over a push subscription
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    /// A new queue payload
    Payload(SnapshotPayload),
    /// A transport-reported delivery failure
    Error(TransportError),
}

/// Handle to an open push subscription.
///
/// Events are consumed with [`PushSubscription::next_event`]; the stream
/// ends (`None`) when the transport completes it. Dropping the handle
/// unsubscribes, so an aborted consumer task releases its channel without
/// extra bookkeeping.
#[derive(Debug)]
pub struct PushSubscription {
    events: mpsc::UnboundedReceiver<SubscriptionEvent>,
    cancel: Option<oneshot::Sender<()>>,
}

impl PushSubscription {
    /// Assemble a subscription from its event stream and cancel signal
    pub fn new(
        events: mpsc::UnboundedReceiver<SubscriptionEvent>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            cancel: Some(cancel),
        }
    }

    /// Wait for the next event; `None` means the stream has ended
    pub async fn next_event(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    /// Tell the transport to stop delivering.
    ///
    /// Idempotent; pending events already in the channel are discarded.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.events.close();
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
