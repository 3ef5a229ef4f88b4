//! In-memory transport implementation.
//!
//! Provides a complete in-process transport for:
//! - Unit testing without external service dependencies
//! - Development and demos
//! - Reference implementation of the transport contract
//!
//! The provider is a cloneable handle over shared state: one clone acts as
//! the "remote service" (publishing payloads, toggling capabilities) while
//! another is handed to the client under test.

use crate::client::{
    CapabilityReport, PushSubscription, QueueTransport, SubscriptionEvent, TransportType,
};
use crate::error::TransportError;
use async_trait::async_trait;
use queue_sync_core::SnapshotPayload;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// In-process transport backed by shared state
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<RwLock<MemoryState>>,
}

/// Shared provider state
#[derive(Debug)]
struct MemoryState {
    /// Latest payload per parent aggregate
    payloads: HashMap<String, SnapshotPayload>,

    /// Open subscriptions per parent aggregate
    subscribers: HashMap<String, Vec<MemorySubscriber>>,

    /// What the simulated backend claims to support
    capabilities: CapabilityReport,

    /// Monotonic id source for subscriber bookkeeping
    next_subscriber_id: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            payloads: HashMap::new(),
            subscribers: HashMap::new(),
            capabilities: CapabilityReport::fully_available(),
            next_subscriber_id: 0,
        }
    }
}

/// One open subscription's delivery handle
#[derive(Debug)]
struct MemorySubscriber {
    id: u64,
    sender: mpsc::UnboundedSender<SubscriptionEvent>,
}

impl MemoryTransport {
    /// Create a transport with no payloads and full capabilities
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload and fan it out to every open subscription.
    ///
    /// Subscribers whose channel has closed are pruned on the way.
    pub fn publish(&self, parent_id: &str, payload: SnapshotPayload) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.payloads.insert(parent_id.to_string(), payload.clone());

        if let Some(subscribers) = state.subscribers.get_mut(parent_id) {
            subscribers
                .retain(|s| s.sender.send(SubscriptionEvent::Payload(payload.clone())).is_ok());
        }
    }

    /// Deliver a transport error to every open subscription for a parent
    pub fn emit_error(&self, parent_id: &str, error: TransportError) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if let Some(subscribers) = state.subscribers.get_mut(parent_id) {
            subscribers
                .retain(|s| s.sender.send(SubscriptionEvent::Error(error.clone())).is_ok());
        }
    }

    /// End every open subscription for a parent (streams complete)
    pub fn close_subscriptions(&self, parent_id: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.subscribers.remove(parent_id);
    }

    /// Replace the capability report returned by probes
    pub fn set_capabilities(&self, capabilities: CapabilityReport) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.capabilities = capabilities;
    }

    /// Latest payload stored for a parent, if any
    pub fn latest(&self, parent_id: &str) -> Option<SnapshotPayload> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.payloads.get(parent_id).cloned()
    }

    /// Number of open subscriptions for a parent
    pub fn subscriber_count(&self, parent_id: &str) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.subscribers.get(parent_id).map_or(0, Vec::len)
    }

    fn remove_subscriber(state: &Arc<RwLock<MemoryState>>, parent_id: &str, id: u64) {
        let mut state = state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(subscribers) = state.subscribers.get_mut(parent_id) {
            subscribers.retain(|s| s.id != id);
        }
    }
}

#[async_trait]
impl QueueTransport for MemoryTransport {
    async fn fetch_snapshot(&self, parent_id: &str) -> Result<SnapshotPayload, TransportError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());

        // Unknown parents read as empty queues; the store creates them on
        // first publish.
        Ok(state
            .payloads
            .get(parent_id)
            .cloned()
            .unwrap_or_else(|| SnapshotPayload::new(Vec::new())))
    }

    async fn subscribe(&self, parent_id: &str) -> Result<PushSubscription, TransportError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (cancel_sender, cancel_receiver) = oneshot::channel();

        let (id, replay) = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

            if !state.capabilities.subscriptions_available {
                return Err(TransportError::FeatureUnavailable {
                    message: "push delivery is disabled on this backend".to_string(),
                });
            }

            state.next_subscriber_id += 1;
            let id = state.next_subscriber_id;
            let replay = state.payloads.get(parent_id).cloned();

            state
                .subscribers
                .entry(parent_id.to_string())
                .or_default()
                .push(MemorySubscriber {
                    id,
                    sender: sender.clone(),
                });

            (id, replay)
        };

        // New subscriptions immediately see the latest known payload
        if let Some(payload) = replay {
            let _ = sender.send(SubscriptionEvent::Payload(payload));
        }

        let state = Arc::clone(&self.state);
        let parent = parent_id.to_string();
        tokio::spawn(async move {
            let _ = cancel_receiver.await;
            debug!(parent_id = %parent, subscriber_id = id, "subscription cancelled");
            Self::remove_subscriber(&state, &parent, id);
        });

        Ok(PushSubscription::new(receiver, cancel_sender))
    }

    async fn probe_capabilities(&self) -> Result<CapabilityReport, TransportError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state.capabilities.clone())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::InMemory
    }

    fn supports_push(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
