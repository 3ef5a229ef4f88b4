//! Common test utilities for queue-sync integration tests
//!
//! This module provides:
//! - A scriptable transport that replays subscribe, fetch, and probe
//!   outcomes while counting every call made against it
//! - Fixture builders for payloads and fully wired clients

use async_trait::async_trait;
use queue_sync_client::{QueueSyncClient, SyncState};
use queue_sync_core::{
    InMemoryMetrics, QueueEntry, QueueIdentity, SnapshotPayload, SyncClientConfig,
};
use queue_sync_transport::{
    CapabilityReport, PushSubscription, QueueTransport, SubscriptionEvent, TransportError,
    TransportType,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Scripted Transport
// ============================================================================

/// How the transport answers capability probes
#[allow(dead_code)]
pub enum ProbeBehavior {
    /// Answer immediately with the given report
    Report(CapabilityReport),
    /// Fail immediately with the given error
    Fail(TransportError),
    /// Never answer; only the caller's timeout can end the probe
    Hang,
}

/// Transport whose operations replay scripts while counting every call.
///
/// Subscribe outcomes come from a script: `Ok(())` opens a channel the test
/// feeds through [`ScriptedTransport::deliver`], and an exhausted script
/// keeps opening channels. Fetch outcomes come from a second script, falling
/// back to a payload tagged `polled` so tests can tell the delivery paths
/// apart.
pub struct ScriptedTransport {
    subscribe_script: Mutex<VecDeque<Result<(), TransportError>>>,
    fetch_script: Mutex<VecDeque<Result<SnapshotPayload, TransportError>>>,
    probe_behavior: Mutex<ProbeBehavior>,
    push_supported: bool,
    subscribe_calls: AtomicU32,
    fetch_calls: AtomicU32,
    probe_calls: AtomicU32,
    senders: Mutex<Vec<mpsc::UnboundedSender<SubscriptionEvent>>>,
}

impl ScriptedTransport {
    /// Push-capable transport whose probe approves everything
    #[allow(dead_code)]
    pub fn new() -> Arc<Self> {
        Self::with_probe(ProbeBehavior::Report(CapabilityReport::fully_available()))
    }

    /// Push-capable transport with explicit probe behavior
    #[allow(dead_code)]
    pub fn with_probe(probe_behavior: ProbeBehavior) -> Arc<Self> {
        Arc::new(Self {
            subscribe_script: Mutex::new(VecDeque::new()),
            fetch_script: Mutex::new(VecDeque::new()),
            probe_behavior: Mutex::new(probe_behavior),
            push_supported: true,
            subscribe_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            probe_calls: AtomicU32::new(0),
            senders: Mutex::new(Vec::new()),
        })
    }

    /// Push-capable transport whose probe never answers
    #[allow(dead_code)]
    pub fn hanging_probe() -> Arc<Self> {
        Self::with_probe(ProbeBehavior::Hang)
    }

    /// Pull-only transport whose backend still advertises subscriptions
    #[allow(dead_code)]
    pub fn pull_only() -> Arc<Self> {
        Arc::new(Self {
            subscribe_script: Mutex::new(VecDeque::new()),
            fetch_script: Mutex::new(VecDeque::new()),
            probe_behavior: Mutex::new(ProbeBehavior::Report(CapabilityReport::fully_available())),
            push_supported: false,
            subscribe_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            probe_calls: AtomicU32::new(0),
            senders: Mutex::new(Vec::new()),
        })
    }

    /// Push-capable transport whose first `count` subscribes fail with `error`
    #[allow(dead_code)]
    pub fn failing_subscribes(count: usize, error: TransportError) -> Arc<Self> {
        let transport = Self::new();
        *transport.subscribe_script.lock().unwrap() = vec![Err(error); count].into();
        transport
    }

    /// Queue fetch outcomes; an exhausted script answers with `polled`
    #[allow(dead_code)]
    pub fn script_fetches(&self, outcomes: Vec<Result<SnapshotPayload, TransportError>>) {
        *self.fetch_script.lock().unwrap() = outcomes.into();
    }

    /// Number of subscribe calls made so far
    #[allow(dead_code)]
    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Number of snapshot fetches made so far
    #[allow(dead_code)]
    pub fn fetch_count(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of capability probes made so far
    #[allow(dead_code)]
    pub fn probe_count(&self) -> u32 {
        self.probe_calls.load(Ordering::SeqCst)
    }

    /// Every transport touch across all three operations
    #[allow(dead_code)]
    pub fn total_calls(&self) -> u32 {
        self.subscribe_count() + self.fetch_count() + self.probe_count()
    }

    /// Push a payload with a single entry tagged `tag` to the newest subscriber
    #[allow(dead_code)]
    pub fn deliver(&self, tag: &str) {
        self.deliver_payload(payload(tag));
    }

    /// Push an arbitrary payload to the newest subscriber
    #[allow(dead_code)]
    pub fn deliver_payload(&self, payload: SnapshotPayload) {
        if let Some(sender) = self.senders.lock().unwrap().last() {
            let _ = sender.send(SubscriptionEvent::Payload(payload));
        }
    }

    /// Push a transport error event to the newest subscriber
    #[allow(dead_code)]
    pub fn emit_error(&self, error: TransportError) {
        if let Some(sender) = self.senders.lock().unwrap().last() {
            let _ = sender.send(SubscriptionEvent::Error(error));
        }
    }

    /// Close the newest subscription's event stream
    #[allow(dead_code)]
    pub fn end_stream(&self) {
        self.senders.lock().unwrap().pop();
    }
}

#[async_trait]
impl QueueTransport for ScriptedTransport {
    async fn fetch_snapshot(&self, _parent_id: &str) -> Result<SnapshotPayload, TransportError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(payload("polled")))
    }

    async fn subscribe(&self, _parent_id: &str) -> Result<PushSubscription, TransportError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .subscribe_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        match outcome {
            Ok(()) => {
                let (sender, events) = mpsc::unbounded_channel();
                let (cancel, _cancel_rx) = oneshot::channel();
                self.senders.lock().unwrap().push(sender);
                Ok(PushSubscription::new(events, cancel))
            }
            Err(error) => Err(error),
        }
    }

    async fn probe_capabilities(&self) -> Result<CapabilityReport, TransportError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        // The lock guard must not live across an await point.
        let answer = match &*self.probe_behavior.lock().unwrap() {
            ProbeBehavior::Report(report) => Some(Ok(report.clone())),
            ProbeBehavior::Fail(error) => Some(Err(error.clone())),
            ProbeBehavior::Hang => None,
        };
        match answer {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    fn transport_type(&self) -> TransportType {
        TransportType::InMemory
    }

    fn supports_push(&self) -> bool {
        self.push_supported
    }
}

// ============================================================================
// Test Fixture Builders
// ============================================================================

/// Identity used by most tests
#[allow(dead_code)]
pub fn identity() -> QueueIdentity {
    QueueIdentity::new("user-1", "event-2025")
}

/// Payload with a single entry tagged `tag`
#[allow(dead_code)]
pub fn payload(tag: &str) -> SnapshotPayload {
    SnapshotPayload::new(vec![QueueEntry::new(tag)])
}

/// Client over `transport` with the default identity and configuration
#[allow(dead_code)]
pub fn make_client(transport: Arc<ScriptedTransport>) -> (QueueSyncClient, Arc<InMemoryMetrics>) {
    make_client_for(transport, identity())
}

/// Client over `transport` for an explicit identity
#[allow(dead_code)]
pub fn make_client_for(
    transport: Arc<ScriptedTransport>,
    identity: QueueIdentity,
) -> (QueueSyncClient, Arc<InMemoryMetrics>) {
    let metrics = Arc::new(InMemoryMetrics::new());
    let client = QueueSyncClient::new(
        identity,
        transport,
        SyncClientConfig::default(),
        metrics.clone(),
    );
    (client, metrics)
}

/// Entry tag of the current snapshot, when one exists
#[allow(dead_code)]
pub fn snapshot_tag(state: &SyncState) -> Option<String> {
    state
        .snapshot
        .as_ref()
        .map(|snapshot| snapshot.ordered_entries[0].entry_id.clone())
}

/// Short sleep that lets spawned work run under a paused clock
#[allow(dead_code)]
pub fn settle() -> tokio::time::Sleep {
    tokio::time::sleep(std::time::Duration::from_millis(1))
}
