//! Tests for the client composition root.

use super::*;
use async_trait::async_trait;
use queue_sync_core::{InMemoryMetrics, QueueEntry, SnapshotPayload};
use queue_sync_transport::{PushSubscription, SubscriptionEvent, TransportError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Counting Transport
// ============================================================================

/// Transport that counts every call and lets tests drive push deliveries.
struct CountingTransport {
    probe_calls: AtomicU32,
    subscribe_calls: AtomicU32,
    fetch_calls: AtomicU32,
    probe_hangs: bool,
    senders: Mutex<Vec<mpsc::UnboundedSender<SubscriptionEvent>>>,
}

impl CountingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            probe_calls: AtomicU32::new(0),
            subscribe_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            probe_hangs: false,
            senders: Mutex::new(Vec::new()),
        })
    }

    fn with_hanging_probe() -> Arc<Self> {
        Arc::new(Self {
            probe_calls: AtomicU32::new(0),
            subscribe_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            probe_hangs: true,
            senders: Mutex::new(Vec::new()),
        })
    }

    fn total_calls(&self) -> u32 {
        self.probe_calls.load(Ordering::SeqCst)
            + self.subscribe_calls.load(Ordering::SeqCst)
            + self.fetch_calls.load(Ordering::SeqCst)
    }

    fn deliver(&self, tag: &str) {
        if let Some(sender) = self.senders.lock().unwrap().last() {
            let payload = SnapshotPayload::new(vec![QueueEntry::new(tag)]);
            let _ = sender.send(SubscriptionEvent::Payload(payload));
        }
    }
}

#[async_trait]
impl QueueTransport for CountingTransport {
    async fn fetch_snapshot(&self, _parent_id: &str) -> Result<SnapshotPayload, TransportError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SnapshotPayload::new(vec![QueueEntry::new("polled")]))
    }

    async fn subscribe(&self, _parent_id: &str) -> Result<PushSubscription, TransportError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (sender, events) = mpsc::unbounded_channel();
        let (cancel, _cancel_rx) = oneshot::channel();
        self.senders.lock().unwrap().push(sender);
        Ok(PushSubscription::new(events, cancel))
    }

    async fn probe_capabilities(&self) -> Result<CapabilityReport, TransportError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_hangs {
            std::future::pending::<()>().await;
        }
        Ok(CapabilityReport::fully_available())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::InMemory
    }

    fn supports_push(&self) -> bool {
        true
    }
}

fn client_for(transport: Arc<CountingTransport>) -> (QueueSyncClient, Arc<InMemoryMetrics>) {
    let metrics = Arc::new(InMemoryMetrics::new());
    let client = QueueSyncClient::new(
        QueueIdentity::new("user-1", "event-2025"),
        transport,
        SyncClientConfig::default(),
        metrics.clone(),
    );
    (client, metrics)
}

fn settle() -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(1))
}

// ============================================================================
// Startup Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_start_uses_push_when_available() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));

    client.start().await;
    settle().await;

    assert_eq!(transport.probe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.connection_status(), ConnectionState::Connecting);

    transport.deliver("pushed");
    settle().await;

    let state = client.current_state();
    assert_eq!(state.connection_status, ConnectionState::Connected);
    assert_eq!(
        state.snapshot.unwrap().ordered_entries[0].entry_id,
        "pushed"
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_with_blank_subject_touches_nothing() {
    let transport = CountingTransport::new();
    let client = QueueSyncClient::with_defaults(
        QueueIdentity::new("", "event-2025"),
        transport.clone(),
    );

    client.start().await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    // Not even the capability probe ran.
    assert_eq!(transport.total_calls(), 0);
    let state = client.current_state();
    assert_eq!(state.connection_status, ConnectionState::Disconnected);
    assert!(matches!(
        state.last_error,
        Some(SyncError::Configuration(_))
    ));
    assert!(state.snapshot.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_falls_back_to_polling() {
    let transport = CountingTransport::with_hanging_probe();
    let (client, metrics) = client_for(Arc::clone(&transport));

    // start() itself waits out the probe timeout under the paused clock.
    client.start().await;
    settle().await;

    assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 0);
    assert!(transport.fetch_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(metrics.snapshot().fallback_activations, 1);

    let report = client.capabilities().unwrap();
    assert!(!report.subscriptions_available);
    assert!(report.mutations_available);

    let state = client.current_state();
    assert_eq!(state.connection_status, ConnectionState::Connected);
    assert_eq!(
        state.snapshot.unwrap().ordered_entries[0].entry_id,
        "polled"
    );
}

// ============================================================================
// Observation Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_observers_see_state_transitions() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));
    let mut updates = client.subscribe();
    updates.borrow_and_update();

    client.start().await;
    settle().await;

    assert!(updates.has_changed().unwrap());
    assert_eq!(
        updates.borrow_and_update().connection_status,
        ConnectionState::Connecting
    );

    transport.deliver("pushed");
    settle().await;

    assert!(updates.has_changed().unwrap());
    let state = updates.borrow_and_update().clone();
    assert_eq!(state.connection_status, ConnectionState::Connected);
    assert!(state.has_snapshot());
}

#[tokio::test(start_paused = true)]
async fn test_capability_report_is_exposed() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));

    assert!(client.capabilities().is_none());

    client.start().await;
    assert!(client.capabilities().unwrap().is_fully_available());

    let report = client.revalidate_capabilities().await;
    assert!(report.is_fully_available());
    assert_eq!(transport.probe_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_accessors_describe_the_instance() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));
    let (other, _other_metrics) = client_for(transport);

    assert_eq!(client.identity().subject_id, "user-1");
    assert_eq!(client.identity().parent_id, "event-2025");
    assert_eq!(client.transport_type(), TransportType::InMemory);
    assert_ne!(client.instance_id(), other.instance_id());
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_dispose_freezes_the_state() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));

    client.start().await;
    settle().await;
    transport.deliver("pushed");
    settle().await;

    client.dispose();
    client.dispose();

    let frozen = client.current_state();
    transport.deliver("late");
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(client.current_state(), frozen);
    assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_after_dispose_is_inert() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));

    client.dispose();
    client.start().await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(transport.total_calls(), 0);
    assert_eq!(client.connection_status(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_drop_disposes_the_instance() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));

    client.start().await;
    settle().await;
    drop(client);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(transport.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_signals_reach_the_supervisor() {
    let transport = CountingTransport::new();
    let (client, _metrics) = client_for(Arc::clone(&transport));

    client.start().await;
    settle().await;
    transport.deliver("pushed");
    settle().await;
    assert_eq!(client.connection_status(), ConnectionState::Connected);

    client.handle_connectivity_change(false);
    settle().await;
    assert_eq!(client.connection_status(), ConnectionState::Disconnected);

    client.handle_connectivity_change(true);
    settle().await;
    assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 2);

    transport.deliver("restored");
    settle().await;
    assert_eq!(client.connection_status(), ConnectionState::Connected);
}
