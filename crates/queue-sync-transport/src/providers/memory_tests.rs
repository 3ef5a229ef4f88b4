//! Tests for the in-memory transport.

use super::*;
use crate::client::SubscriptionEvent;
use queue_sync_core::QueueEntry;
use std::time::Duration;

fn sample_payload(entry_id: &str) -> SnapshotPayload {
    SnapshotPayload::new(vec![QueueEntry::new(entry_id).with_position(1)])
}

#[tokio::test]
async fn test_fetch_unknown_parent_reads_empty() {
    let transport = MemoryTransport::new();

    let payload = transport.fetch_snapshot("event-2025").await.unwrap();

    assert!(payload.is_empty());
}

#[tokio::test]
async fn test_publish_then_fetch() {
    let transport = MemoryTransport::new();
    transport.publish("event-2025", sample_payload("entry-1"));

    let payload = transport.fetch_snapshot("event-2025").await.unwrap();

    assert_eq!(payload.len(), 1);
    assert_eq!(payload.ordered_entries[0].entry_id, "entry-1");
}

#[tokio::test]
async fn test_payloads_are_isolated_per_parent() {
    let transport = MemoryTransport::new();
    transport.publish("event-a", sample_payload("entry-a"));

    let other = transport.fetch_snapshot("event-b").await.unwrap();

    assert!(other.is_empty());
}

#[tokio::test]
async fn test_subscribe_replays_latest_payload() {
    let transport = MemoryTransport::new();
    transport.publish("event-2025", sample_payload("entry-1"));

    let mut subscription = transport.subscribe("event-2025").await.unwrap();

    let event = subscription.next_event().await.unwrap();
    assert!(
        matches!(event, SubscriptionEvent::Payload(ref p) if p.ordered_entries[0].entry_id == "entry-1")
    );
}

#[tokio::test]
async fn test_publish_fans_out_to_subscribers() {
    let transport = MemoryTransport::new();
    let mut subscription = transport.subscribe("event-2025").await.unwrap();

    transport.publish("event-2025", sample_payload("entry-7"));

    let event = subscription.next_event().await.unwrap();
    assert!(
        matches!(event, SubscriptionEvent::Payload(ref p) if p.ordered_entries[0].entry_id == "entry-7")
    );
}

#[tokio::test]
async fn test_emit_error_reaches_subscribers() {
    let transport = MemoryTransport::new();
    let mut subscription = transport.subscribe("event-2025").await.unwrap();

    transport.emit_error(
        "event-2025",
        TransportError::ConnectionFailed {
            message: "link dropped".to_string(),
        },
    );

    let event = subscription.next_event().await.unwrap();
    assert!(matches!(
        event,
        SubscriptionEvent::Error(TransportError::ConnectionFailed { .. })
    ));
}

#[tokio::test]
async fn test_close_subscriptions_ends_stream() {
    let transport = MemoryTransport::new();
    let mut subscription = transport.subscribe("event-2025").await.unwrap();

    transport.close_subscriptions("event-2025");

    assert!(subscription.next_event().await.is_none());
}

#[tokio::test]
async fn test_unsubscribe_removes_subscriber() {
    let transport = MemoryTransport::new();
    let mut subscription = transport.subscribe("event-2025").await.unwrap();
    assert_eq!(transport.subscriber_count("event-2025"), 1);

    subscription.unsubscribe();

    // Cleanup runs on a spawned task; give it a moment
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.subscriber_count("event-2025"), 0);
}

#[tokio::test]
async fn test_subscribe_rejected_when_push_disabled() {
    let transport = MemoryTransport::new();
    transport.set_capabilities(CapabilityReport::degraded(vec![
        "push disabled for maintenance".to_string(),
    ]));

    let result = transport.subscribe("event-2025").await;

    assert!(matches!(
        result,
        Err(TransportError::FeatureUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_probe_returns_configured_capabilities() {
    let transport = MemoryTransport::new();

    let report = transport.probe_capabilities().await.unwrap();
    assert!(report.is_fully_available());

    let degraded = CapabilityReport::degraded(vec!["offline".to_string()]);
    transport.set_capabilities(degraded.clone());

    assert_eq!(transport.probe_capabilities().await.unwrap(), degraded);
}

#[tokio::test]
async fn test_transport_identity() {
    let transport = MemoryTransport::new();

    assert_eq!(transport.transport_type(), TransportType::InMemory);
    assert!(transport.supports_push());
}

#[tokio::test]
async fn test_clones_share_state() {
    let service_side = MemoryTransport::new();
    let client_side = service_side.clone();

    service_side.publish("event-2025", sample_payload("entry-1"));

    let payload = client_side.fetch_snapshot("event-2025").await.unwrap();
    assert_eq!(payload.len(), 1);
}
