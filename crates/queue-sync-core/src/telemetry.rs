//! # Telemetry Recording
//!
//! Connection-quality metrics for the synchronization client.
//!
//! # Architecture
//!
//! Metrics collection follows a best-effort pattern:
//! - The sink is injected behind the [`SyncMetrics`] trait, never a global
//! - Recording never fails and never blocks business logic
//! - Counters are atomic, so concurrent instances can share one recorder
//!
//! # Examples
//!
//! ```rust
//! use queue_sync_core::telemetry::{InMemoryMetrics, SyncMetrics};
//! use std::time::Duration;
//!
//! let metrics = InMemoryMetrics::new();
//! metrics.record_connection_started();
//! metrics.record_connection_established(Duration::from_millis(120));
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.connection_successes, 1);
//! assert_eq!(snapshot.average_reconnect_ms, 120.0);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trait for recording synchronization metrics.
///
/// Implementations must be cheap and infallible: recorders are called from
/// the hot paths of the connection supervisor and polling loop, and a
/// misbehaving sink must never be able to break synchronization.
#[async_trait]
pub trait SyncMetrics: Send + Sync {
    /// Record that a push connection attempt has started.
    ///
    /// # Metrics Updated
    ///
    /// - Connection attempt count
    fn record_connection_started(&self);

    /// Record that a push attempt delivered its first message.
    ///
    /// # Parameters
    ///
    /// - `elapsed`: Time from the start of the attempt to first delivery
    ///
    /// # Metrics Updated
    ///
    /// - Connection success count
    /// - Reconnect latency running average
    fn record_connection_established(&self, elapsed: Duration);

    /// Record a switch to the polling fallback.
    ///
    /// Covers both the permanent downgrade after exhausted retries and the
    /// capability-driven case where push was never viable.
    ///
    /// # Metrics Updated
    ///
    /// - Fallback activation count
    fn record_fallback_activated(&self);

    /// Record that a notification was sent to a participant.
    ///
    /// # Metrics Updated
    ///
    /// - Notification sent count (denominator of the delivery rate)
    fn record_notification_sent(&self);

    /// Record that a sent notification was confirmed delivered.
    ///
    /// # Metrics Updated
    ///
    /// - Notification delivered count (numerator of the delivery rate)
    fn record_notification_delivered(&self);

    /// Get a point-in-time copy of all recorded values
    fn snapshot(&self) -> MetricsSnapshot;

    /// Reset every recorded value to zero
    fn reset(&self);
}

/// Point-in-time copy of the recorded metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Push connection attempts started
    pub connection_attempts: u64,

    /// Push attempts that delivered at least one message
    pub connection_successes: u64,

    /// Running average of time-to-first-delivery, in milliseconds
    pub average_reconnect_ms: f64,

    /// Times the client switched to the polling fallback
    pub fallback_activations: u64,

    /// Notifications handed to the delivery pipeline
    pub notifications_sent: u64,

    /// Notifications confirmed delivered
    pub notifications_delivered: u64,

    /// Delivered / sent, or 0.0 when nothing was sent
    pub notification_delivery_rate: f64,
}

/// Process-local metrics recorder on atomic counters.
///
/// The running average is held as a sum and a count; the quotient reported
/// by [`SyncMetrics::snapshot`] equals the incremental running-average
/// update applied sample by sample.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    connection_attempts: AtomicU64,
    connection_successes: AtomicU64,
    total_reconnect_millis: AtomicU64,
    fallback_activations: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_delivered: AtomicU64,
}

impl InMemoryMetrics {
    /// Create a recorder with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncMetrics for InMemoryMetrics {
    fn record_connection_started(&self) {
        self.connection_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_connection_established(&self, elapsed: Duration) {
        self.connection_successes.fetch_add(1, Ordering::Relaxed);
        self.total_reconnect_millis
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    fn record_fallback_activated(&self) {
        self.fallback_activations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    fn record_notification_delivered(&self) {
        self.notifications_delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let attempts = self.connection_attempts.load(Ordering::Relaxed);
        let successes = self.connection_successes.load(Ordering::Relaxed);
        let total_millis = self.total_reconnect_millis.load(Ordering::Relaxed);
        let sent = self.notifications_sent.load(Ordering::Relaxed);
        let delivered = self.notifications_delivered.load(Ordering::Relaxed);

        let average_reconnect_ms = if successes > 0 {
            total_millis as f64 / successes as f64
        } else {
            0.0
        };

        let notification_delivery_rate = if sent > 0 {
            delivered as f64 / sent as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            connection_attempts: attempts,
            connection_successes: successes,
            average_reconnect_ms,
            fallback_activations: self.fallback_activations.load(Ordering::Relaxed),
            notifications_sent: sent,
            notifications_delivered: delivered,
            notification_delivery_rate,
        }
    }

    fn reset(&self) {
        self.connection_attempts.store(0, Ordering::Relaxed);
        self.connection_successes.store(0, Ordering::Relaxed);
        self.total_reconnect_millis.store(0, Ordering::Relaxed);
        self.fallback_activations.store(0, Ordering::Relaxed);
        self.notifications_sent.store(0, Ordering::Relaxed);
        self.notifications_delivered.store(0, Ordering::Relaxed);
    }
}

/// No-op metrics recorder for testing and embedding scenarios that do not
/// need telemetry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl NoOpMetrics {
    /// Create a new no-op recorder
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SyncMetrics for NoOpMetrics {
    fn record_connection_started(&self) {
        // No-op
    }

    fn record_connection_established(&self, _elapsed: Duration) {
        // No-op
    }

    fn record_fallback_activated(&self) {
        // No-op
    }

    fn record_notification_sent(&self) {
        // No-op
    }

    fn record_notification_delivered(&self) {
        // No-op
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::default()
    }

    fn reset(&self) {
        // No-op
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
