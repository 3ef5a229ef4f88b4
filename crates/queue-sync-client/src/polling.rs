//! Pull-based fallback delivery loop.
//!
//! When push delivery is unavailable the client falls back to fetching the
//! queue payload on a fixed cadence. The loop polls immediately on start,
//! then on every interval tick. Missed ticks are skipped rather than
//! replayed, so a slow fetch never causes a burst of catch-up requests.
//!
//! Error handling is split by class: transient failures are recorded and the
//! loop keeps going, while schema and other permanent failures latch the
//! loop shut. A latched loop refuses to restart until a new client instance
//! is created, since retrying a structurally broken backend cannot succeed.

use crate::error::SyncError;
use crate::state::SyncStateCell;
use queue_sync_core::{
    ClientInstanceId, ConnectionState, PollingConfig, QueueIdentity, QueueSnapshot,
};
use queue_sync_transport::QueueTransport;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Default cadence between fallback polls
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// Internal State
// ============================================================================

/// Loop state protected by the fallback's mutex
#[derive(Debug)]
struct PollingInner {
    /// Handle of the running poll loop, if any
    task: Option<JoinHandle<()>>,

    /// Set when a permanent failure shut the loop for good
    permanently_failed: bool,
}

// ============================================================================
// Polling Fallback
// ============================================================================

/// Pull-based delivery loop used when push is unavailable.
pub struct PollingFallback {
    identity: QueueIdentity,
    transport: Arc<dyn QueueTransport>,
    state: Arc<SyncStateCell>,
    instance_id: ClientInstanceId,
    poll_interval: Duration,
    inner: Mutex<PollingInner>,
}

impl PollingFallback {
    /// Create a fallback loop with the default poll interval
    pub fn new(
        identity: QueueIdentity,
        transport: Arc<dyn QueueTransport>,
        state: Arc<SyncStateCell>,
        instance_id: ClientInstanceId,
    ) -> Self {
        Self::with_interval(identity, transport, state, instance_id, DEFAULT_POLL_INTERVAL)
    }

    /// Create a fallback loop with an explicit poll interval
    pub fn with_interval(
        identity: QueueIdentity,
        transport: Arc<dyn QueueTransport>,
        state: Arc<SyncStateCell>,
        instance_id: ClientInstanceId,
        poll_interval: Duration,
    ) -> Self {
        Self {
            identity,
            transport,
            state,
            instance_id,
            poll_interval,
            inner: Mutex::new(PollingInner {
                task: None,
                permanently_failed: false,
            }),
        }
    }

    /// Create a fallback loop from configuration
    pub fn from_config(
        identity: QueueIdentity,
        transport: Arc<dyn QueueTransport>,
        state: Arc<SyncStateCell>,
        instance_id: ClientInstanceId,
        config: &PollingConfig,
    ) -> Self {
        Self::with_interval(
            identity,
            transport,
            state,
            instance_id,
            Duration::from_secs(config.interval_seconds),
        )
    }

    /// Start the poll loop.
    ///
    /// Idempotent: calling while a loop is already running does nothing, and
    /// a loop latched shut by a permanent failure stays shut. Identifiers
    /// are re-validated here, so an invalid pair is refused with zero
    /// network traffic.
    pub fn start(self: &Arc<Self>) {
        let mut inner = self.lock_inner();

        if inner.permanently_failed {
            debug!(
                instance_id = %self.instance_id,
                "polling latched shut by a permanent failure; not restarting"
            );
            return;
        }

        if inner.task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!(instance_id = %self.instance_id, "polling already running");
            return;
        }

        if let Err(validation) = self.identity.validate() {
            warn!(
                instance_id = %self.instance_id,
                error = %validation,
                "refusing to poll with invalid identifiers"
            );
            self.state
                .record_error(SyncError::from(validation), Some(ConnectionState::Disconnected));
            return;
        }

        debug!(
            instance_id = %self.instance_id,
            parent_id = %self.identity.parent_id,
            interval = ?self.poll_interval,
            "starting polling fallback"
        );

        let this = Arc::clone(self);
        inner.task = Some(tokio::spawn(async move {
            this.run_loop().await;
        }));
    }

    /// Stop the poll loop.
    ///
    /// Idempotent and synchronous. Does not clear the permanent-failure
    /// latch; only a new instance can poll again after one.
    pub fn stop(&self) {
        let mut inner = self.lock_inner();
        if let Some(task) = inner.task.take() {
            task.abort();
            debug!(instance_id = %self.instance_id, "polling stopped");
        }
    }

    /// Whether a poll loop is currently running
    pub fn is_running(&self) -> bool {
        self.lock_inner()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Whether a permanent failure has latched the loop shut
    pub fn has_permanently_failed(&self) -> bool {
        self.lock_inner().permanently_failed
    }

    async fn run_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // First tick completes immediately, so the loop polls on start.
            ticker.tick().await;

            if let Err(validation) = self.identity.validate() {
                warn!(
                    instance_id = %self.instance_id,
                    error = %validation,
                    "identifiers no longer valid; stopping polling"
                );
                self.state.record_error(
                    SyncError::from(validation),
                    Some(ConnectionState::Disconnected),
                );
                return;
            }

            match self.transport.fetch_snapshot(&self.identity.parent_id).await {
                Ok(payload) => {
                    let snapshot = QueueSnapshot::from_payload(&self.identity, payload);
                    debug!(
                        instance_id = %self.instance_id,
                        entries = snapshot.len(),
                        "poll delivered a snapshot"
                    );
                    self.state.record_delivery(snapshot);
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        instance_id = %self.instance_id,
                        error = %e,
                        "transient poll failure; will retry on next tick"
                    );
                    self.state.record_error(SyncError::from(e), None);
                }
                Err(e) => {
                    error!(
                        instance_id = %self.instance_id,
                        error = %e,
                        "permanent poll failure; stopping polling for good"
                    );
                    self.state
                        .record_error(SyncError::from(e), Some(ConnectionState::Error));
                    self.lock_inner().permanently_failed = true;
                    return;
                }
            }
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, PollingInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for PollingFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingFallback")
            .field("identity", &self.identity)
            .field("instance_id", &self.instance_id)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "polling_tests.rs"]
mod tests;
