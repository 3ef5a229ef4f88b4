//! Push connection supervision with bounded retry and permanent downgrade.
//!
//! The supervisor owns the push side of delivery: it opens subscriptions,
//! watches them for payloads and errors, and retries failed attempts on the
//! reconnect policy's backoff schedule. When the consecutive-failure budget
//! is spent the supervisor abandons push for the remainder of the instance
//! and hands delivery to the polling fallback.
//!
//! Every attempt runs under a generation number. Reconnects, connectivity
//! changes, and teardown bump the generation, so a superseded attempt that
//! is still unwinding can no longer mutate shared state.

use crate::error::SyncError;
use crate::polling::PollingFallback;
use crate::probe::CapabilityProbe;
use crate::state::SyncStateCell;
use queue_sync_core::{
    ClientInstanceId, ConnectionState, QueueIdentity, QueueSnapshot, ReconnectPolicy,
    ReconnectState, SyncMetrics,
};
use queue_sync_transport::{QueueTransport, SubscriptionEvent, TransportError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

// ============================================================================
// Internal State
// ============================================================================

/// Supervisor state protected by the mutex
#[derive(Debug)]
struct SupervisorInner {
    /// Consecutive-failure tracking for the retry schedule
    reconnect: ReconnectState,

    /// Set once push is abandoned for the life of this instance
    permanently_downgraded: bool,

    /// Set by teardown; nothing may start afterwards
    disposed: bool,

    /// Last connectivity signal from the host, assumed online initially
    network_online: bool,

    /// Running subscription attempt, if any
    attempt_task: Option<JoinHandle<()>>,

    /// Pending retry timer, if any
    retry_timer: Option<JoinHandle<()>>,

    /// When the current attempt started, for connection-latency telemetry
    attempt_started: Option<Instant>,
}

impl SupervisorInner {
    fn new() -> Self {
        Self {
            reconnect: ReconnectState::new(),
            permanently_downgraded: false,
            disposed: false,
            network_online: true,
            attempt_task: None,
            retry_timer: None,
            attempt_started: None,
        }
    }

    /// Abort any in-flight attempt and pending retry timer.
    ///
    /// Dropping the attempt future also drops its subscription, which
    /// signals the transport to release the remote registration.
    fn abort_tasks(&mut self) {
        if let Some(task) = self.attempt_task.take() {
            task.abort();
        }
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
        self.attempt_started = None;
    }
}

// ============================================================================
// Connection Supervisor
// ============================================================================

/// Supervises the push connection lifecycle for one client instance.
pub struct ConnectionSupervisor {
    identity: QueueIdentity,
    transport: Arc<dyn QueueTransport>,
    state: Arc<SyncStateCell>,
    metrics: Arc<dyn SyncMetrics>,
    probe: Arc<CapabilityProbe>,
    polling: Arc<PollingFallback>,
    policy: ReconnectPolicy,
    instance_id: ClientInstanceId,
    generation: AtomicU64,
    inner: Mutex<SupervisorInner>,
}

impl ConnectionSupervisor {
    /// Create a supervisor wired to its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: QueueIdentity,
        transport: Arc<dyn QueueTransport>,
        state: Arc<SyncStateCell>,
        metrics: Arc<dyn SyncMetrics>,
        probe: Arc<CapabilityProbe>,
        polling: Arc<PollingFallback>,
        policy: ReconnectPolicy,
        instance_id: ClientInstanceId,
    ) -> Self {
        Self {
            identity,
            transport,
            state,
            metrics,
            probe,
            polling,
            policy,
            instance_id,
            generation: AtomicU64::new(0),
            inner: Mutex::new(SupervisorInner::new()),
        }
    }

    /// Begin (or re-begin) a push connection attempt.
    ///
    /// No-ops after teardown. Identifiers are re-validated here, so an
    /// invalid pair is refused with zero network traffic. When push is
    /// unavailable, either by probe verdict or by permanent downgrade,
    /// delivery goes to the polling fallback instead.
    pub fn connect(self: &Arc<Self>) {
        let mut inner = self.lock_inner();

        if inner.disposed {
            debug!(instance_id = %self.instance_id, "supervisor disposed; ignoring connect");
            return;
        }

        if inner.permanently_downgraded {
            debug!(
                instance_id = %self.instance_id,
                "push abandoned for this instance; polling owns delivery"
            );
            drop(inner);
            self.polling.start();
            return;
        }

        if let Err(validation) = self.identity.validate() {
            warn!(
                instance_id = %self.instance_id,
                error = %validation,
                "refusing to connect with invalid identifiers"
            );
            drop(inner);
            self.state
                .record_error(SyncError::from(validation), Some(ConnectionState::Disconnected));
            return;
        }

        if !inner.network_online {
            debug!(
                instance_id = %self.instance_id,
                "offline; polling until connectivity returns"
            );
            drop(inner);
            self.polling.start();
            return;
        }

        let subscriptions_available = self
            .probe
            .last_report()
            .map(|report| report.subscriptions_available)
            .unwrap_or(false);
        if !subscriptions_available {
            info!(
                instance_id = %self.instance_id,
                "push not available on this backend; using polling fallback"
            );
            let first_activation = !self.polling.is_running();
            drop(inner);
            if first_activation {
                self.metrics.record_fallback_activated();
            }
            self.polling.start();
            return;
        }

        // A new attempt supersedes whatever is still in flight.
        inner.abort_tasks();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        inner.attempt_started = Some(Instant::now());
        drop(inner);

        // The metrics sink is caller-provided; never call it under the lock.
        self.metrics.record_connection_started();
        self.state.set_status(ConnectionState::Connecting);

        debug!(
            instance_id = %self.instance_id,
            parent_id = %self.identity.parent_id,
            generation,
            "opening push subscription"
        );

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            this.run_attempt(generation).await;
        });

        let mut inner = self.lock_inner();
        if inner.disposed {
            // Teardown won the race; the stale generation keeps the task
            // from touching shared state either way.
            handle.abort();
        } else {
            inner.attempt_task = Some(handle);
        }
    }

    /// Tear the supervisor down.
    ///
    /// Synchronous and idempotent. Aborts the in-flight attempt and any
    /// pending retry timer; no state updates happen afterwards.
    pub fn teardown(&self) {
        let mut inner = self.lock_inner();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        self.generation.fetch_add(1, Ordering::SeqCst);
        inner.abort_tasks();
        debug!(instance_id = %self.instance_id, "supervisor torn down");
    }

    /// React to a connectivity signal from the host.
    ///
    /// Going offline suspends push work without touching the polling loop
    /// or the retry budget already spent. Coming back online resets the
    /// budget and reconnects. Repeated signals in the same direction are
    /// ignored.
    pub fn handle_connectivity_change(self: &Arc<Self>, online: bool) {
        let mut inner = self.lock_inner();
        if inner.disposed || inner.network_online == online {
            return;
        }
        inner.network_online = online;

        if online {
            info!(instance_id = %self.instance_id, "network restored; reconnecting push");
            inner.reconnect.reset();
            drop(inner);
            self.connect();
        } else {
            info!(instance_id = %self.instance_id, "network lost; suspending push");
            self.generation.fetch_add(1, Ordering::SeqCst);
            inner.abort_tasks();
            drop(inner);
            if !self.polling.is_running() {
                self.state.set_status(ConnectionState::Disconnected);
            }
        }
    }

    /// Consecutive transport failures recorded since the last delivery
    pub fn consecutive_failures(&self) -> u32 {
        self.lock_inner().reconnect.failures()
    }

    /// Whether push has been abandoned for the life of this instance
    pub fn is_permanently_downgraded(&self) -> bool {
        self.lock_inner().permanently_downgraded
    }

    /// Whether teardown has run
    pub fn is_disposed(&self) -> bool {
        self.lock_inner().disposed
    }

    // ------------------------------------------------------------------
    // Attempt lifecycle
    // ------------------------------------------------------------------

    async fn run_attempt(self: Arc<Self>, generation: u64) {
        let result = self.transport.subscribe(&self.identity.parent_id).await;
        if self.is_stale(generation) {
            debug!(instance_id = %self.instance_id, generation, "attempt superseded");
            return;
        }

        let mut subscription = match result {
            Ok(subscription) => subscription,
            Err(e) if e.is_transient() => {
                warn!(
                    instance_id = %self.instance_id,
                    error = %e,
                    "subscription attempt failed"
                );
                self.state
                    .record_error(SyncError::from(e), Some(ConnectionState::Error));
                self.schedule_retry(generation);
                return;
            }
            Err(e) => {
                error!(
                    instance_id = %self.instance_id,
                    error = %e,
                    "push rejected permanently"
                );
                self.state
                    .record_error(SyncError::from(e), Some(ConnectionState::Error));
                self.downgrade_to_polling();
                return;
            }
        };

        loop {
            let event = subscription.next_event().await;
            if self.is_stale(generation) {
                return;
            }

            match event {
                Some(SubscriptionEvent::Payload(payload)) => {
                    let snapshot = QueueSnapshot::from_payload(&self.identity, payload);
                    self.on_delivery(snapshot);
                }
                Some(SubscriptionEvent::Error(e)) => {
                    warn!(
                        instance_id = %self.instance_id,
                        error = %e,
                        "push subscription reported an error"
                    );
                    self.state
                        .record_error(SyncError::from(e), Some(ConnectionState::Error));
                    self.schedule_retry(generation);
                    return;
                }
                None => {
                    warn!(instance_id = %self.instance_id, "push subscription stream ended");
                    let error = TransportError::ConnectionFailed {
                        message: "subscription stream ended".to_string(),
                    };
                    self.state
                        .record_error(SyncError::from(error), Some(ConnectionState::Error));
                    self.schedule_retry(generation);
                    return;
                }
            }
        }
    }

    /// Handle one delivered payload.
    ///
    /// The first delivery of an attempt completes the handshake: it stops
    /// any fallback polling, clears the failure budget, and records how
    /// long the connection took to establish.
    fn on_delivery(&self, snapshot: QueueSnapshot) {
        let established = {
            let mut inner = self.lock_inner();
            if inner.disposed {
                return;
            }
            inner.reconnect.reset();
            inner.attempt_started.take().map(|started| started.elapsed())
        };

        if let Some(elapsed) = established {
            info!(
                instance_id = %self.instance_id,
                elapsed = ?elapsed,
                "push connection established"
            );
            self.metrics.record_connection_established(elapsed);
        }

        self.polling.stop();
        self.metrics.record_notification_delivered();
        self.state.record_delivery(snapshot);
    }

    /// Record a failure and either schedule a retry or downgrade for good.
    fn schedule_retry(self: &Arc<Self>, generation: u64) {
        let mut inner = self.lock_inner();
        if inner.disposed || self.is_stale(generation) {
            return;
        }

        let failures = inner.reconnect.record_failure();
        if inner.reconnect.is_exhausted(&self.policy) {
            warn!(
                instance_id = %self.instance_id,
                failures,
                "retry budget exhausted; abandoning push for this instance"
            );
            drop(inner);
            self.downgrade_to_polling();
            return;
        }

        let delay = inner.reconnect.next_delay(&self.policy);
        info!(
            instance_id = %self.instance_id,
            failures,
            delay = ?delay,
            "scheduling push reconnect"
        );

        let this = Arc::clone(self);
        inner.retry_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if this.is_stale(generation) {
                return;
            }
            this.connect();
        }));
    }

    /// Abandon push and hand delivery to the polling loop.
    ///
    /// The downgrade is permanent: it holds until this instance is
    /// disposed, across connectivity changes included. Status reads
    /// disconnected until the first successful poll.
    fn downgrade_to_polling(self: &Arc<Self>) {
        {
            let mut inner = self.lock_inner();
            if inner.disposed || inner.permanently_downgraded {
                return;
            }
            inner.permanently_downgraded = true;
            inner.attempt_started = None;
        }

        info!(
            instance_id = %self.instance_id,
            parent_id = %self.identity.parent_id,
            "downgrading to polling for the remainder of this instance"
        );
        self.metrics.record_fallback_activated();
        self.state.set_status(ConnectionState::Disconnected);
        self.polling.start();
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn lock_inner(&self) -> MutexGuard<'_, SupervisorInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("identity", &self.identity)
            .field("instance_id", &self.instance_id)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
