//! Client composition root.
//!
//! [`QueueSyncClient`] wires one identifier pair to one transport and owns
//! the full delivery machinery for that pairing: the capability probe, the
//! push supervisor, and the polling fallback, all feeding one reactive
//! state value. An instance is single-use; changing identifiers means
//! disposing the instance and creating a fresh one.

use crate::error::SyncError;
use crate::polling::PollingFallback;
use crate::probe::CapabilityProbe;
use crate::state::{SyncState, SyncStateCell};
use crate::supervisor::ConnectionSupervisor;
use queue_sync_core::{
    ClientInstanceId, ConnectionState, NoOpMetrics, QueueIdentity, ReconnectPolicy,
    SyncClientConfig, SyncMetrics,
};
use queue_sync_transport::{CapabilityReport, QueueTransport, TransportType};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Synchronizes one remotely-managed queue into a reactive local state.
///
/// # Example
///
/// ```rust,no_run
/// use queue_sync_client::QueueSyncClient;
/// use queue_sync_core::QueueIdentity;
/// use queue_sync_transport::MemoryTransport;
/// use std::sync::Arc;
///
/// # async fn run() {
/// let identity = QueueIdentity::new("user-1", "event-2025");
/// let client = QueueSyncClient::with_defaults(identity, Arc::new(MemoryTransport::new()));
///
/// let mut updates = client.subscribe();
/// client.start().await;
///
/// while updates.changed().await.is_ok() {
///     let state = updates.borrow().clone();
///     println!("{:?}: {} entries", state.connection_status,
///         state.snapshot.map(|s| s.len()).unwrap_or(0));
/// }
/// # }
/// ```
pub struct QueueSyncClient {
    identity: QueueIdentity,
    instance_id: ClientInstanceId,
    transport: Arc<dyn QueueTransport>,
    state: Arc<SyncStateCell>,
    probe: Arc<CapabilityProbe>,
    polling: Arc<PollingFallback>,
    supervisor: Arc<ConnectionSupervisor>,
}

impl QueueSyncClient {
    /// Create a client from configuration and a metrics sink
    pub fn new(
        identity: QueueIdentity,
        transport: Arc<dyn QueueTransport>,
        config: SyncClientConfig,
        metrics: Arc<dyn SyncMetrics>,
    ) -> Self {
        let instance_id = ClientInstanceId::new();
        let state = Arc::new(SyncStateCell::new());

        let probe = Arc::new(CapabilityProbe::from_config(transport.clone(), &config.probe));
        let polling = Arc::new(PollingFallback::from_config(
            identity.clone(),
            transport.clone(),
            Arc::clone(&state),
            instance_id,
            &config.polling,
        ));
        let supervisor = Arc::new(ConnectionSupervisor::new(
            identity.clone(),
            transport.clone(),
            Arc::clone(&state),
            metrics,
            Arc::clone(&probe),
            Arc::clone(&polling),
            ReconnectPolicy::from_config(&config.reconnect),
            instance_id,
        ));

        debug!(
            instance_id = %instance_id,
            parent_id = %identity.parent_id,
            transport = %transport.transport_type(),
            "created sync client instance"
        );

        Self {
            identity,
            instance_id,
            transport,
            state,
            probe,
            polling,
            supervisor,
        }
    }

    /// Create a client with default configuration and no metrics
    pub fn with_defaults(identity: QueueIdentity, transport: Arc<dyn QueueTransport>) -> Self {
        Self::new(
            identity,
            transport,
            SyncClientConfig::default(),
            Arc::new(NoOpMetrics::new()),
        )
    }

    /// Start synchronizing.
    ///
    /// Identifiers are validated before anything else; an invalid pair
    /// surfaces as a configuration error with zero transport traffic, the
    /// capability probe included. Otherwise the probe's verdict picks the
    /// delivery path: push when subscriptions are available, the polling
    /// fallback when they are not.
    ///
    /// Calling again re-runs the decision and supersedes any push attempt
    /// still in flight.
    pub async fn start(&self) {
        if self.supervisor.is_disposed() {
            debug!(instance_id = %self.instance_id, "client disposed; ignoring start");
            return;
        }

        if let Err(validation) = self.identity.validate() {
            warn!(
                instance_id = %self.instance_id,
                error = %validation,
                "refusing to start with invalid identifiers"
            );
            self.state
                .record_error(SyncError::from(validation), Some(ConnectionState::Disconnected));
            return;
        }

        self.probe.probe().await;
        self.supervisor.connect();
    }

    /// Register an observer for state updates
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Snapshot of the current sync state
    pub fn current_state(&self) -> SyncState {
        self.state.current()
    }

    /// Current connection status
    pub fn connection_status(&self) -> ConnectionState {
        self.state.status()
    }

    /// The identifier pair this instance synchronizes
    pub fn identity(&self) -> &QueueIdentity {
        &self.identity
    }

    /// Unique id of this client instance
    pub fn instance_id(&self) -> ClientInstanceId {
        self.instance_id
    }

    /// Which transport implementation this client drives
    pub fn transport_type(&self) -> TransportType {
        self.transport.transport_type()
    }

    /// Latest capability report, if the backend has been probed
    pub fn capabilities(&self) -> Option<CapabilityReport> {
        self.probe.last_report()
    }

    /// Probe the backend again and return the fresh report.
    ///
    /// Useful after a deploy or an incident; the refreshed report takes
    /// effect on the next connect decision.
    pub async fn revalidate_capabilities(&self) -> CapabilityReport {
        self.probe.revalidate().await
    }

    /// Forward a connectivity signal from the host environment
    pub fn handle_connectivity_change(&self, online: bool) {
        self.supervisor.handle_connectivity_change(online);
    }

    /// Stop all synchronization activity.
    ///
    /// Synchronous and idempotent. After disposal no further state updates
    /// happen; the instance cannot be restarted.
    pub fn dispose(&self) {
        self.supervisor.teardown();
        self.polling.stop();
        debug!(instance_id = %self.instance_id, "sync client disposed");
    }
}

impl Drop for QueueSyncClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for QueueSyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueSyncClient")
            .field("identity", &self.identity)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
