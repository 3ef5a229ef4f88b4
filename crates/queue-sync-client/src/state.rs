//! Shared reactive state for a sync client instance.
//!
//! Observers watch a single value that always holds the latest snapshot,
//! connection status, and error. Intermediate versions are not queued;
//! a slow observer simply sees the newest state on its next read.

use crate::error::SyncError;
use queue_sync_core::{ConnectionState, QueueSnapshot};
use tokio::sync::watch;

/// Observable state of one sync client instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Most recent queue snapshot, absent until the first delivery
    pub snapshot: Option<QueueSnapshot>,

    /// Current connection lifecycle state
    pub connection_status: ConnectionState,

    /// Most recent failure, cleared by the next successful delivery
    pub last_error: Option<SyncError>,
}

impl SyncState {
    /// Whether any snapshot has been delivered yet
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Writer handle over the observable state.
///
/// Related fields always change inside a single update so observers never
/// see a connected status paired with a stale error.
#[derive(Debug)]
pub struct SyncStateCell {
    sender: watch::Sender<SyncState>,
}

impl SyncStateCell {
    /// Create a cell in the initial disconnected state
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SyncState::default());
        Self { sender }
    }

    /// Register a new observer for state updates
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.sender.subscribe()
    }

    /// Snapshot of the current state
    pub fn current(&self) -> SyncState {
        self.sender.borrow().clone()
    }

    /// Current connection status without cloning the whole state
    pub fn status(&self) -> ConnectionState {
        self.sender.borrow().connection_status
    }

    /// Update the connection status, notifying observers only on change
    pub fn set_status(&self, status: ConnectionState) {
        self.sender.send_if_modified(|state| {
            if state.connection_status == status {
                false
            } else {
                state.connection_status = status;
                true
            }
        });
    }

    /// Record a successful delivery.
    ///
    /// Stores the snapshot, marks the connection as established, and clears
    /// any previous error in one observer notification.
    pub fn record_delivery(&self, snapshot: QueueSnapshot) {
        self.sender.send_modify(|state| {
            state.snapshot = Some(snapshot);
            state.connection_status = ConnectionState::Connected;
            state.last_error = None;
        });
    }

    /// Record a failure, optionally moving the connection status with it.
    ///
    /// Passing `None` keeps the current status, which lets transient polling
    /// errors surface without tearing down an otherwise healthy loop.
    pub fn record_error(&self, error: SyncError, status: Option<ConnectionState>) {
        self.sender.send_modify(|state| {
            state.last_error = Some(error);
            if let Some(status) = status {
                state.connection_status = status;
            }
        });
    }
}

impl Default for SyncStateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
