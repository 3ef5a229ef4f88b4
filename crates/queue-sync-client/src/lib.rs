//! # Queue-Sync Client
//!
//! Client-side synchronization engine for remotely-managed queues. One
//! [`QueueSyncClient`] instance binds an identifier pair to a transport and
//! keeps a reactive [`SyncState`] current through whichever delivery path
//! the backend can sustain.
//!
//! ## Architecture
//!
//! - **Capability probe**: asks the backend what it supports before any
//!   channel is committed to. Failures degrade instead of erroring, with
//!   push withheld and mutations assumed available.
//! - **Connection supervisor**: owns the push subscription lifecycle,
//!   retries failures on a bounded backoff schedule, and abandons push for
//!   the instance's lifetime once the failure budget is spent.
//! - **Polling fallback**: pull-based delivery loop used whenever push is
//!   unavailable, with skip-on-miss cadence and permanent-failure latching.
//! - **Sync state**: a single watched value carrying the latest snapshot,
//!   connection status, and error.
//!
//! Delivery is exclusive: the first push delivery stops any fallback
//! polling, and a permanent downgrade hands the loop ownership back.
//!
//! ## Usage
//!
//! ```rust
//! use queue_sync_client::QueueSyncClient;
//! use queue_sync_core::QueueIdentity;
//! use queue_sync_transport::MemoryTransport;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = Arc::new(MemoryTransport::new());
//! let identity = QueueIdentity::new("user-1", "event-2025");
//!
//! let client = QueueSyncClient::with_defaults(identity, transport);
//! client.start().await;
//! client.dispose();
//! # }
//! ```

/// Client composition root
pub mod client;
/// Sync error classification
pub mod error;
/// Pull-based fallback delivery
pub mod polling;
/// Backend capability probing
pub mod probe;
/// Shared reactive state
pub mod state;
/// Push connection supervision
pub mod supervisor;

// Re-export primary types at the crate root
pub use client::QueueSyncClient;
pub use error::SyncError;
pub use polling::PollingFallback;
pub use probe::CapabilityProbe;
pub use state::{SyncState, SyncStateCell};
pub use supervisor::ConnectionSupervisor;
