//! # Queue-Sync Transport
//!
//! Network contract and transport providers for the queue synchronization
//! client.
//!
//! This library provides:
//! - The provider-agnostic [`QueueTransport`] trait: one pull operation, one
//!   push subscription, one capability probe
//! - A transport error taxonomy with transient/permanent classification
//! - An in-memory provider for tests and demos
//! - An HTTP pull-only provider (feature `http`, enabled by default)
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all transport operations
//! - [`client`] - The transport trait, subscriptions, and capability reports
//! - [`providers`] - Concrete transport implementations

// Module declarations
pub mod client;
pub mod error;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use client::{
    CapabilityReport, PushSubscription, QueueTransport, SubscriptionEvent, TransportType,
};
pub use error::TransportError;
pub use providers::MemoryTransport;
#[cfg(feature = "http")]
pub use providers::HttpTransport;
