//! Transport provider implementations.
//!
//! This module contains concrete implementations of the `QueueTransport`
//! trait for different delivery backends.

pub mod memory;

#[cfg(feature = "http")]
pub mod http;

pub use memory::MemoryTransport;

#[cfg(feature = "http")]
pub use http::HttpTransport;
