//! # Queue-Sync Core
//!
//! Core domain types for the queue synchronization client.
//!
//! This crate contains the shared vocabulary of the system: the identifier
//! pair that names a queue, the snapshot model delivered by the remote
//! service, connection states, reconnect policy, telemetry recording, and
//! client configuration.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Domain types carry their own validation and classification logic
//! - Observability is abstracted behind the [`SyncMetrics`] trait
//! - No networking or runtime concerns live in this crate
//!
//! ## Usage
//!
//! ```rust
//! use queue_sync_core::{QueueIdentity, ConnectionState};
//!
//! let identity = QueueIdentity::new("member-42", "event-2025");
//! assert!(identity.validate().is_ok());
//! assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// Re-export commonly used types
pub use uuid::Uuid;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// The identifier pair naming exactly one remotely-managed queue.
///
/// `subject_id` identifies the participant whose view this is; `parent_id`
/// identifies the queue-owning aggregate. Both are opaque strings owned by
/// the remote service.
///
/// Construction never fails: an invalid pair must still be representable so
/// that lifecycle operations can refuse it with zero network traffic.
/// Callers re-validate with [`QueueIdentity::validate`] at every use site,
/// not just once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueIdentity {
    /// Identifier of the observing participant
    pub subject_id: String,
    /// Identifier of the queue-owning aggregate
    pub parent_id: String,
}

impl QueueIdentity {
    /// Create a new identifier pair without validating it
    pub fn new(subject_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            parent_id: parent_id.into(),
        }
    }

    /// Check that both identifiers are present and non-blank
    ///
    /// Whitespace-only values count as absent. Returns the first failing
    /// field so callers can surface a precise configuration error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "subject_id".to_string(),
            });
        }

        if self.parent_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "parent_id".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for QueueIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent_id, self.subject_id)
    }
}

/// Unique identifier for one client instance
///
/// Used as a structured-logging field so log lines from concurrently running
/// instances can be told apart. A new instance (after disposal or an
/// identifier change) always gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientInstanceId(Uuid);

impl ClientInstanceId {
    /// Generate a new unique instance ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get string representation of the instance ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ClientInstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Connection State
// ============================================================================

/// Externally observable connection status of a client instance.
///
/// Exactly one value holds at any time. `Disconnected` covers both "never
/// started" and "gave up on push permanently"; when the polling loop is the
/// active transport the status still reads `Connected` once data flows, so
/// callers never learn which delivery path is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// A push connection attempt is in flight
    Connecting,
    /// Data is being delivered (by either transport path)
    Connected,
    /// Not started, offline, or permanently downgraded
    Disconnected,
    /// The last operation failed; recovery may be in progress
    Error,
}

impl ConnectionState {
    /// Get string representation of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "connecting" => Ok(ConnectionState::Connecting),
            "connected" => Ok(ConnectionState::Connected),
            "disconnected" => Ok(ConnectionState::Disconnected),
            "error" => Ok(ConnectionState::Error),
            _ => Err(ParseError::InvalidFormat {
                expected: "connecting|connected|disconnected|error".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Timestamp
// ============================================================================

/// UTC timestamp with RFC 3339 serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse from an RFC 3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC 3339 timestamp".to_string(),
                actual: s.to_string(),
            })
    }

    /// Format as an RFC 3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Access the underlying `DateTime<Utc>`
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Duration elapsed since an earlier timestamp
    ///
    /// Returns zero when `earlier` is not actually earlier.
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        (self.0 - earlier.0).to_std().unwrap_or(Duration::ZERO)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

// ============================================================================
// Error Classification
// ============================================================================

/// Classification of errors by recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Temporary failure; retrying under backoff may succeed
    Transient,
    /// The operation can never succeed in the current deployment
    Permanent,
    /// The caller supplied invalid input; retrying cannot help
    Configuration,
}

impl ErrorCategory {
    /// Get string representation of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Validation and Parse Errors
// ============================================================================

/// Validation errors for domain values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// A required field is missing or blank
    #[error("Required field missing: {field}")]
    Required { field: String },

    /// A numeric field is outside its allowed range
    #[error("Field {field} out of range: {message}")]
    OutOfRange { field: String, message: String },

    /// A field has the wrong shape
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Errors produced when parsing string representations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input did not match the expected format
    #[error("Invalid format: expected {expected}, got {actual}")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Modules
// ============================================================================

/// Client configuration structures
pub mod config;
/// Reconnect backoff policy
pub mod policy;
/// Queue snapshot model
pub mod snapshot;
/// Telemetry recording
pub mod telemetry;

// Re-export primary types at the crate root
pub use config::{PollingConfig, ProbeConfig, ReconnectConfig, SyncClientConfig};
pub use policy::{ReconnectPolicy, ReconnectState};
pub use snapshot::{QueueEntry, QueueSnapshot, SnapshotPayload};
pub use telemetry::{InMemoryMetrics, MetricsSnapshot, NoOpMetrics, SyncMetrics};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
