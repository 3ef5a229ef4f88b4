//! Error types for transport operations.

use queue_sync_core::ErrorCategory;
use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all transport operations
///
/// The enum is `Clone` because errors travel inside the shared state slot
/// observed by callers; wrapped foreign errors are therefore carried as
/// rendered messages rather than source values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Queue not found for parent: {parent_id}")]
    QueueNotFound { parent_id: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Service error (status {status}): {message}")]
    ServiceError { status: u16, message: String },

    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("Feature not provisioned: {message}")]
    FeatureUnavailable { message: String },

    #[error("Push delivery not supported by the {transport} transport")]
    PushUnsupported { transport: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Invalid endpoint: {message}")]
    InvalidEndpoint { message: String },
}

impl TransportError {
    /// Check if the error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false,
            Self::Timeout { .. } => true,
            Self::ConnectionFailed { .. } => true,
            Self::ServiceError { status, .. } => *status >= 500,
            Self::SchemaMismatch { .. } => false,
            Self::FeatureUnavailable { .. } => false,
            Self::PushUnsupported { .. } => false,
            Self::Serialization { .. } => false,
            Self::InvalidEndpoint { .. } => false,
        }
    }

    /// Classify the error by recovery policy
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::InvalidEndpoint { .. } => ErrorCategory::Configuration,
            _ if self.is_transient() => ErrorCategory::Transient,
            _ => ErrorCategory::Permanent,
        }
    }

    /// Get suggested retry delay for transient errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Timeout { .. } => Some(Duration::from_secs(1)),
            Self::ConnectionFailed { .. } => Some(Duration::from_secs(5)),
            Self::ServiceError { status, .. } if *status >= 500 => Some(Duration::from_secs(5)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Map a remote error message onto the permanent error classes queue
/// backends are known to emit.
///
/// Partially provisioned backends answer with resolver and schema errors in
/// the message text rather than a usable status code. `Cannot return null`
/// and `resolver` mean the queried feature exists in the schema but was
/// never wired up; `FieldUndefined` and `Validation error` mean the deployed
/// schema does not match this client. Returns `None` for anything that does
/// not match a known permanent pattern.
pub fn classify_remote_message(message: &str) -> Option<TransportError> {
    if message.contains("Cannot return null") || message.contains("resolver") {
        return Some(TransportError::FeatureUnavailable {
            message: message.to_string(),
        });
    }

    if message.contains("FieldUndefined") || message.contains("Validation error") {
        return Some(TransportError::SchemaMismatch {
            message: message.to_string(),
        });
    }

    None
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
