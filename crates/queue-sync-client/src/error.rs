//! Error types surfaced through the reactive sync state.

use queue_sync_core::{ErrorCategory, ValidationError};
use queue_sync_transport::TransportError;
use thiserror::Error;

/// Error recorded in the shared sync state.
///
/// Cloneable so the most recent failure can travel inside state updates
/// without being consumed by the first observer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Client-side input was rejected before any network traffic
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ValidationError),

    /// The transport reported a failure
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl SyncError {
    /// Whether retrying the failed operation could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::Transport(e) => e.is_transient(),
        }
    }

    /// Coarse classification for logging and retry decisions
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Transport(e) => e.error_category(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
