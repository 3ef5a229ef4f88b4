//! Configuration types for the synchronization client

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SyncClientConfig {
    /// Push reconnection settings
    pub reconnect: ReconnectConfig,

    /// Polling fallback settings
    pub polling: PollingConfig,

    /// Capability probe settings
    pub probe: ProbeConfig,
}

impl SyncClientConfig {
    /// Check that every section holds workable values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.reconnect.validate()?;
        self.polling.validate()?;
        self.probe.validate()?;
        Ok(())
    }
}

/// Push reconnection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,

    /// Upper bound on any retry delay, in milliseconds
    pub max_delay_ms: u64,

    /// Consecutive failures tolerated before push is abandoned
    pub max_attempts: u32,

    /// Add random jitter to retry delays
    pub jitter_enabled: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            max_attempts: 5,
            jitter_enabled: false,
        }
    }
}

impl ReconnectConfig {
    /// Check that the backoff parameters are workable
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_delay_ms == 0 {
            return Err(ValidationError::OutOfRange {
                field: "reconnect.base_delay_ms".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(ValidationError::OutOfRange {
                field: "reconnect.max_delay_ms".to_string(),
                message: "must be at least base_delay_ms".to_string(),
            });
        }

        if self.max_attempts == 0 {
            return Err(ValidationError::OutOfRange {
                field: "reconnect.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Polling fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between polls; the first poll fires immediately
    pub interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
        }
    }
}

impl PollingConfig {
    /// Check that the polling cadence is workable
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_seconds == 0 {
            return Err(ValidationError::OutOfRange {
                field: "polling.interval_seconds".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Capability probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Hard timeout for the probe request, in seconds
    pub timeout_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_seconds: 5 }
    }
}

impl ProbeConfig {
    /// Check that the probe timeout is workable
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_seconds == 0 {
            return Err(ValidationError::OutOfRange {
                field: "probe.timeout_seconds".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
