//! Capability probing with a hard timeout and degraded defaults.
//!
//! The probe asks the transport what the backend supports before the client
//! commits to a delivery channel. Probing is best-effort: any failure or
//! timeout produces a degraded report instead of an error, so a broken
//! capability endpoint can never take the client down with it. Degraded
//! reports withhold push (subscriptions fail closed) while still allowing
//! writes (mutations fail open).

use queue_sync_core::ProbeConfig;
use queue_sync_transport::{CapabilityReport, QueueTransport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Ceiling on how long a single probe may run
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probes backend capabilities and caches the latest report.
pub struct CapabilityProbe {
    transport: Arc<dyn QueueTransport>,
    probe_timeout: Duration,
    last_report: Mutex<Option<CapabilityReport>>,
}

impl std::fmt::Debug for CapabilityProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProbe")
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

impl CapabilityProbe {
    /// Create a probe with the default timeout
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self::with_timeout(transport, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a probe with an explicit timeout
    pub fn with_timeout(transport: Arc<dyn QueueTransport>, probe_timeout: Duration) -> Self {
        Self {
            transport,
            probe_timeout,
            last_report: Mutex::new(None),
        }
    }

    /// Create a probe from configuration
    pub fn from_config(transport: Arc<dyn QueueTransport>, config: &ProbeConfig) -> Self {
        Self::with_timeout(transport, Duration::from_secs(config.timeout_seconds))
    }

    /// Return the cached report, probing the backend on first use.
    pub async fn probe(&self) -> CapabilityReport {
        if let Some(report) = self.cached() {
            return report;
        }
        self.revalidate().await
    }

    /// Probe the backend again, replacing any cached report.
    ///
    /// Never fails: probe errors and timeouts degrade to a report that
    /// withholds push while keeping mutations available, with the failure
    /// recorded in the report's error list.
    pub async fn revalidate(&self) -> CapabilityReport {
        let probe = self.transport.probe_capabilities();
        let report = match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(mut report)) => {
                // The backend may advertise push over a transport that
                // cannot carry it.
                if report.subscriptions_available && !self.transport.supports_push() {
                    debug!(
                        transport = %self.transport.transport_type(),
                        "backend advertises push on a pull-only transport; withholding"
                    );
                    report.subscriptions_available = false;
                }
                report
            }
            Ok(Err(e)) => {
                warn!(error = %e, "capability probe failed; assuming degraded service");
                CapabilityReport::degraded(vec![format!("capability probe failed: {}", e)])
            }
            Err(_) => {
                warn!(
                    timeout = ?self.probe_timeout,
                    "capability probe timed out; assuming degraded service"
                );
                CapabilityReport::degraded(vec![format!(
                    "capability probe timed out after {:?}",
                    self.probe_timeout
                )])
            }
        };

        *self.lock_report() = Some(report.clone());
        report
    }

    /// Latest report, if any probe has completed
    pub fn last_report(&self) -> Option<CapabilityReport> {
        self.cached()
    }

    fn cached(&self) -> Option<CapabilityReport> {
        self.lock_report().clone()
    }

    fn lock_report(&self) -> std::sync::MutexGuard<'_, Option<CapabilityReport>> {
        self.last_report.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
