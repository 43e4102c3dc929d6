//! Connectivity monitor - runs the probes and derives the status.

use std::sync::Arc;

use crate::domain::connectivity::ConnectivityStatus;
use crate::ports::ConnectivityProbe;

/// Combines a reachability and a credential probe into a [`ConnectivityStatus`].
#[derive(Clone)]
pub struct ConnectivityMonitor {
    probe: Arc<dyn ConnectivityProbe>,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self { probe }
    }

    pub async fn check_reachability(&self) -> bool {
        self.probe.check_reachability().await
    }

    pub async fn check_credential(&self) -> bool {
        self.probe.check_credential().await
    }

    /// Pure status table, see [`ConnectivityStatus::derive`].
    pub fn derive_status(reachable: bool, credential_valid: bool) -> ConnectivityStatus {
        ConnectivityStatus::derive(reachable, credential_valid)
    }

    /// Runs both probes and derives the status.
    ///
    /// The credential probe is skipped when the service is unreachable.
    pub async fn check(&self) -> ConnectivityStatus {
        let reachable = self.check_reachability().await;
        let credential_valid = reachable && self.check_credential().await;
        let status = Self::derive_status(reachable, credential_valid);

        tracing::info!(
            reachable = reachable,
            credential_valid = credential_valid,
            status = %status,
            "Connectivity checked"
        );
        status
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor").finish_non_exhaustive()
    }
}
