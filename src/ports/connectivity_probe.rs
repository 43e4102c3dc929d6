//! Connectivity Probe Port - the two independent signals behind the
//! connectivity status.

use async_trait::async_trait;

/// Probes service reachability and upstream credential validity.
///
/// Implementations never fail: any error is reported as `false`.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Lightweight liveness probe.
    async fn check_reachability(&self) -> bool;

    /// Succeeds only if the provider accepts the configured credential.
    async fn check_credential(&self) -> bool;
}
