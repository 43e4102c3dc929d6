//! In-process probe that asks the completion provider directly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{CompletionError, CompletionProvider, ConnectivityProbe};

/// Probes the provider through `list_models`.
///
/// An authentication failure still proves the provider answered, so it
/// counts as reachable.
#[derive(Clone)]
pub struct ProviderConnectivityProbe {
    provider: Arc<dyn CompletionProvider>,
}

impl ProviderConnectivityProbe {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ConnectivityProbe for ProviderConnectivityProbe {
    async fn check_reachability(&self) -> bool {
        match self.provider.list_models().await {
            Ok(_) | Err(CompletionError::AuthenticationFailed) => true,
            Err(CompletionError::RateLimited { .. }) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Provider unreachable");
                false
            }
        }
    }

    async fn check_credential(&self) -> bool {
        match self.provider.list_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Credential check failed");
                false
            }
        }
    }
}
