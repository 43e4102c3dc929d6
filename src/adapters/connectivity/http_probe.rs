//! Probe that checks a running relay over HTTP.
//!
//! Reachability is `GET {base}/health`; the credential check is
//! `GET {base}/validate-key` reporting `valid: true`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::ports::ConnectivityProbe;

/// HTTP probe against the relay's own API.
#[derive(Debug, Clone)]
pub struct HttpConnectivityProbe {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ValidateKeyBody {
    #[serde(default)]
    valid: bool,
}

impl HttpConnectivityProbe {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check_reachability(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Health check failed");
                false
            }
        }
    }

    async fn check_credential(&self) -> bool {
        let url = format!("{}/validate-key", self.base_url);
        let response = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Key validation request failed");
                return false;
            }
        };

        match response.json::<ValidateKeyBody>().await {
            Ok(body) => body.valid,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Unreadable key validation response");
                false
            }
        }
    }
}
