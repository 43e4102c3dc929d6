//! Connectivity status derived from two independent probe results.

use serde::{Deserialize, Serialize};

/// UI-facing connectivity state used to gate message input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectivityStatus {
    /// No check has completed yet.
    #[default]
    Unknown,
    /// Backend reachable and credential accepted.
    Connected,
    /// Backend reachable but the provider rejects the credential.
    InvalidCredential,
    /// Backend could not be reached.
    Unreachable,
}

impl ConnectivityStatus {
    /// Derives the status from a reachability and a credential probe.
    ///
    /// | reachable | credential_valid | status               |
    /// |-----------|------------------|----------------------|
    /// | false     | any              | `Unreachable`        |
    /// | true      | false            | `InvalidCredential`  |
    /// | true      | true             | `Connected`          |
    pub fn derive(reachable: bool, credential_valid: bool) -> Self {
        match (reachable, credential_valid) {
            (false, _) => ConnectivityStatus::Unreachable,
            (true, false) => ConnectivityStatus::InvalidCredential,
            (true, true) => ConnectivityStatus::Connected,
        }
    }

    /// True when messages may be sent.
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectivityStatus::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityStatus::Unknown => "unknown",
            ConnectivityStatus::Connected => "connected",
            ConnectivityStatus::InvalidCredential => "invalid-credential",
            ConnectivityStatus::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_matches_truth_table() {
        let table = [
            (false, false, ConnectivityStatus::Unreachable),
            (false, true, ConnectivityStatus::Unreachable),
            (true, false, ConnectivityStatus::InvalidCredential),
            (true, true, ConnectivityStatus::Connected),
        ];

        for (reachable, credential_valid, expected) in table {
            assert_eq!(
                ConnectivityStatus::derive(reachable, credential_valid),
                expected,
                "reachable={} credential_valid={}",
                reachable,
                credential_valid
            );
        }
    }

    #[test]
    fn defaults_to_unknown() {
        assert_eq!(ConnectivityStatus::default(), ConnectivityStatus::Unknown);
    }

    #[test]
    fn only_connected_is_ready() {
        assert!(ConnectivityStatus::Connected.is_ready());
        assert!(!ConnectivityStatus::Unknown.is_ready());
        assert!(!ConnectivityStatus::InvalidCredential.is_ready());
        assert!(!ConnectivityStatus::Unreachable.is_ready());
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&ConnectivityStatus::InvalidCredential).unwrap();
        assert_eq!(json, "\"invalid-credential\"");
        assert_eq!(ConnectivityStatus::InvalidCredential.to_string(), "invalid-credential");
    }
}
