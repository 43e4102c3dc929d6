//! Response bodies for the health and credential endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `GET /api/validate-key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateKeyResponse {
    pub fn valid(model_count: usize) -> Self {
        Self {
            valid: true,
            model_count: Some(model_count),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            model_count: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_serializes_rfc3339_timestamp() {
        let json = serde_json::to_value(HealthResponse::ok()).unwrap();

        assert_eq!(json["status"], "OK");
        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn validate_key_omits_absent_fields() {
        assert_eq!(
            serde_json::to_value(ValidateKeyResponse::valid(42)).unwrap(),
            serde_json::json!({"valid": true, "modelCount": 42})
        );
        assert_eq!(
            serde_json::to_value(ValidateKeyResponse::invalid("bad key")).unwrap(),
            serde_json::json!({"valid": false, "error": "bad key"})
        );
    }
}
