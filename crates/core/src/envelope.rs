//! The uniform response envelope shared by every API route.
//!
//! Success bodies look like `{ "data": ..., "timestamp": "..." }` and error
//! bodies like `{ "error": { "status", "code", "message", "details" }, "timestamp": "..." }`.
//! The client runtime deserializes the same types, so both sides agree on the
//! wire shape by construction.

use serde::{Deserialize, Serialize};

/// Envelope wrapping every API response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    /// RFC 3339 time at which the server produced the response.
    #[serde(default)]
    pub timestamp: String,
}

/// Structured error carried inside [`ApiResponse::error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// HTTP status code of the response.
    pub status: u16,
    /// Machine-readable error code, e.g. `VALIDATION_ERROR`.
    #[serde(default)]
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload in a success envelope stamped with the current time.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            timestamp: now_rfc3339(),
        }
    }

    /// Build an error envelope stamped with the current time.
    pub fn failure(error: ApiErrorBody) -> Self {
        Self {
            data: None,
            error: Some(error),
            timestamp: now_rfc3339(),
        }
    }
}

impl ApiErrorBody {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_error_field() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["data"], 42);
        assert!(json.get("error").is_none());
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn failure_omits_data_field() {
        let body = ApiErrorBody::new(409, "CONFLICT", "User already exists");
        let json = serde_json::to_value(ApiResponse::<()>::failure(body)).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["status"], 409);
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn tolerates_missing_fields_when_parsing() {
        let parsed: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"error":{"status":500,"message":"boom"}}"#).unwrap();
        assert!(parsed.data.is_none());
        let error = parsed.error.unwrap();
        assert_eq!(error.status, 500);
        assert_eq!(error.code, "");
        assert!(parsed.timestamp.is_empty());
    }
}
