// CDP Error types
// Implements JSON-RPC 2.0 error codes and payload decoding errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// CDP error object in JSON-RPC 2.0 shape
///
/// Returned by the browser when a command such as `Network.getResponseBody` fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CdpError {
    /// Error code (JSON-RPC standard codes)
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for CdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CDP Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for CdpError {}

impl CdpError {
    /// Create a new CDP error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Resource lookup failure (-32000), e.g. a body that is no longer retained
    pub fn resource_not_found(request_id: impl fmt::Display) -> Self {
        Self::new(
            -32000,
            format!("No resource with given identifier found: {}", request_id),
        )
    }
}

/// Errors raised while turning raw event parameters into typed payloads
#[derive(Error, Debug)]
pub enum PayloadError {
    /// Parameters did not match the payload shape
    #[error("Malformed {method} payload: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// A correlating identifier was present but empty
    #[error("Empty {field} in {method} payload")]
    EmptyField { method: String, field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let error = CdpError::resource_not_found("42");
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "No resource with given identifier found: 42");
    }

    #[test]
    fn test_error_serialization() {
        let error = CdpError::new(-32000, "No data found for resource with given identifier");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("-32000"));
        assert!(!json.contains("data"));
    }

    #[test]
    fn test_error_deserialization() {
        let error: CdpError =
            serde_json::from_str(r#"{"code":-32000,"message":"boom"}"#).unwrap();
        assert_eq!(error, CdpError::new(-32000, "boom"));
    }
}
