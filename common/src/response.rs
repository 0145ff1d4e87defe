//! API response types.
//!
//! Successful query endpoints answer with a bare JSON array of rows; only
//! failures use a wrapper, so clients can always read `error` as a string.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable, user-facing message.
    pub error: String,

    /// Error code for client handling (e.g. "VALIDATION_ERROR", "BAD_SYNTAX").
    #[serde(default)]
    pub code: String,
}

impl ErrorResponse {
    /// Creates an error body.
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorResponse::new("Query failed", "QUERY_FAILED")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "Query failed", "code": "QUERY_FAILED" })
        );
    }

    #[test]
    fn test_code_is_optional_when_parsing() {
        let body: ErrorResponse = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(body.error, "boom");
        assert!(body.code.is_empty());
    }
}
