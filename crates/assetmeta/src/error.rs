//! Error types

use serde::Deserialize;
use thiserror::Error;

use crate::value::FieldType;

/// Error type for metadata field operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was missing or empty. Raised before any request is sent.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// A value does not have the shape the field type requires. Raised before any request is sent.
    #[error("type mismatch: expected {expected} value, got {found}")]
    TypeMismatch { expected: FieldType, found: String },

    /// Error returned by the server, passed through unmodified
    #[error("API error ({status_code}): {message}")]
    Api {
        status_code: u16,
        message: String,
        request_id: Option<String>,
        body: Option<serde_json::Value>,
    },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn missing(name: &'static str) -> Self {
        Error::InvalidArgument {
            name,
            reason: "must not be empty".to_string(),
        }
    }

    /// Returns true for errors raised locally, before anything reached the network
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument { .. } | Error::TypeMismatch { .. }
        )
    }

    /// Returns true if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    /// Returns true if this is a not found error (404)
    pub fn is_not_found_error(&self) -> bool {
        matches!(self, Error::Api { status_code: 404, .. })
    }

    /// Returns true if the server reported a conflict, e.g. a duplicate external id (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Api { status_code: 409, .. })
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status_code, .. } => *status_code >= 500,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Error envelope used by the admin API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_errors() {
        assert!(Error::missing("field_external_id").is_local());
        assert!(Error::TypeMismatch {
            expected: FieldType::Integer,
            found: "array".into()
        }
        .is_local());

        let api = Error::Api {
            status_code: 409,
            message: "external id already exists".into(),
            request_id: None,
            body: None,
        };
        assert!(!api.is_local());
        assert!(api.is_conflict());
        assert!(!api.is_retryable());
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = Error::missing("field_external_id");
        assert_eq!(
            err.to_string(),
            "invalid argument `field_external_id`: must not be empty"
        );
    }
}
