//! # Bridge Errors
//!
//! Every failure the bridge can surface, with its HTTP status and a
//! stable machine-readable code. Store-client errors are classified on
//! the way in; raw driver detail never drives control flow past here.

use axum::http::StatusCode;
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge errors
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Collection name failed validation
    #[error("Invalid collection name: {0}")]
    InvalidName(String),

    /// Request body required but absent
    #[error("Request body is required")]
    MissingBody,

    /// Document identifier required but absent
    #[error("Document id is required")]
    MissingId,

    /// Request shape or parameter rejected
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Body could not be converted to a storable document
    #[error("Cast failed: {0}")]
    Cast(String),

    /// No document matched the identifier
    #[error("Document not found")]
    NotFound,

    /// HTTP method not supported on this route
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Unique index violation
    #[error("Duplicate key")]
    DuplicateKey,

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Store unreachable; retryable on a later request
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// Catch-all internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::InvalidName(_) => StatusCode::BAD_REQUEST,
            BridgeError::MissingBody => StatusCode::BAD_REQUEST,
            BridgeError::MissingId => StatusCode::BAD_REQUEST,
            BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BridgeError::Cast(_) => StatusCode::BAD_REQUEST,
            BridgeError::NotFound => StatusCode::NOT_FOUND,
            BridgeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            BridgeError::DuplicateKey => StatusCode::CONFLICT,
            BridgeError::Connection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidName(_) => "INVALID_NAME",
            BridgeError::MissingBody => "MISSING_BODY",
            BridgeError::MissingId => "MISSING_ID",
            BridgeError::Validation(_) => "VALIDATION_FAILED",
            BridgeError::Cast(_) => "CAST_FAILED",
            BridgeError::NotFound => "NOT_FOUND",
            BridgeError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            BridgeError::DuplicateKey => "DUPLICATE_KEY",
            BridgeError::Connection(_) => "CONNECTION_FAILED",
            BridgeError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<mongodb::error::Error> for BridgeError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref write_err))
                if write_err.code == 11000 =>
            {
                BridgeError::DuplicateKey
            }
            ErrorKind::ServerSelection { .. } => BridgeError::Connection(err.to_string()),
            ErrorKind::Io(_) => BridgeError::Connection(err.to_string()),
            // insert_many surfaces duplicate keys through a different kind
            _ if err.to_string().contains("E11000") => BridgeError::DuplicateKey,
            _ => BridgeError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_status_codes() {
        assert_eq!(
            BridgeError::InvalidName("a$b".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(BridgeError::MissingBody.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(BridgeError::MissingId.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(BridgeError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            BridgeError::MethodNotAllowed("TRACE".to_string()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(BridgeError::DuplicateKey.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_server_error_status_codes() {
        assert_eq!(
            BridgeError::Connection("refused".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            BridgeError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(BridgeError::NotFound.code(), "NOT_FOUND");
        assert_eq!(BridgeError::DuplicateKey.code(), "DUPLICATE_KEY");
        assert_eq!(
            BridgeError::Connection("x".to_string()).code(),
            "CONNECTION_FAILED"
        );
    }
}
