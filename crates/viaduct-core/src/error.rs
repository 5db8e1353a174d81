//! Error types for the dispatch pipeline.
//!
//! This module provides [`DispatchError`], the standard error type carried
//! through the error channel of the dispatch loop.
//!
//! Errors are cloneable on purpose: parameter-middleware outcomes are
//! memoized per request and a stored error is replayed instead of re-running
//! the middleware for the same value.

use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`DispatchError`].
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Standard error type for the Viaduct dispatch pipeline.
///
/// A `DispatchError` travels forward through the layer stack until it reaches
/// an error handler, or falls out of the outermost chain where the
/// application produces a terminal response from [`status_code`].
///
/// # Example
///
/// ```
/// use viaduct_core::DispatchError;
/// use http::StatusCode;
///
/// let err = DispatchError::not_found("no such user");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// ```
///
/// [`status_code`]: DispatchError::status_code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Malformed percent-encoding in a matched path segment.
    ///
    /// Fatal to the current match; carries the offending raw value.
    #[error("failed to decode param '{raw}'")]
    Decode {
        /// The raw, undecodable capture.
        raw: String,
    },

    /// The request was malformed in some other way.
    #[error("bad request: {message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// No handler produced a response for the request.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// A handler reported a failure.
    #[error("{message}")]
    Handler {
        /// Human-readable error message.
        message: String,
        /// The HTTP status the terminal fallback should use.
        status: StatusCode,
    },

    /// Unexpected internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl DispatchError {
    /// Creates a decode error for an undecodable path capture.
    #[must_use]
    pub fn decode(raw: impl Into<String>) -> Self {
        Self::Decode { raw: raw.into() }
    }

    /// Creates a bad-request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a handler error with an explicit status code.
    #[must_use]
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            status,
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode { .. } | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Handler { status, .. } => *status,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_identifies_raw_value() {
        let err = DispatchError::decode("%zz");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("%zz"));
    }

    #[test]
    fn test_not_found() {
        let err = DispatchError::not_found("nothing here");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_with_status() {
        let err = DispatchError::with_status(StatusCode::CONFLICT, "already exists");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "already exists");
    }

    #[test]
    fn test_internal_defaults_to_500() {
        let err = DispatchError::internal("boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = DispatchError::decode("%e0");
        let replayed = err.clone();
        assert_eq!(err, replayed);
    }
}
