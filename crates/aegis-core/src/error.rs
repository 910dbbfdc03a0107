//! A unified error type shared by every aegis subsystem.
//!
//! Cache misses aren't errors, but backend failures, bad input, and auth
//! failures all need to cross crate boundaries in one shape so an HTTP
//! layer can turn any of them into a response without matching on each
//! subsystem's own error enum. [`Error`] is that shape: a [`ErrorKind`]
//! plus a message and optional structured details.
//!
//! ```
//! use aegis_core::{Error, ErrorKind};
//!
//! let err = Error::new(ErrorKind::NotFound, "key 'session:42' not found");
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert_eq!(err.kind().status_code(), 404);
//!
//! let body = err.to_response_body();
//! assert_eq!(body.error, "not_found");
//! ```

use serde::Serialize;
use std::fmt;

/// The ten error kinds every aegis subsystem reports through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    /// A caller supplied a malformed or out-of-range argument.
    #[error("invalid argument")]
    InvalidArgument,
    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,
    /// The caller did not present valid credentials.
    #[error("unauthenticated")]
    Unauthenticated,
    /// The caller is known but not permitted to perform this operation.
    #[error("forbidden")]
    Forbidden,
    /// The caller has exceeded a configured rate limit.
    #[error("rate limited")]
    RateLimited,
    /// A backing store (cache, queue, rate limiter store) is unreachable
    /// or returned an error this crate cannot interpret.
    #[error("backend unavailable")]
    BackendUnavailable,
    /// A value could not be encoded or decoded by the configured serializer.
    #[error("serialization failed")]
    SerializationFailed,
    /// A token, signature, or ciphertext failed verification.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// Required configuration is missing or invalid.
    #[error("configuration error")]
    Configuration,
    /// The operation conflicts with existing state (e.g. a duplicate job id).
    #[error("conflict")]
    Conflict,
}

impl ErrorKind {
    /// A stable, machine-readable identifier for this kind, suitable for
    /// API responses and log fields. Never changes across versions.
    pub fn stable_id(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::SerializationFailed => "serialization_failed",
            ErrorKind::AuthenticationFailed => "authentication_failed",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Conflict => "conflict",
        }
    }

    /// The HTTP status code a web-facing caller should report for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::RateLimited => 429,
            ErrorKind::BackendUnavailable => 503,
            ErrorKind::SerializationFailed => 500,
            ErrorKind::AuthenticationFailed => 401,
            ErrorKind::Configuration => 500,
            ErrorKind::Conflict => 409,
        }
    }
}

/// The response body shape every subsystem's HTTP-facing errors render to:
/// `{error, message, details?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// The error type shared across the aegis workspace.
///
/// Every subsystem defines its own error enum for internal matching (e.g.
/// `aegis_cache::CacheError`) and converts into this type at the crate
/// boundary, the way a layered service narrows many inner errors down to
/// one outer error without writing an impl per combination.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    details: Option<serde_json::Value>,
}

impl Error {
    /// Builds a new error of the given kind with a human-readable message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details (e.g. the offending field name) to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders this error into the `{error, message, details?}` shape an
    /// HTTP-facing caller serializes in the response body.
    pub fn to_response_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind.stable_id(),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }

    /// Returns `true` if this error should be retried by a caller (backend
    /// outages are transient; validation and auth failures are not).
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::BackendUnavailable | ErrorKind::RateLimited)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    const _: () = {
        const fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<Error>();
    };

    #[test]
    fn status_codes_match_kind() {
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::RateLimited.status_code(), 429);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
    }

    #[test]
    fn response_body_omits_absent_details() {
        let err = Error::new(ErrorKind::InvalidArgument, "bad ttl");
        let body = err.to_response_body();
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["error"], "invalid_argument");
    }

    #[test]
    fn response_body_includes_details_when_set() {
        let err = Error::new(ErrorKind::Conflict, "job already exists")
            .with_details(serde_json::json!({"jobId": "abc123"}));
        let body = err.to_response_body();
        assert_eq!(body.details.unwrap()["jobId"], "abc123");
    }

    #[test]
    fn backend_unavailable_and_rate_limited_are_retryable() {
        assert!(Error::backend_unavailable("timeout").is_retryable());
        assert!(Error::new(ErrorKind::RateLimited, "too many requests").is_retryable());
        assert!(!Error::invalid_argument("bad key").is_retryable());
    }
}
