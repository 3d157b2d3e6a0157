//! Error types for the Lapis framework.
//!
//! Errors fall into two groups:
//!
//! - [`RegistrationError`]: raised while routes are being registered; they
//!   abort startup and never reach a request.
//! - [`DispatchError`]: raised while a request is being served; the
//!   [`Rescuer`](crate::rescuer::Rescuer) turns them into a response.
//!
//! [`Unrescuable`] is the escape hatch for the case where the rescuer itself
//! cannot produce a response.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lapis_core::codes;
use lapis_core::error::{CodecError, ContainerError, SendError};

// =============================================================================
// Registration
// =============================================================================

/// Errors detected while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Two routes resolved to the same name.
    #[error("duplicate route name '{name}'")]
    DuplicateRouteName {
        /// The conflicting name.
        name: String,
    },

    /// A host or uri pattern did not compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for route registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

// =============================================================================
// Application errors
// =============================================================================

/// One entry of an error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    pub code: String,
    pub message: String,
}

impl ErrorItem {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A single coded error, optionally carrying the HTTP status to respond with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HttpError {
    pub status: Option<u16>,
    pub code: String,
    pub message: String,
}

impl HttpError {
    /// Creates an error without an explicit status.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Sets the status to respond with (builder pattern).
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// A 400 error with the generic bad-request code.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(codes::HTTP_BAD_REQUEST, message).with_status(400)
    }

    /// A 404 error with the generic not-found code.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(codes::HTTP_NOT_FOUND, message).with_status(404)
    }
}

/// Several errors reported together, e.g. every failed validation rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct StackError {
    pub status: Option<u16>,
    pub errors: Vec<ErrorItem>,
}

impl StackError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status to respond with (builder pattern).
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn push(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ErrorItem::new(code, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(first) if self.errors.len() > 1 => {
                write!(f, "{} (and {} more)", first.message, self.errors.len() - 1)
            }
            Some(first) => f.write_str(&first.message),
            None => f.write_str("no errors"),
        }
    }
}

// =============================================================================
// Dispatch errors
// =============================================================================

/// Every failure that can occur while serving a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route matched the request.
    #[error("no route matches {method} {uri}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path.
        uri: String,
    },

    /// A dependency could not be resolved or injected.
    #[error(transparent)]
    Resolution(#[from] ContainerError),

    /// A single coded error raised by a handler or hook.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Several coded errors raised together.
    #[error(transparent)]
    Stack(#[from] StackError),

    /// A body could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The response could not be flushed.
    #[error(transparent)]
    Send(#[from] SendError),

    /// A handler or hook panicked.
    #[error("panic during dispatch: {0}")]
    Panic(String),

    /// Any other error, reported as unknown.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Wraps an arbitrary error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }

    /// The wire code of this error.
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound { .. } => codes::HTTP_NOT_FOUND,
            Self::Resolution(e) => e.code(),
            Self::Http(e) => &e.code,
            Self::Stack(e) => e
                .errors
                .first()
                .map_or(codes::HTTP_UNKNOWN_ERROR, |item| item.code.as_str()),
            Self::Codec(e) => e.code(),
            Self::Send(e) => e.code(),
            Self::Panic(_) => codes::APP_PANIC,
            Self::Other(_) => codes::HTTP_UNKNOWN_ERROR,
        }
    }

    /// The status explicitly attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status,
            Self::Stack(e) => e.status,
            _ => None,
        }
    }

    /// The client-facing message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

// =============================================================================
// Unrescuable
// =============================================================================

/// The rescuer could not turn an error into a response.
///
/// This signals misuse of the pipeline rather than a request-level failure,
/// so it propagates to whoever drives the dispatcher.
#[derive(Debug, Error)]
#[error("unable to rescue error: {source}")]
pub struct Unrescuable {
    #[source]
    pub source: DispatchError,
}

impl From<DispatchError> for Unrescuable {
    fn from(source: DispatchError) -> Self {
        Self { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let not_found = DispatchError::NotFound {
            method: "GET".into(),
            uri: "/users/abc".into(),
        };
        assert_eq!(not_found.code(), codes::HTTP_NOT_FOUND);
        assert_eq!(not_found.status(), None);

        let http: DispatchError = HttpError::new("1.000.001", "teapot").with_status(418).into();
        assert_eq!(http.code(), "1.000.001");
        assert_eq!(http.status(), Some(418));
        assert_eq!(http.message(), "teapot");

        let resolution: DispatchError = ContainerError::NotBound {
            abstract_name: "dyn Store",
        }
        .into();
        assert_eq!(resolution.code(), codes::RESOLVE_NOT_EXIST_ABSTRACT);
    }

    #[test]
    fn test_stack_display() {
        let mut stack = StackError::new().with_status(400);
        assert_eq!(stack.to_string(), "no errors");
        stack.push("a", "name is required");
        stack.push("b", "email is required");
        assert_eq!(stack.to_string(), "name is required (and 1 more)");
        assert_eq!(DispatchError::from(stack).code(), "a");
    }
}
