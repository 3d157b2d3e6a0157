//! Core error types for the Lapis runtime.
//!
//! Every error that can reach a client carries a stable code from
//! [`codes`](crate::codes) so the rescuer can translate it without matching on
//! message text.

use thiserror::Error;

use crate::codes;

// =============================================================================
// Container errors
// =============================================================================

/// Errors raised while binding, resolving or injecting through the
/// [`Container`](crate::container::Container).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// The concrete bound to a contract does not provide that contract.
    #[error("'{concrete}' does not implement contract '{contract}'")]
    NotImplemented {
        /// Contract type name.
        contract: &'static str,
        /// Type name of the rejected concrete.
        concrete: &'static str,
    },

    /// The concrete bound to a record abstract is not exactly that record.
    #[error("'{concrete}' is not the record type '{record}'")]
    InvalidStructConcrete {
        /// Record type name.
        record: &'static str,
        /// Type name of the rejected concrete.
        concrete: &'static str,
    },

    /// The concrete is neither a stored instance nor a factory, or a stored
    /// binding does not hold the requested type.
    #[error("invalid concrete for '{abstract_name}'")]
    InvalidConcrete {
        /// Abstract type name.
        abstract_name: &'static str,
    },

    /// Nothing is bound to the requested abstract.
    #[error("'{abstract_name}' is not bound")]
    NotBound {
        /// Abstract type name.
        abstract_name: &'static str,
    },

    /// A factory was resolved with the wrong number of arguments.
    #[error("'{abstract_name}' expects {expected} argument(s), got {got}")]
    InsufficientArguments {
        /// Abstract type name.
        abstract_name: &'static str,
        /// Factory arity.
        expected: usize,
        /// Number of supplied arguments.
        got: usize,
    },

    /// A factory produced no value.
    #[error("factory for '{abstract_name}' returned no value")]
    NonValuesReturned {
        /// Abstract type name.
        abstract_name: &'static str,
    },

    /// A factory argument had an unexpected type.
    #[error("argument #{index} is not of type '{expected}'")]
    InvalidArgument {
        /// Position of the argument.
        index: usize,
        /// Expected argument type name.
        expected: &'static str,
    },

    /// The injection target is not a registered injectable component.
    #[error("'{target}' cannot be used as an injection target")]
    InvalidTargetType {
        /// Type name of the target (or `dyn Any` when erased).
        target: &'static str,
    },

    /// Resolution re-entered an abstract that was already being resolved.
    #[error("cyclic dependency: {chain}")]
    CyclicDependency {
        /// The resolution path, e.g. `A -> B -> A`.
        chain: String,
    },

    /// Resolution nested deeper than the configured limit.
    #[error("resolution depth exceeded {limit} while resolving '{abstract_name}'")]
    DepthExceeded {
        /// Abstract type name.
        abstract_name: &'static str,
        /// Configured maximum depth.
        limit: usize,
    },

    /// `bind` was called after the container was frozen.
    #[error("container is frozen, cannot bind '{abstract_name}'")]
    Frozen {
        /// Abstract type name.
        abstract_name: &'static str,
    },
}

impl ContainerError {
    /// Returns the wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotImplemented { .. } => codes::BIND_NOT_IMPLEMENT_INTERFACE,
            Self::InvalidStructConcrete { .. } => codes::BIND_INVALID_STRUCT_CONCRETE,
            Self::InvalidConcrete { .. } => codes::RESOLVE_INVALID_CONCRETE,
            Self::NotBound { .. } => codes::RESOLVE_NOT_EXIST_ABSTRACT,
            Self::InsufficientArguments { .. } => codes::RESOLVE_INSUFFICIENT_ARGUMENTS,
            Self::NonValuesReturned { .. } => codes::RESOLVE_NON_VALUES_RETURNED,
            Self::InvalidArgument { .. } => codes::RESOLVE_INVALID_ARGUMENTS,
            Self::InvalidTargetType { .. } => codes::INJECT_INVALID_TARGET_TYPE,
            Self::CyclicDependency { .. } => codes::RESOLVE_CYCLIC_DEPENDENCY,
            Self::DepthExceeded { .. } => codes::RESOLVE_DEPTH_EXCEEDED,
            Self::Frozen { .. } => codes::BIND_FROZEN,
        }
    }

    /// Returns `true` for errors that can only happen while bindings are
    /// being registered.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::NotImplemented { .. }
                | Self::InvalidStructConcrete { .. }
                | Self::Frozen { .. }
        )
    }
}

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

// =============================================================================
// Codec errors
// =============================================================================

/// Errors raised while encoding or decoding bodies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// No codec is registered for the content type.
    #[error("no codec registered for '{0}'")]
    NotFound(String),

    /// The value cannot be represented by this codec.
    #[error("invalid content for '{content_type}': {reason}")]
    InvalidContent {
        /// Content type of the codec.
        content_type: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The bytes could not be decoded.
    #[error("unable to decode content: {0}")]
    Decode(String),

    /// The value could not be encoded.
    #[error("unable to encode content: {0}")]
    Encode(String),
}

impl CodecError {
    /// Creates an invalid content error.
    pub fn invalid(content_type: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidContent {
            content_type,
            reason: reason.into(),
        }
    }

    /// Returns the wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => codes::NO_CODEC_FOUND,
            Self::InvalidContent { .. } => codes::CODEC_INVALID_CONTENT,
            Self::Decode(_) => codes::CODEC_DECODE_FAILURE,
            Self::Encode(_) => codes::CODEC_ENCODE_FAILURE,
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

// =============================================================================
// Send errors
// =============================================================================

/// Errors raised while flushing a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The response was already flushed (or is being flushed).
    #[error("response already sent")]
    AlreadySent,

    /// The content could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The underlying writer failed.
    #[error("unable to write response: {0}")]
    Write(String),
}

impl SendError {
    /// Returns the wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadySent => codes::RESPONSE_ALREADY_SENT,
            Self::Codec(e) => e.code(),
            Self::Write(_) => codes::WRITER_FAILURE,
        }
    }
}

/// Result type for send operations.
pub type SendResult<T> = Result<T, SendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_codes_are_stable() {
        let err = ContainerError::NotBound {
            abstract_name: "dyn Greeter",
        };
        assert_eq!(err.code(), "0.004.007");
        assert_eq!(err.to_string(), "'dyn Greeter' is not bound");
        assert!(!err.is_registration());
    }

    #[test]
    fn send_error_forwards_codec_code() {
        let err = SendError::from(CodecError::NotFound("text/xml".into()));
        assert_eq!(err.code(), codes::NO_CODEC_FOUND);
        assert_eq!(SendError::AlreadySent.code(), "0.003.001");
    }
}
