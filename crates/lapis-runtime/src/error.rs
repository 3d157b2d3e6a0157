//! Runtime error types.

use thiserror::Error;
use tower::BoxError;

use crate::config::ConfigError;
use lapis_core::ContainerError;
use lapis_framework::{RegistrationError, Unrescuable};

/// Errors that can occur while booting or driving an application.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Route registration failed when the router was frozen.
    #[error("Route registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// A container operation failed during boot.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// A loader returned an error; later loader tiers did not run.
    #[error("Loader {name} failed: {source}")]
    Loader {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The rescuer could not produce a response.
    #[error(transparent)]
    Unrescuable(#[from] Unrescuable),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
