//! Configuration module for the Lapis runtime.
//!
//! Settings are layered from defaults, configuration files, `LAPIS_*`
//! environment variables and programmatic overrides, then validated before
//! the application starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    AppConfig, LapisConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
