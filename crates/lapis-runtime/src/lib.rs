//! Lapis Runtime - boot layer for Lapis applications.
//!
//! This crate provides:
//! - Application assembly and startup loaders (`App`, `Loader`, `Kernel`)
//! - Layered configuration (`ConfigLoader`, `LapisConfig`)
//! - Logging configuration (`LoggingBuilder`, `init_from_config`)
//!
//! ```rust,ignore
//! use lapis_runtime::App;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::builder().build()?.with_loader(RoutesLoader);
//!     let kernel = app.run().await?;
//!
//!     let outgoing = kernel.dispatch(Request::new("GET", "/health")).await?;
//!     println!("{}", outgoing.status);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports
pub use app::{App, AppBuilder, Kernel, Loader};
pub use config::{
    AppConfig, ConfigError, ConfigLoader, ConfigResult, LapisConfig, LoggingConfig, Profile,
    load_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use tower::BoxError;
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
