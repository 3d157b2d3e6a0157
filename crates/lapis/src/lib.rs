//! # Lapis
//!
//! A type-safe request-dispatch runtime for HTTP APIs.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌─────────────────────────────────────┐
//! │ Transport  │────▶│ Dispatcher │────▶│ route ─▶ set-up hooks ─▶ handler     │
//! │ (yours)    │◀────│ (Kernel)   │◀────│        ◀─ tear-down hooks ◀─         │
//! └────────────┘     └────────────┘     └─────────────────────────────────────┘
//!                          │ errors and panics
//!                          ▼
//!                       Rescuer
//! ```
//!
//! - **Container**: binds contracts to implementations and injects `#[inject]`
//!   fields
//! - **Router**: URI and host patterns with named captures, first match wins
//! - **Hooks**: set-up/tear-down middleware grouped in priority tiers
//! - **Loaders**: startup work scheduled in the same tiers
//! - **Rescuer**: turns every failure into a response
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lapis::prelude::*;
//!
//! async fn hello(Params(params): Params) -> Result<String, HttpError> {
//!     Ok(format!("hello, {}", params.get_str("name").unwrap_or("world")))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::builder().build()?;
//!     app.routes(|router| {
//!         router.get("/hello/<name>", hello);
//!     });
//!
//!     let kernel = app.run().await?;
//!     let outgoing = kernel.dispatch(Request::new("GET", "/hello/ada")).await?;
//!     assert_eq!(outgoing.text(), Some("hello, ada"));
//!     Ok(())
//! }
//! ```
//!
//! `#[derive(Injectable)]` expands to paths under `lapis_core`, so crates
//! using the derive also depend on `lapis-core` directly.
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use lapis_core as core;
pub use lapis_framework as framework;
pub use lapis_runtime as runtime;

pub use lapis_macros::Injectable;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use lapis::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use lapis_runtime::{App, BoxError, Kernel, Loader, RuntimeError};

    // Container
    pub use lapis_core::container::{Container, Injectable};
    pub use lapis_macros::Injectable;

    // Request model
    pub use lapis_core::foundation::{Connection, Outgoing, ParamBag, Request, Response};
    pub use lapis_core::scheduler::Prioritized;

    // Routing and handlers
    pub use lapis_framework::{
        Dep, DispatchError, DispatchResult, Handle, HttpError, Input, Params, Registrar, Router,
        StackError, Wired, component,
    };

    // Hooks
    pub use lapis_framework::{
        BodyHook, Hook, HandlerResult, ResultHook, SetUp, TearDown, ValidationHook,
    };
    pub use lapis_framework::{Not, Require, Rules};
}
