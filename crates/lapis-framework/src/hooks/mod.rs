//! Built-in hooks.
//!
//! - [`BodyHook`]: decodes the request body into the request input
//! - [`ValidationHook`]: checks parameters and input against [`Rules`](crate::validation::Rules)
//! - [`ResultHook`]: writes the handler result, or its coded errors, into the response
//!
//! Their default priorities order them body first, then validation:
//!
//! ```text
//! BODY_PRIORITY (-200) ─► VALIDATION_PRIORITY (-100) ─► DEFAULT_PRIORITY (0)
//! ```

mod body;
mod result;
mod validation;

pub use body::BodyHook;
pub use result::ResultHook;
pub use validation::ValidationHook;

/// Tier of [`BodyHook`] unless overridden.
pub const BODY_PRIORITY: i32 = -200;

/// Tier of [`ValidationHook`] unless overridden.
pub const VALIDATION_PRIORITY: i32 = -100;
