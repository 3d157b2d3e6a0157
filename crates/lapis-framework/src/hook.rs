//! Hook capabilities.
//!
//! A hook wraps the handler of a route. It may take part before the handler
//! ([`SetUp`]), after it ([`TearDown`]), both, or neither, in which case it is
//! inert. Hooks of one route are grouped into priority tiers: tiers run in
//! ascending order and the hooks of a tier run concurrently.
//!
//! ```rust,ignore
//! struct RequestTimer;
//!
//! #[async_trait]
//! impl SetUp for RequestTimer {
//!     async fn set_up(&self, conn: &Connection) -> DispatchResult<()> {
//!         conn.request_mut().params_mut().set("started_at", now());
//!         Ok(())
//!     }
//! }
//!
//! impl Prioritized for RequestTimer {
//!     fn priority(&self) -> i32 { -10 }
//! }
//!
//! impl Hook for RequestTimer {
//!     fn as_set_up(&self) -> Option<&dyn SetUp> { Some(self) }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DispatchError, DispatchResult};
use lapis_core::foundation::Connection;
use lapis_core::scheduler::Prioritized;

/// What a handler produced: its serialized output or its error.
pub type HandlerResult = Result<Value, DispatchError>;

/// Runs before the handler.
#[async_trait]
pub trait SetUp: Send + Sync {
    /// Returning an error skips the handler and rescues the error.
    async fn set_up(&self, conn: &Connection) -> DispatchResult<()>;
}

/// Runs after the handler, seeing its result.
#[async_trait]
pub trait TearDown: Send + Sync {
    /// A tear-down may write the result into the response, translate the
    /// handler error into a response, or fail itself.
    async fn tear_down(&self, conn: &Connection, result: &HandlerResult) -> DispatchResult<()>;
}

/// A unit of middleware attached to a route.
pub trait Hook: Prioritized + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The pre-handler capability, if any.
    fn as_set_up(&self) -> Option<&dyn SetUp> {
        None
    }

    /// The post-handler capability, if any.
    fn as_tear_down(&self) -> Option<&dyn TearDown> {
        None
    }
}

/// A shared, type-erased hook.
pub type BoxedHook = Arc<dyn Hook>;

/// Runs the set-up capability of `hook`, if it has one.
pub(crate) async fn set_up(hook: &BoxedHook, conn: &Connection) -> DispatchResult<()> {
    match hook.as_set_up() {
        Some(set_up) => set_up.set_up(conn).await,
        None => Ok(()),
    }
}

/// Runs the tear-down capability of `hook`, if it has one.
pub(crate) async fn tear_down(
    hook: &BoxedHook,
    conn: &Connection,
    result: &HandlerResult,
) -> DispatchResult<()> {
    match hook.as_tear_down() {
        Some(tear_down) => tear_down.tear_down(conn, result).await,
        None => Ok(()),
    }
}
