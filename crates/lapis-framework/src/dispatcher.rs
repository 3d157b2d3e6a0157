//! Request dispatcher for the Lapis framework.
//!
//! The [`Dispatcher`] drives one request through its lifecycle:
//!
//! ```text
//! Received ─► Routed ─► PreHooked ─► Handled ─► PostHooked ─► Sent
//!    │           │          │  └─ response already sent ─────────►│
//!    │           └──────────┴──────────┴───────────┴─► Rescued ───►│
//!    └─ panics anywhere above are caught once and rescued
//! ```
//!
//! Every path ends with exactly one flush attempt.
//!
//! ```rust,ignore
//! use lapis_framework::{Dispatcher, Router};
//!
//! let dispatcher = Dispatcher::new(router.freeze()?, container);
//! let writer = Arc::new(BufferedWriter::new());
//! dispatcher.dispatch(Request::new("GET", "/users/42"), writer.clone()).await?;
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use crate::error::{DispatchError, DispatchResult, Unrescuable};
use crate::hook;
use crate::rescuer::{DefaultRescuer, Rescuer};
use crate::router::RouteTable;
use lapis_core::codec::CodecRegistry;
use lapis_core::container::Container;
use lapis_core::error::SendError;
use lapis_core::foundation::{Connection, Request, Response, ResponseWriter};
use lapis_core::scheduler::run_tiers;

/// Lifecycle stages of one request, as they appear in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Routed,
    PreHooked,
    Handled,
    PostHooked,
    Rescued,
    Sent,
}

/// Routes requests, runs hooks and handlers, and rescues failures.
///
/// # Thread Safety
///
/// `Dispatcher` is `Send + Sync`; one instance serves every request
/// concurrently. Nothing it holds is mutated while serving.
pub struct Dispatcher {
    table: Arc<RouteTable>,
    container: Arc<Container>,
    rescuer: Arc<dyn Rescuer>,
    codecs: Arc<CodecRegistry>,
    response: Response,
}

impl Dispatcher {
    /// Creates a dispatcher with the default rescuer and codecs.
    pub fn new(table: impl Into<Arc<RouteTable>>, container: Arc<Container>) -> Self {
        Self {
            table: table.into(),
            container,
            rescuer: Arc::new(DefaultRescuer::new()),
            codecs: Arc::new(CodecRegistry::with_defaults()),
            response: Response::new(),
        }
    }

    /// Replaces the rescuer (builder pattern).
    pub fn with_rescuer<R: Rescuer + 'static>(mut self, rescuer: R) -> Self {
        self.rescuer = Arc::new(rescuer);
        self
    }

    /// Replaces the codec registry (builder pattern).
    pub fn with_codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.codecs = codecs;
        self
    }

    /// Sets the response every connection starts from (builder pattern).
    pub fn with_default_response(mut self, response: Response) -> Self {
        self.response = response;
        self
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Builds a connection for `request` and serves it.
    pub async fn dispatch(
        &self,
        request: Request,
        writer: Arc<dyn ResponseWriter>,
    ) -> Result<(), Unrescuable> {
        let conn = Connection::new(request, writer)
            .with_codecs(Arc::clone(&self.codecs))
            .with_response(self.response.clone());
        self.serve(Arc::new(conn)).await
    }

    /// Serves an existing connection.
    ///
    /// # Errors
    ///
    /// Only [`Unrescuable`]: every other failure is turned into a response
    /// by the rescuer. The flush is attempted before the error is returned.
    pub async fn serve(&self, conn: Arc<Connection>) -> Result<(), Unrescuable> {
        let span = {
            let request = conn.request();
            span!(Level::DEBUG, "dispatch", method = %request.method(), uri = %request.uri())
        };

        async move {
            debug!(stage = ?Stage::Received, "Request received");

            let outcome = AssertUnwindSafe(self.run(&conn))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(DispatchError::Panic(panic_message(&*payload))));

            let rescued = match outcome {
                Ok(()) => Ok(()),
                Err(err) => {
                    debug!(stage = ?Stage::Rescued, code = err.code(), "Rescuing error");
                    self.rescuer.rescue(Some(&conn), err)
                }
            };

            match conn.send().await {
                Ok(()) => debug!(stage = ?Stage::Sent, "Response sent"),
                Err(SendError::AlreadySent) => trace!("Response was sent before the final flush"),
                Err(e) => warn!(error = %e, "Response could not be flushed"),
            }

            if let Err(e) = &rescued {
                error!(error = %e, "Unrescuable dispatch failure");
            }
            rescued
        }
        .instrument(span)
        .await
    }

    async fn run(&self, conn: &Arc<Connection>) -> DispatchResult<()> {
        let route = self.table.route(conn)?;
        debug!(stage = ?Stage::Routed, route = route.name());

        run_tiers(route.hooks(), |hook| hook::set_up(hook, conn)).await?;
        if conn.is_sent() {
            debug!("Response sent by a set-up hook, handler skipped");
            return Ok(());
        }
        debug!(stage = ?Stage::PreHooked);

        let result = route
            .handler()
            .call(Arc::clone(conn), Arc::clone(&self.container))
            .await;
        debug!(stage = ?Stage::Handled, ok = result.is_ok());

        run_tiers(route.hooks(), |hook| hook::tear_down(hook, conn, &result)).await?;
        debug!(stage = ?Stage::PostHooked);

        match result {
            Ok(value) => {
                let mut response = conn.response();
                if !response.has_content() && !value.is_null() {
                    response.set_content(value);
                }
                Ok(())
            }
            // A tear-down hook that wrote content has already answered.
            Err(_) if conn.is_sent() || conn.response().has_content() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.len())
            .field("container", &self.container)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
