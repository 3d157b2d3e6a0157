//! Tower integration.
//!
//! [`DispatchService`] exposes a [`Dispatcher`] as a
//! `tower::Service<Request>` answering with the encoded [`Outgoing`]
//! response, so transports and tower middleware can drive it directly:
//!
//! ```rust,ignore
//! use tower::{ServiceBuilder, ServiceExt};
//! use tower::timeout::TimeoutLayer;
//!
//! let svc = ServiceBuilder::new()
//!     .layer(TimeoutLayer::new(Duration::from_secs(5)))
//!     .service(DispatchService::new(dispatcher));
//!
//! let outgoing = svc.oneshot(Request::new("GET", "/users/42")).await?;
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceExt};

use crate::dispatcher::Dispatcher;
use crate::error::Unrescuable;
use crate::handler::BoxFuture;
use lapis_core::foundation::{BufferedWriter, Header, Outgoing, Request};

/// A type-erased, `Clone + Send + Sync` request service.
pub type BoxedDispatchService = BoxCloneSyncService<Request, Outgoing, BoxError>;

/// A cheaply clonable tower service over a shared [`Dispatcher`].
#[derive(Clone)]
pub struct DispatchService {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchService {
    pub fn new(dispatcher: impl Into<Arc<Dispatcher>>) -> Self {
        Self {
            dispatcher: dispatcher.into(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Erases the service type, converting errors into [`BoxError`].
    pub fn boxed(self) -> BoxedDispatchService {
        BoxCloneSyncService::new(self.map_err(BoxError::from))
    }
}

impl Service<Request> for DispatchService {
    type Response = Outgoing;
    type Error = Unrescuable;
    type Future = BoxFuture<'static, Result<Outgoing, Unrescuable>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        Box::pin(async move {
            let writer = Arc::new(BufferedWriter::new());
            dispatcher.dispatch(request, writer.clone()).await?;

            // Nothing is written when encoding the response failed.
            Ok(writer.take().unwrap_or_else(|| Outgoing {
                status: 500,
                message: None,
                headers: Header::new(),
                body: Vec::new(),
            }))
        })
    }
}
