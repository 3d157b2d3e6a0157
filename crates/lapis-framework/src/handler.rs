//! Handler system for the Lapis framework.
//!
//! Two kinds of handlers can be attached to a route:
//!
//! - **Function handlers**: any async function whose parameters implement
//!   [`FromConnection`] and which returns `Result<R, E>` with `R: Serialize`
//!   and `E: Into<DispatchError>`.
//! - **Component handlers**: a struct implementing [`Handle`]; a fresh
//!   instance is built and wired from the container for every request.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn show_user(
//!     Dep(users): Dep<dyn UserStore>,
//!     Params(params): Params,
//! ) -> Result<User, HttpError> {
//!     users.find(params.get_str("id").unwrap_or_default())
//! }
//!
//! #[derive(Default, Injectable)]
//! struct ListUsers {
//!     #[inject]
//!     users: Option<Arc<dyn UserStore>>,
//! }
//!
//! #[async_trait]
//! impl Handle for ListUsers {
//!     type Output = Vec<User>;
//!
//!     async fn handle(&self, _conn: &Connection) -> DispatchResult<Vec<User>> {
//!         Ok(self.users.as_ref().map(|u| u.all()).unwrap_or_default())
//!     }
//! }
//!
//! router.get("/users/<id:\\d+>", show_user);
//! router.get("/users", component::<ListUsers>());
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{DispatchError, DispatchResult};
use crate::extractor::FromConnection;
use crate::hook::HandlerResult;
use lapis_core::container::{Container, Injectable};
use lapis_core::error::CodecError;
use lapis_core::foundation::Connection;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Serializes a handler output into a [`HandlerResult`].
pub fn into_result<R: Serialize>(output: R) -> HandlerResult {
    serde_json::to_value(output).map_err(|e| CodecError::Encode(e.to_string()).into())
}

// ============================================================================
// Handler Trait
// ============================================================================

/// The trait implemented by function handlers.
///
/// # Blanket Implementation
///
/// Implemented for async functions that:
/// - Take 0-12 parameters that implement [`FromConnection`]
/// - Return `Result<R, E>` where `R: Serialize` and `E: Into<DispatchError>`
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// The type of future calling this handler returns.
    type Future: Future<Output = HandlerResult> + Send + 'static;

    /// Extracts the parameters and calls the handler.
    fn call(self, conn: Arc<Connection>, container: Arc<Container>) -> Self::Future;
}

// ============================================================================
// Type erasure
// ============================================================================

/// A type-erased handler that can be stored in a route.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Type-erased handler trait for dynamic dispatch.
pub trait ErasedHandler: Send + Sync {
    /// Executes the handler for one connection.
    fn call(&self, conn: Arc<Connection>, container: Arc<Container>)
    -> BoxFuture<'static, HandlerResult>;
}

/// A wrapper that stores a function handler behind [`ErasedHandler`].
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, T> Clone for HandlerFn<F, T> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

impl<F, T> ErasedHandler for HandlerFn<F, T>
where
    F: Handler<T>,
    T: 'static,
{
    fn call(
        &self,
        conn: Arc<Connection>,
        container: Arc<Container>,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self.f.clone().call(conn, container))
    }
}

/// Converts a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}

/// Conversion into a [`BoxedHandler`], used by the registration surface.
pub trait IntoHandler<T> {
    fn into_handler(self) -> BoxedHandler;
}

impl<F, T> IntoHandler<T> for F
where
    F: Handler<T>,
    T: 'static,
{
    fn into_handler(self) -> BoxedHandler {
        into_handler(self)
    }
}

/// Marker for handlers that are already boxed.
pub struct Boxed;

impl IntoHandler<Boxed> for BoxedHandler {
    fn into_handler(self) -> BoxedHandler {
        self
    }
}

// ============================================================================
// Component handlers
// ============================================================================

/// A handler written as a struct whose dependencies are injected.
#[async_trait]
pub trait Handle: Injectable + Default {
    /// The serialized output.
    type Output: Serialize + Send;

    async fn handle(&self, conn: &Connection) -> DispatchResult<Self::Output>;
}

/// Builds a fresh `H` per request, wires it and calls [`Handle::handle`].
pub struct Component<H>(PhantomData<fn() -> H>);

impl<H: Handle> ErasedHandler for Component<H> {
    fn call(
        &self,
        conn: Arc<Connection>,
        container: Arc<Container>,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin(async move {
            let handler = container.build::<H>()?;
            let output = handler.handle(&conn).await?;
            into_result(output)
        })
    }
}

/// Boxes the component handler `H`.
pub fn component<H: Handle>() -> BoxedHandler {
    Arc::new(Component::<H>(PhantomData))
}

// ============================================================================
// Handler implementations for functions
// ============================================================================

/// Generates `Handler` implementations for functions with different arities.
macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, R, E, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: Serialize + Send + 'static,
            E: Into<DispatchError> + Send + 'static,
            $( $ty: FromConnection + Send + 'static, )*
        {
            type Future = BoxFuture<'static, HandlerResult>;

            fn call(self, conn: Arc<Connection>, container: Arc<Container>) -> Self::Future {
                Box::pin(async move {
                    $(
                        let $ty = $ty::from_connection(&conn, &container)?;
                    )*

                    let output = (self)($($ty,)*).await.map_err(Into::into)?;
                    into_result(output)
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::extractor::{Dep, Params};
    use lapis_core::container::Scope;
    use lapis_core::error::ContainerResult;
    use lapis_core::foundation::{BufferedWriter, Request};
    use serde_json::json;

    fn conn(request: Request) -> Arc<Connection> {
        Arc::new(Connection::new(request, Arc::new(BufferedWriter::new())))
    }

    async fn no_params() -> Result<&'static str, HttpError> {
        Ok("pong")
    }

    async fn echo_id(Params(params): Params) -> Result<serde_json::Value, HttpError> {
        Ok(json!({ "id": params.get_str("id") }))
    }

    async fn greet(Dep(name): Dep<String>) -> Result<String, HttpError> {
        Ok(format!("hello {name}"))
    }

    async fn refuse() -> Result<(), HttpError> {
        Err(HttpError::bad_request("nope"))
    }

    #[tokio::test]
    async fn test_function_handlers() {
        let container = Arc::new(Container::new());
        container.singleton(Arc::new("ada".to_string())).unwrap();

        let mut request = Request::new("GET", "/");
        request.params_mut().set("id", "7");
        let conn = conn(request);

        let result = into_handler(no_params)
            .call(Arc::clone(&conn), Arc::clone(&container))
            .await;
        assert_eq!(result.unwrap(), json!("pong"));

        let result = into_handler(echo_id)
            .call(Arc::clone(&conn), Arc::clone(&container))
            .await;
        assert_eq!(result.unwrap(), json!({"id": "7"}));

        let result = into_handler(greet)
            .call(Arc::clone(&conn), Arc::clone(&container))
            .await;
        assert_eq!(result.unwrap(), json!("hello ada"));

        let err = into_handler(refuse)
            .call(conn, container)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[derive(Default)]
    struct Counter {
        name: Option<Arc<String>>,
    }

    impl Injectable for Counter {
        fn inject(&mut self, scope: &mut Scope<'_>) -> ContainerResult<()> {
            self.name = Some(scope.resolve::<String>()?);
            Ok(())
        }
    }

    #[async_trait]
    impl Handle for Counter {
        type Output = usize;

        async fn handle(&self, _conn: &Connection) -> DispatchResult<usize> {
            Ok(self.name.as_ref().map_or(0, |n| n.len()))
        }
    }

    #[tokio::test]
    async fn test_component_handler() {
        let container = Arc::new(Container::new());
        let handler = component::<Counter>();

        let err = handler
            .call(conn(Request::new("GET", "/")), Arc::clone(&container))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Resolution(_)));

        container.singleton(Arc::new("lapis".to_string())).unwrap();
        let result = handler
            .call(conn(Request::new("GET", "/")), container)
            .await;
        assert_eq!(result.unwrap(), json!(5));
    }
}
