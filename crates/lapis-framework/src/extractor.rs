//! Extractor system for the Lapis framework.
//!
//! This module provides the [`FromConnection`] trait, which defines how types
//! can be extracted from a [`Connection`] (and the [`Container`]) for use as
//! handler parameters.

use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{DispatchError, DispatchResult, HttpError};
use lapis_core::container::{Container, Injectable};
use lapis_core::foundation::{Connection, ParamBag};

/// A trait for types that can be extracted for a handler invocation.
///
/// Extraction failures abort the request: the error is handed to the
/// rescuer like any handler error.
///
/// # Example
///
/// ```rust,ignore
/// struct UserId(u64);
///
/// impl FromConnection for UserId {
///     fn from_connection(conn: &Arc<Connection>, _: &Container) -> DispatchResult<Self> {
///         conn.request()
///             .params()
///             .get_str("id")
///             .and_then(|id| id.parse().ok())
///             .map(UserId)
///             .ok_or_else(|| HttpError::bad_request("invalid id").into())
///     }
/// }
/// ```
pub trait FromConnection: Sized {
    /// Attempts to extract this type.
    fn from_connection(conn: &Arc<Connection>, container: &Container) -> DispatchResult<Self>;
}

/// The connection itself.
impl FromConnection for Arc<Connection> {
    fn from_connection(conn: &Arc<Connection>, _: &Container) -> DispatchResult<Self> {
        Ok(Arc::clone(conn))
    }
}

/// Optional parameters never fail; a failed extraction yields `None`.
impl<T: FromConnection> FromConnection for Option<T> {
    fn from_connection(conn: &Arc<Connection>, container: &Container) -> DispatchResult<Self> {
        Ok(T::from_connection(conn, container).ok())
    }
}

// ============================================================================
// Dep
// ============================================================================

/// A dependency resolved from the container.
///
/// ```rust,ignore
/// async fn show(Dep(users): Dep<dyn UserStore>, Params(params): Params) -> Result<User, HttpError> {
///     users.find(params.get_str("id").unwrap_or_default())
/// }
/// ```
pub struct Dep<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Deref for Dep<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> Clone for Dep<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromConnection for Dep<T> {
    fn from_connection(_: &Arc<Connection>, container: &Container) -> DispatchResult<Self> {
        Ok(Self(container.resolve::<T>()?))
    }
}

// ============================================================================
// Wired
// ============================================================================

/// A fresh component with its `#[inject]` fields wired.
pub struct Wired<C>(pub C);

impl<C> Deref for Wired<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C: Injectable + Default> FromConnection for Wired<C> {
    fn from_connection(_: &Arc<Connection>, container: &Container) -> DispatchResult<Self> {
        Ok(Self(container.build::<C>()?))
    }
}

// ============================================================================
// Params / Input
// ============================================================================

/// A snapshot of the request parameters (query string and path captures).
#[derive(Debug, Clone)]
pub struct Params(pub ParamBag);

impl Deref for Params {
    type Target = ParamBag;

    fn deref(&self) -> &ParamBag {
        &self.0
    }
}

impl FromConnection for Params {
    fn from_connection(conn: &Arc<Connection>, _: &Container) -> DispatchResult<Self> {
        Ok(Self(conn.request().params().clone()))
    }
}

/// The request body, deserialized.
///
/// Uses the input decoded by a body hook when present, otherwise decodes the
/// raw body with the codec for the request content type. A missing or
/// malformed body is a bad request.
#[derive(Debug, Clone)]
pub struct Input<T>(pub T);

impl<T> Deref for Input<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned> FromConnection for Input<T> {
    fn from_connection(conn: &Arc<Connection>, _: &Container) -> DispatchResult<Self> {
        let decoded = conn.request().input().cloned();
        let value = match decoded {
            Some(value) => value,
            None => conn
                .read_input()?
                .ok_or_else(|| HttpError::bad_request("request body is empty"))?,
        };

        serde_json::from_value(value)
            .map(Self)
            .map_err(|e| DispatchError::from(HttpError::bad_request(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapis_core::foundation::{BufferedWriter, Request};
    use serde::Deserialize;

    fn conn(request: Request) -> Arc<Connection> {
        Arc::new(Connection::new(request, Arc::new(BufferedWriter::new())))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
    }

    #[test]
    fn test_dep_unbound() {
        let container = Container::new();
        let err = Dep::<String>::from_connection(&conn(Request::new("GET", "/")), &container)
            .err()
            .unwrap();
        assert!(matches!(err, DispatchError::Resolution(_)));
    }

    #[test]
    fn test_input_decodes_body() {
        let container = Container::new();
        let conn = conn(
            Request::new("POST", "/users")
                .with_content_type("application/json")
                .with_body(r#"{"name":"ada"}"#),
        );
        let Input(user) = Input::<NewUser>::from_connection(&conn, &container).unwrap();
        assert_eq!(user.name, "ada");
    }

    #[test]
    fn test_input_shape_mismatch_is_bad_request() {
        let container = Container::new();
        let conn = conn(Request::new("POST", "/users").with_body(r#"{"id":1}"#));
        let err = Input::<NewUser>::from_connection(&conn, &container).unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_optional_extraction() {
        let container = Container::new();
        let conn = conn(Request::new("GET", "/"));
        let missing = Option::<Dep<String>>::from_connection(&conn, &container).unwrap();
        assert!(missing.is_none());
    }
}
