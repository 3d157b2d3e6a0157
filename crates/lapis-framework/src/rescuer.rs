//! Error-to-response translation.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{DispatchError, ErrorItem, Unrescuable};
use lapis_core::codes;
use lapis_core::foundation::Connection;

/// The terminal translator from a failure to a response.
pub trait Rescuer: Send + Sync {
    /// Writes a response describing `err` onto the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Unrescuable`] when no response can be produced, e.g. without
    /// a connection. The dispatcher propagates it to its caller.
    fn rescue(&self, conn: Option<&Connection>, err: DispatchError) -> Result<(), Unrescuable>;
}

impl<R: Rescuer + ?Sized> Rescuer for std::sync::Arc<R> {
    fn rescue(&self, conn: Option<&Connection>, err: DispatchError) -> Result<(), Unrescuable> {
        (**self).rescue(conn, err)
    }
}

/// Aggregated error payload: `{"errors": [{"code", "message"}, ...]}`.
#[derive(Debug, Serialize)]
struct ErrorStackBody<'a> {
    errors: &'a [ErrorItem],
}

/// Maps an error code onto an HTTP status.
pub fn status_for_code(code: &str) -> u16 {
    match code {
        codes::HTTP_NOT_FOUND => 404,
        codes::HTTP_BAD_REQUEST => 400,
        _ => 500,
    }
}

/// The rescuer used unless the application installs another one.
///
/// Single errors become `{"code", "message"}` and stacks become
/// `{"errors": [...]}`. An explicit status on the error wins over the status
/// derived from its code.
#[derive(Debug, Clone, Default)]
pub struct DefaultRescuer;

impl DefaultRescuer {
    pub fn new() -> Self {
        Self
    }

    fn payload(err: &DispatchError) -> Result<Value, serde_json::Error> {
        match err {
            DispatchError::Stack(stack) => serde_json::to_value(ErrorStackBody {
                errors: &stack.errors,
            }),
            _ => serde_json::to_value(ErrorItem::new(err.code(), err.message())),
        }
    }
}

impl Rescuer for DefaultRescuer {
    fn rescue(&self, conn: Option<&Connection>, err: DispatchError) -> Result<(), Unrescuable> {
        let Some(conn) = conn else {
            error!(error = %err, "Rescue attempted without a connection");
            return Err(err.into());
        };

        let status = err.status().unwrap_or_else(|| status_for_code(err.code()));
        let payload = match Self::payload(&err) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Error payload could not be serialized");
                return Err(err.into());
            }
        };

        if status >= 500 {
            warn!(status, code = err.code(), error = %err, "Request failed");
        } else {
            debug!(status, code = err.code(), error = %err, "Request rejected");
        }

        let mut response = conn.response();
        response.set_status(status);
        response.set_content_type(codes::CONTENT_TYPE_JSON);
        response.set_content(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HttpError, StackError};
    use lapis_core::foundation::{BufferedWriter, Request};
    use serde_json::json;
    use std::sync::Arc;

    fn conn() -> Connection {
        Connection::new(Request::new("GET", "/"), Arc::new(BufferedWriter::new()))
    }

    fn content(conn: &Connection) -> Value {
        conn.response()
            .content()
            .and_then(|c| c.as_value())
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_missing_connection_is_unrescuable() {
        let err = DefaultRescuer
            .rescue(None, DispatchError::Panic("boom".into()))
            .unwrap_err();
        assert!(matches!(err.source, DispatchError::Panic(_)));
    }

    #[test]
    fn test_not_found_payload() {
        let conn = conn();
        let err = DispatchError::NotFound {
            method: "GET".into(),
            uri: "/users/abc".into(),
        };
        DefaultRescuer.rescue(Some(&conn), err).unwrap();

        assert_eq!(conn.response().status(), 404);
        assert_eq!(
            content(&conn),
            json!({"code": codes::HTTP_NOT_FOUND, "message": "no route matches GET /users/abc"})
        );
    }

    #[test]
    fn test_status_resolution() {
        let conn = conn();
        let err = HttpError::new("9.000.001", "locked").with_status(423);
        DefaultRescuer.rescue(Some(&conn), err.into()).unwrap();
        assert_eq!(conn.response().status(), 423);

        let conn = self::conn();
        let err = DispatchError::other(std::io::Error::other("disk full"));
        DefaultRescuer.rescue(Some(&conn), err).unwrap();
        assert_eq!(conn.response().status(), 500);
        assert_eq!(content(&conn)["code"], json!(codes::HTTP_UNKNOWN_ERROR));
    }

    #[test]
    fn test_stack_payload() {
        let conn = conn();
        let mut stack = StackError::new().with_status(400);
        stack.push(codes::HTTP_BAD_REQUEST, "name is required");
        stack.push(codes::HTTP_BAD_REQUEST, "email is required");
        DefaultRescuer.rescue(Some(&conn), stack.into()).unwrap();

        assert_eq!(conn.response().status(), 400);
        assert_eq!(
            content(&conn),
            json!({"errors": [
                {"code": codes::HTTP_BAD_REQUEST, "message": "name is required"},
                {"code": codes::HTTP_BAD_REQUEST, "message": "email is required"},
            ]})
        );
    }
}
