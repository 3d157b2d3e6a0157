//! Inbound request.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::bag::ParamBag;
use super::header::Header;

const HEADER_CONTENT_TYPE: &str = "Content-Type";
const HEADER_HOST: &str = "Host";

/// One inbound request as seen by routes, hooks and handlers.
///
/// The request target is split into a path and a query string; query
/// parameters are decoded into the [`ParamBag`] immediately.
#[derive(Clone, Default)]
pub struct Request {
    method: String,
    uri: String,
    query: Option<String>,
    host: String,
    headers: Header,
    body: Vec<u8>,
    params: ParamBag,
    input: Option<Value>,
    route: Option<Arc<dyn Any + Send + Sync>>,
}

impl Request {
    /// Creates a request from a method and a request target such as
    /// `/users?page=2`.
    pub fn new(method: impl AsRef<str>, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (uri, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        let params = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            method: method.as_ref().to_ascii_uppercase(),
            uri: uri.to_string(),
            query: query.map(str::to_string),
            params,
            ..Default::default()
        }
    }

    /// Sets the host (builder pattern).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets a header (builder pattern). A `Host` header also sets the host.
    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if key.eq_ignore_ascii_case(HEADER_HOST) {
            self.host = value.clone();
        }
        self.headers.set(key, value);
        self
    }

    /// Sets the raw body (builder pattern).
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the `Content-Type` header (builder pattern).
    pub fn with_content_type(self, content_type: &str) -> Self {
        self.with_header(HEADER_CONTENT_TYPE, content_type)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path without the query string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn headers(&self) -> &Header {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Header {
        &mut self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(HEADER_CONTENT_TYPE)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamBag {
        &mut self.params
    }

    /// The decoded body, once a hook has read it.
    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    pub fn set_input(&mut self, input: Value) {
        self.input = Some(input);
    }

    /// Attaches the route that matched this request.
    pub fn attach_route<R: Any + Send + Sync>(&mut self, route: Arc<R>) {
        self.route = Some(route);
    }

    /// The matched route, if one of type `R` was attached.
    pub fn route<R: Any + Send + Sync>(&self) -> Option<Arc<R>> {
        self.route
            .as_ref()
            .and_then(|route| Arc::clone(route).downcast::<R>().ok())
    }

    pub fn is_routed(&self) -> bool {
        self.route.is_some()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("query", &self.query)
            .field("host", &self.host)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("params", &self.params)
            .field("routed", &self.route.is_some())
            .finish()
    }
}
