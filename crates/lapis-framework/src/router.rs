//! Route registration and the frozen route table.
//!
//! Routes are registered on a mutable [`Router`] during startup, then frozen
//! into an immutable [`RouteTable`] that request workers share. Registration
//! problems (bad patterns, duplicate names) are collected while registering
//! and reported together by [`Router::freeze`], so no request is ever served
//! by a table that failed validation.
//!
//! ```rust,ignore
//! let mut router = Router::new();
//! router.get(r"/users/<id:\d+>", show_user).name("users.show");
//!
//! let mut api = router.group("/api/v1");
//! api.post("/users", create_user).hook(BodyHook::new());
//!
//! let table = router.freeze()?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{DispatchError, DispatchResult, RegistrationError, RegistrationResult};
use crate::handler::{BoxedHandler, IntoHandler};
use crate::hook::{BoxedHook, Hook};
use crate::route::{Captures, Pattern, Route};
use lapis_core::foundation::{Connection, Request};

// =============================================================================
// Registration surface
// =============================================================================

/// Anything routes can be registered on: a [`Router`] or one of its groups.
pub trait Registrar {
    /// Registers an already boxed handler.
    fn register_boxed(&mut self, method: &str, uri: &str, handler: BoxedHandler) -> RouteMut<'_>;

    /// Returns a registrar that prepends `prefix` to every uri.
    fn group(&mut self, prefix: &str) -> Group<'_>;

    /// Registers `handler` for `method` and `uri`.
    fn register<H, T>(&mut self, method: &str, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register_boxed(method, uri, handler.into_handler())
    }

    fn get<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("GET", uri, handler)
    }

    fn post<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("POST", uri, handler)
    }

    fn put<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("PUT", uri, handler)
    }

    fn patch<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("PATCH", uri, handler)
    }

    fn delete<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("DELETE", uri, handler)
    }

    fn head<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("HEAD", uri, handler)
    }

    fn options<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("OPTIONS", uri, handler)
    }

    /// Registers a route matching every method.
    fn any<H, T>(&mut self, uri: &str, handler: H) -> RouteMut<'_>
    where
        H: IntoHandler<T>,
        Self: Sized,
    {
        self.register("", uri, handler)
    }
}

/// Fluent access to a freshly registered route.
pub struct RouteMut<'a> {
    route: &'a mut Route,
    errors: &'a mut Vec<RegistrationError>,
}

impl<'a> RouteMut<'a> {
    /// Replaces the default name.
    pub fn name(self, name: impl Into<String>) -> Self {
        self.route.set_name(name.into());
        self
    }

    /// Restricts the route to hosts matching `pattern`.
    ///
    /// An invalid pattern is reported by [`Router::freeze`]; until then the
    /// route matches no host.
    pub fn host(self, pattern: &str) -> Self {
        match Pattern::compile(pattern) {
            Ok(host) => self.route.set_host(host),
            Err(e) => {
                self.errors.push(e);
                self.route.set_host(Pattern::never(pattern));
            }
        }
        self
    }

    pub fn hook<H: Hook + 'static>(self, hook: H) -> Self {
        self.hook_arc(Arc::new(hook))
    }

    pub fn hook_arc(self, hook: BoxedHook) -> Self {
        self.route.add_hook(hook);
        self
    }

    pub fn hooks(self, hooks: impl IntoIterator<Item = BoxedHook>) -> Self {
        for hook in hooks {
            self.route.add_hook(hook);
        }
        self
    }

    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.route.add_tag(tag.into());
        self
    }

    pub fn tags<S: Into<String>>(self, tags: impl IntoIterator<Item = S>) -> Self {
        for tag in tags {
            self.route.add_tag(tag.into());
        }
        self
    }

    /// The route as registered so far.
    pub fn route(&self) -> &Route {
        self.route
    }
}

// =============================================================================
// Router
// =============================================================================

/// The mutable, startup-time collection of routes.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    hooks: Vec<BoxedHook>,
    tags: Vec<String>,
    errors: Vec<RegistrationError>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `hook` to every route, including routes registered later.
    pub fn hook<H: Hook + 'static>(&mut self, hook: H) -> &mut Self {
        let hook: BoxedHook = Arc::new(hook);
        for route in &mut self.routes {
            route.add_hook(Arc::clone(&hook));
        }
        self.hooks.push(hook);
        self
    }

    /// Adds `tag` to every route, including routes registered later.
    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        let tag = tag.into();
        for route in &mut self.routes {
            route.add_tag(tag.clone());
        }
        self.tags.push(tag);
        self
    }

    /// Appends a prebuilt route.
    pub fn add(&mut self, mut route: Route) -> &mut Route {
        self.apply_shared(&mut route);
        let index = self.routes.len();
        self.routes.push(route);
        &mut self.routes[index]
    }

    /// Appends a prebuilt route (builder pattern).
    pub fn with_route(mut self, route: Route) -> Self {
        self.add(route);
        self
    }

    /// Replaces the route called `name`, or appends `route` if there is none.
    pub fn set(&mut self, name: &str, route: Route) {
        let mut route = route.with_name(name);
        self.apply_shared(&mut route);
        match self.routes.iter().position(|r| r.name() == name) {
            Some(index) => self.routes[index] = route,
            None => self.routes.push(route),
        }
    }

    /// Removes the route called `name`.
    pub fn remove(&mut self, name: &str) -> Option<Route> {
        let index = self.routes.iter().position(|r| r.name() == name)?;
        Some(self.routes.remove(index))
    }

    /// Copies every route of `other` after the routes of this router.
    pub fn merge(&mut self, other: Router) -> &mut Self {
        self.errors.extend(other.errors);
        for route in other.routes {
            self.add(route);
        }
        self
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name() == name)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Route> {
        self.routes.iter_mut().find(|r| r.name() == name)
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Validates the registrations and produces the immutable table.
    ///
    /// # Errors
    ///
    /// The first recorded pattern error, or
    /// [`RegistrationError::DuplicateRouteName`] for the first name shared
    /// by two routes.
    pub fn freeze(self) -> RegistrationResult<RouteTable> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let mut seen = HashSet::with_capacity(self.routes.len());
        for route in &self.routes {
            if !seen.insert(route.name()) {
                return Err(RegistrationError::DuplicateRouteName {
                    name: route.name().to_string(),
                });
            }
        }

        debug!(routes = self.routes.len(), "Route table frozen");
        Ok(RouteTable::new(self.routes))
    }

    fn apply_shared(&self, route: &mut Route) {
        for hook in &self.hooks {
            route.add_hook(Arc::clone(hook));
        }
        for tag in &self.tags {
            route.add_tag(tag.clone());
        }
    }
}

impl Registrar for Router {
    fn register_boxed(&mut self, method: &str, uri: &str, handler: BoxedHandler) -> RouteMut<'_> {
        let pattern = match Pattern::compile(uri) {
            Ok(pattern) => pattern,
            Err(e) => {
                self.errors.push(e);
                Pattern::never(uri)
            }
        };

        let mut route = Route::with_pattern(method, pattern, handler);
        self.apply_shared(&mut route);
        trace!(name = route.name(), "Route registered");

        let index = self.routes.len();
        self.routes.push(route);
        RouteMut {
            route: &mut self.routes[index],
            errors: &mut self.errors,
        }
    }

    fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            router: self,
            prefix: prefix.to_string(),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("errors", &self.errors)
            .finish()
    }
}

/// A registrar that forwards to its router with a uri prefix.
pub struct Group<'a> {
    router: &'a mut Router,
    prefix: String,
}

impl Group<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Registrar for Group<'_> {
    fn register_boxed(&mut self, method: &str, uri: &str, handler: BoxedHandler) -> RouteMut<'_> {
        let uri = format!("{}{uri}", self.prefix);
        self.router.register_boxed(method, &uri, handler)
    }

    fn group(&mut self, prefix: &str) -> Group<'_> {
        Group {
            router: &mut *self.router,
            prefix: format!("{}{prefix}", self.prefix),
        }
    }
}

// =============================================================================
// RouteTable
// =============================================================================

/// The immutable route table used while serving.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    fn new(routes: Vec<Route>) -> Self {
        let index = routes
            .iter()
            .enumerate()
            .map(|(i, route)| (route.name().to_string(), i))
            .collect();
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
            index,
        }
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Route>> {
        self.index.get(name).map(|&i| &self.routes[i])
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The first route, in registration order, that matches `request`.
    pub fn match_request(&self, request: &Request) -> Option<(&Arc<Route>, Captures)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(request).map(|captures| (route, captures)))
    }

    /// Matches the connection's request, writes the captures into its
    /// parameters and attaches the route.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] when no route matches.
    pub fn route(&self, conn: &Connection) -> DispatchResult<Arc<Route>> {
        let found = {
            let request = conn.request();
            self.match_request(&request)
                .map(|(route, captures)| (Arc::clone(route), captures))
        };

        let mut request = conn.request_mut();
        match found {
            Some((route, captures)) => {
                for (name, value) in captures {
                    request.params_mut().set(name, value);
                }
                request.attach_route(Arc::clone(&route));
                debug!(route = route.name(), "Request routed");
                Ok(route)
            }
            None => Err(DispatchError::NotFound {
                method: request.method().to_string(),
                uri: request.uri().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::handler::into_handler;
    use lapis_core::foundation::BufferedWriter;
    use lapis_core::scheduler::Prioritized;

    async fn noop() -> Result<(), HttpError> {
        Ok(())
    }

    fn conn(request: Request) -> Connection {
        Connection::new(request, Arc::new(BufferedWriter::new()))
    }

    struct Inert;

    impl Prioritized for Inert {}
    impl Hook for Inert {}

    #[test]
    fn test_duplicate_names_fail_freeze() {
        let mut router = Router::new();
        router.get("/a", noop).name("same");
        router.post("/b", noop).name("same");

        let err = router.freeze().unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateRouteName {
                name: "same".to_string()
            }
        );
    }

    #[test]
    fn test_default_names_collide() {
        let mut router = Router::new();
        router.get("/a", noop);
        router.get("/a", noop);
        assert!(router.freeze().is_err());
    }

    #[test]
    fn test_invalid_pattern_fails_freeze() {
        let mut router = Router::new();
        router.get("/ok", noop);
        router.get("/bad/<id:(>", noop);
        router.get("/host", noop).host("(");

        let err = router.freeze().unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPattern { pattern, .. } if pattern == "/bad/<id:(>"));
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = Router::new();
        router.get(r"/users/<id:\d+>", noop).name("numeric");
        router.get(r"/users/<id:.+>", noop).name("any");
        let table = router.freeze().unwrap();

        for _ in 0..3 {
            let conn = conn(Request::new("GET", "/users/42"));
            assert_eq!(table.route(&conn).unwrap().name(), "numeric");
        }
        let conn = conn(Request::new("GET", "/users/ada"));
        assert_eq!(table.route(&conn).unwrap().name(), "any");
    }

    #[test]
    fn test_route_populates_params_and_attaches() {
        let mut router = Router::new();
        router.get(r"/users/<id:\d+>", noop);
        let table = router.freeze().unwrap();

        let conn = conn(Request::new("GET", "/users/42?id=7&page=2"));
        let route = table.route(&conn).unwrap();

        let request = conn.request();
        assert_eq!(request.params().get_str("id"), Some("42"));
        assert_eq!(request.params().get_str("page"), Some("2"));
        assert_eq!(request.params().len(), 2);
        let attached = request.route::<Route>().unwrap();
        assert!(Arc::ptr_eq(&attached, &route));
    }

    #[test]
    fn test_not_found() {
        let mut router = Router::new();
        router.get(r"/users/<id:\d+>", noop);
        let table = router.freeze().unwrap();

        let conn = conn(Request::new("GET", "/users/abc"));
        let err = table.route(&conn).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { ref uri, .. } if uri == "/users/abc"));
        assert!(!conn.request().is_routed());
    }

    #[test]
    fn test_groups_prefix_uris() {
        let mut router = Router::new();
        {
            let mut api = router.group("/api");
            api.get("/health", noop);
            let mut v1 = api.group("/v1");
            v1.delete(r"/users/<id:\d+>", noop).name("users.delete");
        }
        let table = router.freeze().unwrap();

        assert!(table.by_name("GET__api_health").is_some());
        let delete = table.by_name("users.delete").unwrap();
        assert_eq!(delete.uri().source(), r"/api/v1/users/<id:\d+>");
        assert_eq!(delete.method(), "DELETE");
    }

    #[test]
    fn test_router_wide_hooks_and_tags() {
        let mut router = Router::new();
        router.get("/before", noop);
        router.hook(Inert).tag("api");
        router.get("/after", noop).tag("public");

        for route in router.routes() {
            assert_eq!(route.hooks().len(), 1);
            assert!(route.has_tag("api"));
        }
        assert!(router.by_name("GET__after").unwrap().has_tag("public"));
    }

    #[test]
    fn test_set_keeps_router_wide_hooks_and_tags() {
        let mut router = Router::new();
        router.hook(Inert).tag("api");
        router.get("/a", noop).name("a");

        router.set("a", Route::new("GET", "/b", into_handler(noop)).unwrap());
        router.set("fresh", Route::new("GET", "/c", into_handler(noop)).unwrap());

        for name in ["a", "fresh"] {
            let route = router.by_name(name).unwrap();
            assert_eq!(route.hooks().len(), 1);
            assert!(route.has_tag("api"));
        }
        assert_eq!(router.by_name("a").unwrap().uri().source(), "/b");
    }

    #[test]
    fn test_set_remove_merge() {
        let mut router = Router::new();
        router.get("/a", noop).name("a");

        router.set("a", Route::new("GET", "/replaced", into_handler(noop)).unwrap());
        assert_eq!(router.len(), 1);
        assert_eq!(router.by_name("a").unwrap().uri().source(), "/replaced");

        let mut other = Router::new();
        other.any("/b", noop).name("b");
        router.merge(other);
        assert_eq!(router.len(), 2);

        assert!(router.remove("a").is_some());
        assert!(router.remove("a").is_none());

        let table = router
            .with_route(Route::new("GET", "/c", into_handler(noop)).unwrap())
            .freeze()
            .unwrap();
        assert_eq!(
            table.routes().iter().map(|r| r.name()).collect::<Vec<_>>(),
            ["b", "GET__c"]
        );
    }
}
