//! # Lapis Framework
//!
//! Request dispatch on top of `lapis-core`.
//!
//! This layer provides:
//! - Route patterns with named captures and a first-match-wins route table
//! - Function and component handlers with container-backed extractors
//! - Priority-tiered set-up/tear-down hooks, plus built-in body, validation
//!   and result hooks
//! - The dispatcher lifecycle with panic-safe rescue and a single flush
//! - A `tower::Service` adapter for transports

pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod hook;
pub mod hooks;
pub mod rescuer;
pub mod route;
pub mod router;
pub mod service;
pub mod validation;

pub use dispatcher::{Dispatcher, Stage};
pub use error::{
    DispatchError, DispatchResult, ErrorItem, HttpError, RegistrationError, RegistrationResult,
    StackError, Unrescuable,
};
pub use extractor::{Dep, FromConnection, Input, Params, Wired};
pub use handler::{
    BoxFuture, BoxedHandler, Component, ErasedHandler, Handle, Handler, HandlerFn, IntoHandler,
    component, into_handler,
};
pub use hook::{BoxedHook, HandlerResult, Hook, SetUp, TearDown};
pub use hooks::{BodyHook, ResultHook, ValidationHook};
pub use rescuer::{DefaultRescuer, Rescuer, status_for_code};
pub use route::{Captures, Pattern, Route, default_name};
pub use router::{Group, Registrar, RouteMut, RouteTable, Router};
pub use service::{BoxedDispatchService, DispatchService};
pub use validation::{Checker, Not, Require, Rules, validate};
