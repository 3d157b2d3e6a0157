//! # Lapis Core
//!
//! Building blocks shared by every layer of the Lapis request-dispatch
//! runtime:
//!
//! - [`container`]: type-directed binding, resolution and injection
//! - [`scheduler`]: priority tiers with barrier synchronization
//! - [`foundation`]: connection, request, response, parameters, headers
//! - [`codec`]: body codecs keyed by content type
//! - [`codes`]: stable error codes surfaced on the wire

pub mod codec;
pub mod codes;
pub mod container;
pub mod error;
pub mod foundation;
pub mod scheduler;

pub use codec::{Codec, CodecRegistry, JsonCodec, TextCodec};
pub use container::{Abstract, Args, Concrete, Container, Injectable, Scope};
pub use error::{
    CodecError, CodecResult, ContainerError, ContainerResult, SendError, SendResult,
};
pub use foundation::{
    BufferedWriter, Connection, Content, Header, Outgoing, ParamBag, Request, Response,
    ResponseWriter, SendState,
};
pub use scheduler::{DEFAULT_PRIORITY, Prioritized, Tier, Tiers, run_tiers};
