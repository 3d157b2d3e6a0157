//! Per-request data model: request, response, parameters and headers.

pub mod bag;
pub mod connection;
pub mod header;
pub mod request;
pub mod response;

pub use bag::ParamBag;
pub use connection::{BufferedWriter, Connection, Outgoing, ResponseWriter, SendState};
pub use header::Header;
pub use request::Request;
pub use response::{Content, Response};
