//! Stable error codes surfaced on the wire.
//!
//! Codes follow the `0.AAA.BBB` scheme: the first digit is reserved for the
//! runtime itself, `AAA` names the area and `BBB` the individual condition.

// App
pub const APP_ROUTER_NOT_DEFINED: &str = "0.001.001";
pub const APP_CONFIG_MISSING: &str = "0.001.002";
pub const APP_NO_HANDLER_FOUND: &str = "0.001.003";
pub const APP_PANIC: &str = "0.001.004";

// Routing / HTTP
pub const HTTP_NOT_FOUND: &str = "0.002.001";
pub const HTTP_BAD_REQUEST: &str = "0.002.002";
pub const HTTP_INTERNAL_SERVER_ERROR: &str = "0.002.003";
pub const HTTP_UNKNOWN_ERROR: &str = "0.002.004";

// Response, body and codecs
pub const RESPONSE_ALREADY_SENT: &str = "0.003.001";
pub const NO_CODEC_FOUND: &str = "0.003.002";
pub const CONTENT_TYPE_EMPTY: &str = "0.003.003";
pub const NO_WRITER_FOUND: &str = "0.003.004";
pub const CODEC_INVALID_CONTENT: &str = "0.003.005";
pub const CODEC_DECODE_FAILURE: &str = "0.003.006";
pub const CODEC_ENCODE_FAILURE: &str = "0.003.007";
pub const WRITER_FAILURE: &str = "0.003.008";

// Container
pub const BIND_INVALID_INTERFACE: &str = "0.004.001";
pub const BIND_INVALID_CONCRETE: &str = "0.004.002";
pub const BIND_NOT_IMPLEMENT_INTERFACE: &str = "0.004.003";
pub const BIND_INVALID_STRUCT: &str = "0.004.004";
pub const BIND_INVALID_STRUCT_CONCRETE: &str = "0.004.005";
pub const BIND_FROZEN: &str = "0.004.006";
pub const RESOLVE_NOT_EXIST_ABSTRACT: &str = "0.004.007";
pub const RESOLVE_INVALID_CONCRETE: &str = "0.004.008";
pub const RESOLVE_INSUFFICIENT_ARGUMENTS: &str = "0.004.009";
pub const RESOLVE_NON_VALUES_RETURNED: &str = "0.004.010";
pub const RESOLVE_INVALID_ARGUMENTS: &str = "0.004.011";
pub const INJECT_INVALID_TARGET_TYPE: &str = "0.004.012";
pub const RESOLVE_CYCLIC_DEPENDENCY: &str = "0.004.013";
pub const RESOLVE_DEPTH_EXCEEDED: &str = "0.004.014";

/// Content type used when a response does not pick one.
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_DEFAULT: &str = CONTENT_TYPE_JSON;
pub const CONTENT_CHARSET_DEFAULT: &str = "utf-8";
