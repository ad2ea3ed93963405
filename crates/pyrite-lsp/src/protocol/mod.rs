//! JSON-RPC 2.0 protocol layer
//!
//! Message types and `Content-Length` framing. Nothing here knows about
//! Python or about individual LSP methods.

pub mod message;
pub mod transport;

pub use message::{
    InvalidMessage, Message, Notification, Request, RequestId, Response, ResponseError,
};
pub use transport::{MessageReader, MessageWriter};

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // LSP-specific error codes
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    pub const REQUEST_CANCELLED: i32 = -32800;
}
