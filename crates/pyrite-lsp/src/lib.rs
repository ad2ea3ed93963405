//! Pyrite Language Server Protocol (LSP) library
//!
//! Analysis and protocol engine of the Pyrite Python language server:
//! JSON-RPC framing over stdio, the open-document store, a versioned
//! analysis cache, the workspace index and the language features built on
//! top of them.

pub mod cache;
pub mod cancel;
pub mod client;
pub mod completion;
pub mod convert;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod hover;
pub mod index;
pub mod logging;
pub mod navigation;
pub mod protocol;
pub mod publisher;
pub mod resolver;
pub mod server;
pub mod session;
pub mod symbols;

pub use cancel::CancellationToken;
pub use client::Client;
pub use dispatcher::Dispatcher;
pub use error::{EngineError, EngineResult};
pub use server::Server;
pub use session::Session;
