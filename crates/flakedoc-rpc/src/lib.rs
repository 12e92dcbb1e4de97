//! Flakedoc JSON-RPC tool surface
//!
//! Exposes the classification core over a JSON-RPC 2.0
//! request/response channel:
//! - [`envelope`]: wire envelope types and error codes
//! - [`schema`]: typed request/response contracts per tool
//! - [`dispatch`]: method routing, validation, and audit recording
//! - [`server`]: the newline-delimited stdio loop

pub mod dispatch;
pub mod envelope;
pub mod schema;
pub mod server;

pub use dispatch::Dispatcher;
pub use envelope::{RpcError, RpcRequest, RpcResponse};
pub use server::{serve_lines, serve_stdio};
