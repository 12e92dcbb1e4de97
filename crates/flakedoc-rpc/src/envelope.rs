//! JSON-RPC 2.0 envelope - stable wire contract for the tool surface.
//!
//! Requests carry `{jsonrpc, id, method, params}`; responses carry
//! either `result` or `error`, never both. Conversion to and from the
//! wire representation happens here and nowhere else.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes used by the tool surface.
pub mod codes {
    /// Request line was not valid JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Envelope shape or version was wrong.
    pub const INVALID_REQUEST: i64 = -32600;
    /// No tool with the requested name.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Params did not match the tool's schema.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Tool execution failed.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Incoming request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: String,

    /// Echoed back verbatim; null when the caller omitted it.
    #[serde(default)]
    pub id: Value,

    pub method: String,

    #[serde(default)]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Whether the envelope claims the supported protocol version.
    pub fn is_valid_version(&self) -> bool {
        self.jsonrpc == JSONRPC_VERSION
    }
}

/// Error object of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Outgoing response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Successful response.
    pub fn ok(id: Value, result: Value) -> Self {
        RpcResponse {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Failed response.
    pub fn err(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        RpcResponse {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }
}
