//! JSON-RPC 2.0 message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An incoming request or notification from the client. `id` is `None` for
/// notifications.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0").
    #[serde(rename = "jsonrpc")]
    pub _jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    pub params: Option<Value>,
}

/// An outgoing response. Exactly one of `result`/`error` is set.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Mirrors the request's id.
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    /// Error response.
    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) }
    }

    /// `null` result, for requests that legitimately return nothing.
    pub fn null(id: Option<Value>) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(Value::Null), error: None }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Clone)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Plain error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// Standard JSON-RPC / LSP error codes.
pub mod error_codes {
    /// Malformed JSON payload.
    pub const PARSE_ERROR: i32 = -32700;
    /// Request object invalid.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Unknown method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Bad parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Server-side failure.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Request received before `initialize`.
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    /// Client cancelled via `$/cancelRequest`.
    pub const REQUEST_CANCELLED: i32 = -32800;
    /// Result invalidated by a newer document version.
    pub const CONTENT_MODIFIED: i32 = -32801;
}
