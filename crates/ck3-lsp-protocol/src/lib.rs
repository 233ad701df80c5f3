//! Protocol layer for the CK3 language server: JSON-RPC message types,
//! standard error codes, LSP method names, and capability negotiation.

#![deny(unsafe_code)]

pub mod capabilities;
pub mod jsonrpc;
pub mod methods;

pub use capabilities::{
    SEMANTIC_TOKEN_MODIFIERS, SEMANTIC_TOKEN_TYPES, semantic_token_index, server_capabilities,
};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, error_codes};
