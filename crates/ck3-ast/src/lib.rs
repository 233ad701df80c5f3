//! Syntax-tree and position types shared across the CK3 language server.
//!
//! The tree is arena-allocated: nodes are plain values addressed by index,
//! parent links are optional indices, and the arena's lifetime is the
//! document's lifetime. See [`node::ScriptAst`] for the rationale.

#![deny(unsafe_code)]

pub mod node;
pub mod position;

pub use node::{Node, NodeId, NodeType, NodeValue, Operator, Scalar, ScalarKind, ScriptAst};
pub use position::{Position, Range, utf16_len};
