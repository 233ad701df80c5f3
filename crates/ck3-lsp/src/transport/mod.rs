//! LSP base-protocol transport: Content-Length framed JSON-RPC over any
//! `BufRead`/`Write` pair (stdio in production, buffers in tests).

mod framing;

pub use framing::{read_message, write_message, write_notification};
