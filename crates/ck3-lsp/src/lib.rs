//! CK3 language server runtime.
//!
//! Wires the engine crates (lexer, parser, scope model, schema engine,
//! index, diagnostics, pool) into an LSP server over stdio: framed JSON-RPC
//! transport, a debounced document pipeline with staged diagnostics, and
//! one provider per editor feature.

#![deny(unsafe_code)]

pub mod cache;
pub mod commands;
pub mod features;
pub mod logwatch;
pub mod pipeline;
pub mod scanner;
pub mod server;
pub mod state;
pub mod transport;
pub mod util;

pub use server::LspServer;

/// Run the server over stdio. Returns the process exit code.
pub fn run_stdio() -> std::io::Result<i32> {
    let mut server = LspServer::new();
    server.run()
}
