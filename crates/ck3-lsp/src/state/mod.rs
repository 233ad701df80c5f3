//! Server state: per-document records and configuration.

pub mod config;
pub mod document;

pub use config::ServerConfig;
pub use document::{DocumentState, content_hash};
