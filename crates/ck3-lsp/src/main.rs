//! CK3 language server binary.
//!
//! Editors launch this over stdio. The only runtime flag is the log level;
//! logging goes to stderr so stdout stays clean for LSP framing.

use anyhow::Context as _;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut log_level = "warning".to_string();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--log-level" => {
                if i + 1 < args.len() {
                    log_level = args[i + 1].clone();
                    i += 1;
                } else {
                    eprintln!("--log-level requires a value (debug|info|warning|error)");
                    return ExitCode::from(2);
                }
            }
            "--version" => {
                println!("ck3-lsp {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            "--help" | "-h" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("unknown option: {other}");
                print_help();
                return ExitCode::from(2);
            }
        }
        i += 1;
    }

    let filter = match log_level.as_str() {
        "debug" => "debug",
        "info" => "info",
        "warning" => "warn",
        "error" => "error",
        other => {
            eprintln!("invalid log level '{other}' (debug|info|warning|error)");
            return ExitCode::from(2);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("ck3_lsp={filter},ck3={filter}")))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ck3-lsp starting on stdio");

    match ck3_lsp::run_stdio().context("LSP session failed") {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(error) => {
            eprintln!("ck3-lsp: fatal: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!("CK3 Script Language Server");
    eprintln!();
    eprintln!("Usage: ck3-lsp [--log-level debug|info|warning|error]");
    eprintln!();
    eprintln!("The server speaks the Language Server Protocol over stdio.");
    eprintln!("Logging goes to stderr; stdout carries LSP framing only.");
}
