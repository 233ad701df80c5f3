//! Content-Length message framing.

use ck3_lsp_protocol::{JsonRpcRequest, JsonRpcResponse};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};

/// Read one framed message. Returns `Ok(None)` on clean end-of-stream.
///
/// Unknown headers are skipped; a missing Content-Length is a framing
/// violation and surfaces as an error (the only error class that escalates
/// to shutdown).
pub fn read_message(reader: &mut dyn BufRead) -> io::Result<Option<JsonRpcRequest>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            content_length = value.trim().parse::<usize>().ok();
        }
        // Content-Type and anything else: ignored.
    }

    let length = content_length.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "missing Content-Length header")
    })?;

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;

    let request = serde_json::from_slice::<JsonRpcRequest>(&body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(request))
}

/// Write a framed response.
pub fn write_message(writer: &mut dyn Write, response: &JsonRpcResponse) -> io::Result<()> {
    let body = serde_json::to_string(response)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
    writer.flush()
}

/// Write a framed notification.
pub fn write_notification(writer: &mut dyn Write, method: &str, params: Value) -> io::Result<()> {
    let body = serde_json::to_string(&json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params
    }))?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
    writer.flush()
}
