//! JSON I/O handling for the CLI
//!
//! - Input: one JSON object per line on stdin
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read one request line from stdin
pub fn read_request() -> CliResult<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(CliError::Stdin)?;

    if line.trim().is_empty() {
        return Err(CliError::EmptyRequest);
    }
    Ok(line)
}

/// Read request lines from stdin until EOF, skipping blank lines
pub fn read_requests() -> impl Iterator<Item = CliResult<String>> {
    io::stdin()
        .lock()
        .lines()
        .map(|line| line.map_err(CliError::Stdin))
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
}

/// Build a success response
pub fn ok_response(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Build an error response
pub fn error_response(code: &str, http_status: u16, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "http_status": http_status,
        "message": message
    })
}

/// Write a response object as one line to stdout
pub fn write_json(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, response).map_err(|e| CliError::Stdout(e.into()))?;
    writeln!(stdout)
        .and_then(|()| stdout.flush())
        .map_err(CliError::Stdout)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&ok_response(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, http_status: u16, message: &str) -> CliResult<()> {
    write_json(&error_response(code, http_status, message))
}
