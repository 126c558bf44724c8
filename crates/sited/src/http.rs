//! Minimal HTTP/1.1 wire handling for the file server.
//!
//! Only the request line matters to this server; headers and bodies are read
//! and discarded. Responses always close the connection.

use std::fmt;

/// Upper bound on a request we are willing to buffer (64K)
pub const MAX_REQUEST_SIZE: usize = 64 * 1024;

/// The parsed request line of an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method verb, e.g. `GET`
    pub method: String,
    /// Request path, e.g. `/index.html`
    pub path: String,
}

impl Request {
    /// Parse the request line out of a raw request buffer.
    ///
    /// Returns `Ok(None)` until a full line has arrived. Line endings may be
    /// `\r\n` or bare `\n`.
    pub fn parse(buf: &[u8]) -> Result<Option<Request>, String> {
        let end = match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let line = std::str::from_utf8(&buf[..end])
            .map_err(|_| "request line is not valid UTF-8".to_string())?
            .trim_end_matches('\r');

        let mut parts = line.split_whitespace();
        let method = parts.next().ok_or("empty request line")?;
        let path = parts.next().ok_or("request line has no path")?;

        Ok(Some(Request {
            method: method.to_string(),
            path: path.to_string(),
        }))
    }
}

/// Response status lines the server actually sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = match self {
            Status::Ok => "HTTP/1.1 200 OK",
            Status::BadRequest => "HTTP/1.1 400 BAD REQUEST",
            Status::NotFound => "HTTP/1.1 404 NOT FOUND",
        };
        f.write_str(line)
    }
}

/// A complete response ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: Status, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body,
        }
    }

    /// Serialize status line, headers, and body into wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let header = format!(
            "{}\r\nConnection: close\r\nContent-Length: {}\r\nContent-Type: {}\r\n\r\n",
            self.status,
            self.body.len(),
            self.content_type,
        );

        let mut out = header.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}
