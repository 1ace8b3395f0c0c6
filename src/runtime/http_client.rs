//! Request-line-only HTTP/1.1 client over the runtime's UNIX domain socket
//! (component B).

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use tracing::debug;

use crate::error::ResolveError;

/// Outcome of a single GET, classified the way the design requires:
/// 2xx -> Ok, 4xx -> BadRequest, anything else or I/O failure -> Error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    Ok(String),
    BadRequest,
    Error,
}

/// A client bound to one runtime UNIX socket path. Opens a fresh connection
/// per request; the runtime HTTP server doesn't require keep-alive for this
/// access pattern and pooling would complicate the single-worker-thread
/// contract for no benefit.
pub struct RuntimeHttpClient {
    socket_path: String,
    timeout: Duration,
}

impl RuntimeHttpClient {
    pub fn new(socket_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    /// Issue `GET <api_version><path> HTTP/1.1` and return the classified
    /// response. `api_version` is typically a value like `/v1.24` or the
    /// empty string after the one-shot fallback has been applied.
    pub fn get(&self, api_version: &str, path: &str) -> Result<HttpOutcome, ResolveError> {
        let request = format!(
            "GET {}{} HTTP/1.1\r\nHost: docker\r\n\r\n",
            api_version, path
        );

        let mut stream = UnixStream::connect(&self.socket_path)
            .map_err(|e| ResolveError::Transport(format!("connect {}: {}", self.socket_path, e)))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| ResolveError::Transport(e.to_string()))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        stream
            .write_all(request.as_bytes())
            .map_err(|e| ResolveError::Transport(format!("write: {}", e)))?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .map_err(|e| ResolveError::Transport(format!("read: {}", e)))?;

        let text = String::from_utf8_lossy(&raw);
        debug!(bytes = raw.len(), "runtime socket response received");

        let (status_line, rest) = match text.split_once("\r\n") {
            Some(parts) => parts,
            None => return Ok(HttpOutcome::Error),
        };

        let status_code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok());

        let body = split_body(rest);

        match status_code {
            Some(code) if (200..300).contains(&code) => Ok(HttpOutcome::Ok(body.to_string())),
            Some(code) if (400..500).contains(&code) => Ok(HttpOutcome::BadRequest),
            _ => Ok(HttpOutcome::Error),
        }
    }
}

/// Split headers from body on the blank-line separator, returning the body
/// unchanged (chunked transfer-encoding is not unwrapped: the runtime's
/// Engine API serves these endpoints with `Content-Length`).
fn split_body(headers_and_body: &str) -> &str {
    headers_and_body
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_body_extracts_content_after_blank_line() {
        let raw = "Content-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        assert_eq!(split_body(raw), "{}");
    }

    #[test]
    fn split_body_handles_missing_separator() {
        assert_eq!(split_body("no separator here"), "");
    }

    #[test]
    fn connect_failure_is_classified_as_transport_error() {
        let client = RuntimeHttpClient::new("/nonexistent/path/does/not/exist.sock", Duration::from_millis(200));
        let err = client.get("/v1.24", "/containers/x/json").unwrap_err();
        assert!(matches!(err, ResolveError::Transport(_)));
    }
}
