//! Error taxonomy for the resolution core.
//!
//! Covers the runtime HTTP client and resolver: transport and protocol
//! failures talking to the runtime, parse failures decoding its JSON, and
//! absent fields. The cgroup reader has no typed error of its own — every
//! failure there (unreadable file, unparseable value, out-of-range value) is
//! logged and treated as "field not reported", since the cache's value type
//! is a plain struct rather than a `Result`.

use thiserror::Error;

/// Failure classification for a single runtime-metadata resolution attempt.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("transport error talking to runtime socket: {0}")]
    Transport(String),

    #[error("runtime returned non-OK status: {0}")]
    Protocol(String),

    #[error("failed to parse runtime response: {0}")]
    Parse(String),

    #[error("expected field absent: {0}")]
    Absent(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
