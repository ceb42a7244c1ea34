//! Crate-wide error taxonomy.
//!
//! Mirrors the `webcc::Error` class of the original source: a single flat
//! enum plus a side `timed_out` flag, rather than a tree of exception types.

use std::fmt;
use std::io;

/// Everything that can go wrong while parsing, connecting, or serving.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed start line, header line, or chunk framing.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The message declares a body framing this parser does not support
    /// (e.g. a response with neither `Content-Length` nor `chunked` that
    /// the implementation chose to reject instead of reading to EOF).
    #[error("unsupported framing: {0}")]
    UnsupportedFraming(String),

    /// `Content-Encoding` names a codec we don't have.
    #[error("unsupported content-encoding: {0}")]
    UnsupportedEncoding(String),

    /// Decompression of a body failed partway through.
    #[error("failed to decode body: {0}")]
    Decode(String),

    /// DNS resolution failed.
    #[error("failed to resolve host: {0}")]
    Resolve(String),

    /// TCP connect failed.
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),

    /// TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// Reading from the socket failed.
    #[error("socket read failed: {0}")]
    SocketRead(#[source] io::Error),

    /// Writing to the socket failed.
    #[error("socket write failed: {0}")]
    SocketWrite(#[source] io::Error),

    /// The read deadline elapsed before the response finished.
    #[error("timed out waiting for response")]
    Timeout,

    /// Streaming a response body to disk failed.
    #[error("file error: {0}")]
    File(#[source] io::Error),

    /// A server-side view handler returned an error.
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// HTTP status this error maps to when a server needs to answer with it.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Syntax(_) | Error::UnsupportedFraming(_) => 400,
            Error::UnsupportedEncoding(_) | Error::Decode(_) => 400,
            Error::Server(_) => 500,
            _ => 500,
        }
    }
}

/// Result of a client round-trip: carries both the error kind and whether
/// the failure was specifically a read-deadline expiry, matching the
/// original source's `Error::timeout()` side flag.
#[derive(Debug)]
pub struct ClientError {
    pub error: Error,
    pub timed_out: bool,
}

impl ClientError {
    pub fn new(error: Error) -> Self {
        let timed_out = matches!(error, Error::Timeout);
        ClientError { error, timed_out }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<Error> for ClientError {
    fn from(error: Error) -> Self {
        ClientError::new(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
pub type ClientResult<T> = std::result::Result<T, ClientError>;
