//! Tunables for the client session and the server, gathered into two small
//! config structs rather than threaded through individual call sites.

use std::time::Duration;

use crate::compress::Encoding;

/// Options shared by every request issued through a `Session` — the
/// recognized session options of §6: `user_agent`, `default_accept`,
/// `default_accept_encoding`, `default_connection`, `content_type`,
/// `charset`, `ssl_verify`, `read_timeout_seconds` and `read_buffer_size`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
    /// `read_timeout_seconds` (default 30).
    pub read_timeout: Duration,
    /// `default_connection`: `true` for `"keep-alive"`, `false` for `"close"`.
    pub keep_alive: bool,
    pub gzip_request_body: Option<Encoding>,
    pub user_agent: String,
    /// `default_accept`.
    pub default_accept: String,
    /// `default_accept_encoding`: advertises `identity` unless compression
    /// support is requested.
    pub default_accept_encoding: AcceptEncoding,
    /// `content_type`/`charset` applied to bodies whose content type isn't
    /// already set explicitly by the request builder.
    pub content_type: Option<String>,
    pub charset: Option<String>,
    /// Apply the platform trust store to TLS connections and fail closed on
    /// an invalid certificate. Disabling this is a deliberate footgun kept
    /// for talking to self-signed test servers.
    pub ssl_verify: bool,
    /// `read_buffer_size` (default 1024): the initial socket read buffer
    /// size before the parser's early `Content-Length` notification lets it
    /// grow (§4.E).
    pub read_buffer_size: usize,
    pub max_idle_per_host: usize,
}

/// `default_accept_encoding ∈ {"identity", "gzip, deflate"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptEncoding {
    Identity,
    GzipDeflate,
}

impl AcceptEncoding {
    pub fn header_value(self) -> &'static str {
        match self {
            AcceptEncoding::Identity => "identity",
            AcceptEncoding::GzipDeflate => "gzip, deflate",
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            keep_alive: true,
            gzip_request_body: None,
            user_agent: format!("webcc-rs/{}", env!("CARGO_PKG_VERSION")),
            default_accept: "*/*".to_string(),
            default_accept_encoding: AcceptEncoding::Identity,
            content_type: None,
            charset: None,
            ssl_verify: true,
            read_buffer_size: 1024,
            max_idle_per_host: 1,
        }
    }
}

/// Options controlling how the server accepts and dispatches connections —
/// the recognized server options of §6: `port` (the bind address passed to
/// `Server::bind` directly, not duplicated here), `worker_count`,
/// `max_header_bytes`, `max_body_bytes` and `idle_timeout_seconds`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub worker_count: usize,
    /// Deadline for each blocking read while waiting on a request; also
    /// serves as `idle_timeout_seconds` between requests on a kept-alive
    /// connection, since the same read call waits for both.
    pub read_timeout: Duration,
    pub max_queue_len: usize,
    pub server_header: String,
    /// Header block size above which a request is rejected with a syntax
    /// error (and the connection closed with `400`) instead of buffered
    /// without bound.
    pub max_header_bytes: usize,
    /// Declared `Content-Length` above which a request body is rejected the
    /// same way.
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            worker_count: 2,
            read_timeout: Duration::from_secs(30),
            max_queue_len: 1024,
            server_header: format!("webcc-rs/{}", env!("CARGO_PKG_VERSION")),
            max_header_bytes: 64 * 1024,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub(crate) fn limits(&self) -> crate::parser::Limits {
        crate::parser::Limits { max_header_bytes: self.max_header_bytes, max_body_bytes: self.max_body_bytes }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn session_defaults_are_keep_alive() {
        assert!(SessionConfig::default().keep_alive);
    }

    #[test]
    fn server_defaults_have_at_least_one_worker() {
        assert!(ServerConfig::default().worker_count >= 1);
    }
}
