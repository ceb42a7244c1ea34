//! The client-side request model: method, URL, and the per-request options
//! the original source hung off `HttpRequestArgs`.
//!
//! Grounded on `webcc::HttpRequest` and `webcc::HttpRequestArgs`: buffer
//! size, gzip-the-body, keep-alive and file-streaming are genuine knobs in
//! the original API, kept here as fields on `Request` rather than a
//! separate builder-only struct, since the builder in `client::builder`
//! only assembles one of these before handing it to the engine.

use std::fmt;

use crate::body::Body;
use crate::compress::Encoding;
use crate::error::Result;
use crate::headers::{self, Headers};
use crate::message::{Message, Version};
use crate::url::Url;

/// What kind of `Content-Type` a raw body should synthesize, set by the
/// builder's `.json()`/`.xml()` toggles. Independent of `.utf8()`, which
/// only controls whether a `charset` parameter gets appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Raw,
    Json,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }

    pub fn parse(s: &str) -> Option<Method> {
        match s {
            "GET" => Some(Method::Get),
            "HEAD" => Some(Method::Head),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "PATCH" => Some(Method::Patch),
            "OPTIONS" => Some(Method::Options),
            _ => None,
        }
    }

    /// A response to this method never carries a body, regardless of what
    /// `Content-Length` claims.
    pub fn forbids_response_body(self) -> bool {
        matches!(self, Method::Head)
    }
}

/// A request message together with the client-visible options that control
/// how the engine handles it.
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub version: Version,
    pub message: Message,
    /// Whether the connection should be reused after this request.
    pub keep_alive: bool,
    /// Compress the outgoing body before sending, when large enough.
    pub gzip_body: Option<Encoding>,
    /// Socket read buffer size used while waiting for the response.
    pub read_buffer_size: usize,
    /// Apply the platform trust store on an `https` connect and fail closed
    /// on an invalid certificate; `false` skips verification entirely.
    pub ssl_verify: bool,
    /// Stream the response body straight to this path instead of buffering
    /// it in memory.
    pub stream_response_to: Option<std::path::PathBuf>,
    /// Ordered positional captures from the server's route pattern. Empty
    /// for client-built requests; filled in by `Router::dispatch` after a
    /// regex route matches.
    pub args: Vec<String>,
    /// `.json()`/`.xml()` builder toggle, consulted by
    /// `apply_content_type_policy` when no `Content-Type` was set explicitly.
    pub body_kind: BodyKind,
    /// `.utf8()` builder toggle: append `; charset=utf-8` to a synthesized
    /// `Content-Type`.
    pub body_utf8: bool,
}

const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        let mut message = Message::new();
        message.headers.set(headers::HOST, url.host_header());
        Request {
            method,
            url,
            version: Version::Http11,
            message,
            keep_alive: true,
            gzip_body: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            ssl_verify: true,
            stream_response_to: None,
            args: Vec::new(),
            body_kind: BodyKind::Raw,
            body_utf8: false,
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.message.headers
    }

    /// The request body's bytes, once it has been collected in memory (the
    /// case for every server-side request: the connection handler always
    /// reads the body fully before dispatching). Empty for a streamed or
    /// not-yet-collected body.
    pub fn body_bytes(&self) -> &[u8] {
        match &self.message.body {
            Body::String(b) => b.data(),
            _ => &[],
        }
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.message.headers
    }

    pub fn set_body(&mut self, body: Body, content_type: Option<&str>) {
        self.message.set_body(body, content_type);
    }

    /// Synthesizes `Content-Type` from `body_kind`/`body_utf8` when no
    /// explicit `Content-Type` is already set, falling back to the session's
    /// `default_content_type`/`default_charset` for a `Raw` body. A no-op
    /// when the body is empty or a `Content-Type` is already present.
    pub fn apply_content_type_policy(&mut self, default_content_type: Option<&str>, default_charset: Option<&str>) {
        if self.headers().has(headers::CONTENT_TYPE) || self.message.body.is_empty() {
            return;
        }
        let base = match self.body_kind {
            BodyKind::Json => Some("application/json"),
            BodyKind::Xml => Some("text/xml"),
            BodyKind::Raw => default_content_type,
        };
        let Some(base) = base else { return };
        let charset = if self.body_utf8 { Some("utf-8") } else { default_charset };
        let value = match charset {
            Some(cs) => format!("{base}; charset={cs}"),
            None => base.to_string(),
        };
        self.headers_mut().set(headers::CONTENT_TYPE, value);
    }

    /// Applies `gzip_body`, if set, to the attached body.
    pub fn finalize_body(&mut self) -> Result<()> {
        if let Some(encoding) = self.gzip_body {
            self.message.compress_body(encoding)?;
        }
        if !self.keep_alive {
            self.message.headers.set(headers::CONNECTION, "close");
        }
        Ok(())
    }

    /// Renders the request line: `METHOD request-target HTTP/version\r\n`.
    pub fn start_line(&self) -> String {
        format!(
            "{} {} {}\r\n",
            self.method.as_str(),
            self.url.request_target(),
            self.version.as_str()
        )
    }

    pub fn write_to(&mut self, out: &mut impl std::io::Write) -> Result<()> {
        let start_line = self.start_line();
        self.message.write_to(&start_line, out)
    }
}

/// Start line and headers only, for logging — never the body, which may be
/// large, binary, or streamed from a file that is no longer open.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start_line(), self.message.headers)
    }
}
