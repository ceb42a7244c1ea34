//! The server-and-client-shared response model: status line plus the
//! common `Message` body/headers.
//!
//! Grounded on `webcc::HttpResponse`, which adds only a status code and
//! reason phrase on top of the shared message base.

use std::fmt;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::headers::{self, Headers};
use crate::message::{Message, Version};

/// A response status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Status(pub u16);

impl Status {
    pub const OK: Status = Status(200);
    pub const NO_CONTENT: Status = Status(204);
    pub const NOT_MODIFIED: Status = Status(304);
    pub const BAD_REQUEST: Status = Status(400);
    pub const NOT_FOUND: Status = Status(404);
    pub const METHOD_NOT_ALLOWED: Status = Status(405);
    pub const INTERNAL_SERVER_ERROR: Status = Status(500);
    pub const NOT_IMPLEMENTED: Status = Status(501);
    pub const SERVICE_UNAVAILABLE: Status = Status(503);

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    /// `true` for the statuses RFC 9110 defines as never carrying a body.
    pub fn forbids_body(self) -> bool {
        matches!(self.0, 100..=199 | 204 | 304)
    }

    pub fn reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }
}

pub struct Response {
    pub version: Version,
    pub status: Status,
    /// The reason phrase as the peer actually sent it, when this response
    /// was parsed off the wire; `None` for responses built locally, which
    /// fall back to `Status::reason()`'s table.
    pub reason: Option<String>,
    pub message: Message,
    /// Set by the client engine when the response body was streamed
    /// straight to disk instead of being buffered in memory.
    pub file_body: Option<std::path::PathBuf>,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Response { version: Version::Http11, status, reason: None, message: Message::new(), file_body: None }
    }

    /// The reason phrase to put on the wire: the peer's own phrase if this
    /// response was parsed, otherwise the standard one for `status`.
    pub fn reason_phrase(&self) -> &str {
        self.reason.as_deref().unwrap_or_else(|| self.status.reason())
    }

    pub fn headers(&self) -> &Headers {
        &self.message.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.message.headers
    }

    pub fn set_body(&mut self, body: Body, content_type: Option<&str>) {
        self.message.set_body(body, content_type);
    }

    pub fn body(&self) -> &Body {
        &self.message.body
    }

    pub fn into_body_bytes(self) -> Result<Vec<u8>> {
        self.message.body.into_bytes()
    }

    pub fn start_line(&self) -> String {
        format!("{} {} {}\r\n", self.version.as_str(), self.status.0, self.reason_phrase())
    }

    pub fn write_to(&mut self, out: &mut impl std::io::Write) -> Result<()> {
        let start_line = self.start_line();
        self.message.write_to(&start_line, out)
    }

    /// Parses a `"HTTP/1.1 200 OK"` status line into `(version, status, reason)`.
    pub fn parse_status_line(line: &str) -> Result<(Version, Status, String)> {
        let mut parts = line.splitn(3, ' ');
        let version = parts.next().ok_or_else(|| Error::Syntax("empty status line".into()))?;
        let code = parts.next().ok_or_else(|| Error::Syntax("missing status code".into()))?;
        let reason = parts.next().unwrap_or("").to_string();
        let version = Version::parse(version)?;
        let code: u16 = code
            .parse()
            .map_err(|_| Error::Syntax(format!("invalid status code: {code}")))?;
        Ok((version, Status(code), reason))
    }
}

/// Status line and headers only, for logging — never the body.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start_line(), self.message.headers)
    }
}
