//! Shared message plumbing used by both `Request` and `Response`: the HTTP
//! version tag, the header block, and the body together with the bookkeeping
//! `Content-Length`/`Transfer-Encoding` need once a body is attached.
//!
//! Grounded on `webcc::HttpMessage`, which keeps exactly this subset
//! (headers, body, start-line parts) common between its request and
//! response subclasses.

use std::io::Write;

use crate::body::Body;
use crate::compress::Encoding;
use crate::error::{Error, Result};
use crate::headers::{self, Headers};

/// The HTTP version a message declares on its start line. Only 1.0 and 1.1
/// are produced or accepted; anything else is a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }

    pub fn parse(s: &str) -> Result<Version> {
        match s {
            "HTTP/1.1" => Ok(Version::Http11),
            "HTTP/1.0" => Ok(Version::Http10),
            other => Err(Error::Syntax(format!("unsupported HTTP version: {other}"))),
        }
    }
}

/// Headers and body shared by requests and responses, plus the framing
/// decision (`Content-Length` vs chunked) made when the body is attached.
#[derive(Default)]
pub struct Message {
    pub headers: Headers,
    pub body: Body,
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl Message {
    pub fn new() -> Self {
        Message { headers: Headers::new(), body: Body::empty() }
    }

    /// Attaches `body`, setting `Content-Length` (or `Transfer-Encoding:
    /// chunked` when the caller asks for streaming framing) and, when
    /// `content_type` is given and not already set, `Content-Type`.
    pub fn set_body(&mut self, body: Body, content_type: Option<&str>) {
        if let Some(ct) = content_type.or_else(|| body.content_type().as_deref()) {
            if !self.headers.has(headers::CONTENT_TYPE) {
                self.headers.set(headers::CONTENT_TYPE, ct.to_string());
            }
        }
        match body.size() {
            Some(size) => {
                self.headers.set(headers::CONTENT_LENGTH, size.to_string());
            }
            None => {
                self.headers.set(headers::TRANSFER_ENCODING, "chunked");
            }
        }
        self.body = body;
    }

    /// Applies request-body compression in place when the body is large
    /// enough to be worthwhile, updating `Content-Encoding` and
    /// `Content-Length` to match.
    pub fn compress_body(&mut self, encoding: Encoding) -> Result<()> {
        let raw = std::mem::replace(&mut self.body, Body::empty()).into_bytes()?;
        match crate::compress::compress_if_worthwhile(encoding, &raw)? {
            Some(compressed) => {
                self.headers.set(headers::CONTENT_ENCODING, encoding.header_value());
                self.headers.set(headers::CONTENT_LENGTH, compressed.len().to_string());
                self.body = Body::from_bytes(compressed);
            }
            None => {
                self.body = Body::from_bytes(raw);
            }
        }
        Ok(())
    }

    /// Writes the header block (already terminated by the blank line) and
    /// then the body payload to `out`. `start_line` must already include its
    /// own trailing CRLF.
    pub fn write_to(&mut self, start_line: &str, out: &mut impl Write) -> Result<()> {
        out.write_all(start_line.as_bytes()).map_err(Error::SocketWrite)?;
        for (name, value) in self.headers.iter() {
            out.write_all(format!("{name}: {value}\r\n").as_bytes())
                .map_err(Error::SocketWrite)?;
        }
        out.write_all(b"\r\n").map_err(Error::SocketWrite)?;

        if self.headers.is_chunked() {
            self.body.init_payload();
            loop {
                let chunk = self.body.next_payload()?;
                if chunk.is_empty() {
                    out.write_all(b"0\r\n\r\n").map_err(Error::SocketWrite)?;
                    break;
                }
                out.write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                    .map_err(Error::SocketWrite)?;
                out.write_all(&chunk).map_err(Error::SocketWrite)?;
                out.write_all(b"\r\n").map_err(Error::SocketWrite)?;
            }
        } else {
            crate::body::write_all(&mut self.body, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_body_sets_content_length_and_type() {
        let mut m = Message::new();
        m.set_body(Body::from_bytes(b"hi".to_vec()), Some("text/plain"));
        assert_eq!(m.headers.get(headers::CONTENT_LENGTH), Some("2"));
        assert_eq!(m.headers.get(headers::CONTENT_TYPE), Some("text/plain"));
    }

    #[test]
    fn write_to_emits_start_line_headers_blank_line_and_body() {
        let mut m = Message::new();
        m.set_body(Body::from_bytes(b"abc".to_vec()), Some("text/plain"));
        let mut out = Vec::new();
        m.write_to("GET / HTTP/1.1\r\n", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("GET / HTTP/1.1\r\n"));
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(text.ends_with("\r\n\r\nabc"));
    }

    #[test]
    fn version_round_trips() {
        assert_eq!(Version::parse("HTTP/1.1").unwrap().as_str(), "HTTP/1.1");
        assert!(Version::parse("HTTP/2.0").is_err());
    }
}
