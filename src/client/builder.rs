//! Fluent request assembly on top of a `Session`.
//!
//! Grounded on `webcc::HttpRequestArgs`'s chained setters (`.parameters()`,
//! `.data()`, `.json()`, `.headers()`), re-expressed as a builder that
//! mutates an owned `Request` and hands it to the session on `.send()`.

use std::path::PathBuf;

use crate::body::Body;
use crate::client::session::Session;
use crate::compress::Encoding;
use crate::error::ClientResult;
use crate::headers;
use crate::multipart::FormPart;
use crate::request::{BodyKind, Request};
use crate::response::Response;

pub struct RequestBuilder<'a> {
    session: &'a Session,
    request: Request,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(session: &'a Session, request: Request) -> Self {
        RequestBuilder { session, request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.url.add_query(key, value);
        self.request.message.headers.set(
            headers::HOST,
            self.request.url.host_header(),
        );
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers_mut().set(name, value);
        self
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.request.keep_alive = keep_alive;
        self
    }

    /// Requests gzip compression of the outgoing body. Compression is only
    /// actually applied, and `Content-Encoding` only actually set, when the
    /// body turns out to be at least the 1400-byte threshold (§6); below
    /// that this is a no-op, matching the resolved open question that the
    /// header must reflect what really happened rather than what was asked
    /// for.
    pub fn gzip(mut self) -> Self {
        self.request.gzip_body = Some(Encoding::Gzip);
        self
    }

    /// Adds an RFC 7231 `Date` header carrying the current time.
    pub fn date(mut self) -> Self {
        self.request.headers_mut().set(headers::DATE, httpdate::fmt_http_date(std::time::SystemTime::now()));
        self
    }

    pub fn ssl_verify(mut self, verify: bool) -> Self {
        self.request.ssl_verify = verify;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.request.read_buffer_size = size;
        self
    }

    pub fn stream_response_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.stream_response_to = Some(path.into());
        self
    }

    /// Attaches a raw byte body with an explicit content type, bypassing the
    /// `json`/`xml`/`utf8` flags entirely.
    pub fn body(mut self, data: impl Into<Vec<u8>>, content_type: &str) -> Self {
        self.request.set_body(Body::from_bytes(data.into()), Some(content_type));
        self
    }

    /// Attaches a raw byte body with no content type, leaving it to
    /// `json`/`xml`/`utf8` (or the session's `content_type`/`charset`
    /// defaults) to synthesize one.
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.request.set_body(Body::from_bytes(data.into()), None);
        self
    }

    /// Marks the body as JSON: synthesizes `Content-Type: application/json`
    /// unless a content type was already set explicitly.
    pub fn json(mut self) -> Self {
        self.request.body_kind = BodyKind::Json;
        self
    }

    /// Marks the body as XML: synthesizes `Content-Type: text/xml` unless a
    /// content type was already set explicitly.
    pub fn xml(mut self) -> Self {
        self.request.body_kind = BodyKind::Xml;
        self
    }

    /// Appends `; charset=utf-8` to whatever `Content-Type` `json`/`xml`, or
    /// the session default, would otherwise synthesize on its own.
    pub fn utf8(mut self) -> Self {
        self.request.body_utf8 = true;
        self
    }

    /// Attaches a JSON body, serialized from an already-encoded byte buffer
    /// (the caller does the `serde_json::to_vec`; this crate has no direct
    /// serde dependency of its own). Equivalent to `.data(data).json()`.
    pub fn json_body(self, data: impl Into<Vec<u8>>) -> Self {
        self.data(data).json()
    }

    /// Attaches an XML body. Equivalent to `.data(data).xml()`.
    pub fn xml_body(self, data: impl Into<Vec<u8>>) -> Self {
        self.data(data).xml()
    }

    pub fn form(mut self, parts: Vec<FormPart>) -> Self {
        self.request.set_body(Body::from_form(parts), None);
        self
    }

    pub fn file_body(mut self, path: impl Into<PathBuf>, chunk_size: usize, content_type: &str) -> crate::error::Result<Self> {
        let body = Body::from_file(path, chunk_size).map_err(crate::error::Error::File)?;
        self.request.set_body(body, Some(content_type));
        Ok(self)
    }

    pub fn send(self) -> ClientResult<Response> {
        self.session.send(self.request)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Method;
    use crate::url::Url;

    fn builder() -> RequestBuilder<'static> {
        let session: &'static Session = Box::leak(Box::new(Session::new()));
        RequestBuilder::new(session, Request::new(Method::Get, Url::parse("http://x/a").unwrap()))
    }

    #[test]
    fn query_appends_to_url() {
        let b = builder().query("k", "v");
        assert_eq!(b.request().url.query(), &[("k".to_string(), "v".to_string())]);
    }

    #[test]
    fn header_overrides_default() {
        let b = builder().header("X-Test", "1");
        assert_eq!(b.request().headers().get("X-Test"), Some("1"));
    }

    #[test]
    fn body_sets_content_type_and_length() {
        let b = builder().body(b"abc".to_vec(), "text/plain");
        assert_eq!(b.request().headers().get(headers::CONTENT_TYPE), Some("text/plain"));
        assert_eq!(b.request().headers().get(headers::CONTENT_LENGTH), Some("3"));
    }

    #[test]
    fn json_body_leaves_content_type_unset_until_send_applies_the_policy() {
        let mut b = builder().json_body(b"{}".to_vec());
        assert!(!b.request().headers().has(headers::CONTENT_TYPE));
        b.request.apply_content_type_policy(None, None);
        assert_eq!(b.request().headers().get(headers::CONTENT_TYPE), Some("application/json"));
    }

    #[test]
    fn xml_body_with_utf8_flag_gets_a_charset() {
        let mut b = builder().xml_body(b"<a/>".to_vec()).utf8();
        b.request.apply_content_type_policy(None, None);
        assert_eq!(b.request().headers().get(headers::CONTENT_TYPE), Some("text/xml; charset=utf-8"));
    }

    #[test]
    fn gzip_sets_the_request_encoding() {
        let b = builder().gzip();
        assert_eq!(b.request().gzip_body, Some(Encoding::Gzip));
    }

    #[test]
    fn date_sets_an_rfc7231_header() {
        let b = builder().date();
        let value = b.request().headers().get(headers::DATE).unwrap().to_string();
        assert!(value.ends_with("GMT"));
    }

    #[test]
    fn ssl_verify_overrides_the_session_default() {
        let b = builder().ssl_verify(false);
        assert!(!b.request().ssl_verify);
    }
}
