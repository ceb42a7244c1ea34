//! The user-facing client: session-level default headers plus small
//! per-method shortcuts, backed by one pool and one `SessionConfig`.
//!
//! Grounded on `webcc::HttpClientSession`: its constructor seeds
//! `User-Agent`, `Accept-Encoding`, `Accept` and `Connection` headers that
//! every request inherits unless overridden at the request level.

use crate::client::builder::RequestBuilder;
use crate::client::engine;
use crate::client::pool::Pool;
use crate::config::SessionConfig;
use crate::error::ClientResult;
use crate::headers::{self, Headers};
use crate::request::{Method, Request};
use crate::response::Response;
use crate::url::Url;

pub struct Session {
    config: SessionConfig,
    pool: Pool,
    default_headers: Headers,
}

impl Session {
    pub fn new() -> Self {
        Session::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let mut default_headers = Headers::new();
        default_headers.set(headers::USER_AGENT, config.user_agent.clone());
        default_headers.set(headers::ACCEPT_ENCODING, config.default_accept_encoding.header_value());
        default_headers.set(headers::ACCEPT, config.default_accept.clone());
        default_headers.set(headers::CONNECTION, if config.keep_alive { "Keep-Alive" } else { "close" });
        Session { config, pool: Pool::new(), default_headers }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    pub fn default_headers_mut(&mut self) -> &mut Headers {
        &mut self.default_headers
    }

    /// Starts a request builder for `method`/`url`, pre-populated with the
    /// session's default headers and options.
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder<'_>, crate::error::Error> {
        let parsed = Url::parse(url)?;
        let mut request = Request::new(method, parsed);
        request.ssl_verify = self.config.ssl_verify;
        request.read_buffer_size = self.config.read_buffer_size;
        Ok(RequestBuilder::new(self, request))
    }

    pub fn get(&self, url: &str) -> Result<RequestBuilder<'_>, crate::error::Error> {
        self.request(Method::Get, url)
    }

    pub fn post(&self, url: &str) -> Result<RequestBuilder<'_>, crate::error::Error> {
        self.request(Method::Post, url)
    }

    pub fn put(&self, url: &str) -> Result<RequestBuilder<'_>, crate::error::Error> {
        self.request(Method::Put, url)
    }

    pub fn delete(&self, url: &str) -> Result<RequestBuilder<'_>, crate::error::Error> {
        self.request(Method::Delete, url)
    }

    pub fn head(&self, url: &str) -> Result<RequestBuilder<'_>, crate::error::Error> {
        self.request(Method::Head, url)
    }

    /// Applies the session defaults and sends `request`, returning the
    /// parsed response.
    pub(crate) fn send(&self, mut request: Request) -> ClientResult<Response> {
        for (name, value) in self.default_headers.iter() {
            if !request.headers().has(name) {
                request.headers_mut().set(name, value.to_string());
            }
        }
        if request.gzip_body.is_none() {
            request.gzip_body = self.config.gzip_request_body;
        }
        request.apply_content_type_policy(self.config.content_type.as_deref(), self.config.charset.as_deref());
        engine::send(&self.pool, &mut request, self.config.connect_timeout, self.config.read_timeout)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_headers_include_accept_and_user_agent() {
        let session = Session::new();
        assert!(session.default_headers().has(headers::USER_AGENT));
        assert_eq!(session.default_headers().get(headers::ACCEPT), Some("*/*"));
    }

    #[test]
    fn get_builds_request_with_get_method() {
        let session = Session::new();
        let builder = session.get("http://example.com/a").unwrap();
        assert_eq!(builder.request().method, Method::Get);
    }

    #[test]
    fn session_content_type_and_charset_apply_to_a_raw_body_on_send() {
        use std::io::{Read, Write};
        use std::net::TcpListener;
        use std::thread;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap();
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        let mut config = SessionConfig::default();
        config.content_type = Some("application/x-www-form-urlencoded".to_string());
        config.charset = Some("utf-8".to_string());
        let session = Session::with_config(config);

        let url = format!("http://127.0.0.1:{port}/submit");
        let _ = session.post(&url).unwrap().data(b"a=1".to_vec()).send();

        let sent = server.join().unwrap();
        assert!(sent.contains("Content-Type: application/x-www-form-urlencoded; charset=utf-8\r\n"));
    }
}
