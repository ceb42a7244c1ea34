//! URL value: scheme, host, port, path and query.
//!
//! This is deliberately a small value type, not a general URI per RFC 3986 —
//! it only models what the client and server engines need: an `http(s)`
//! origin, a path, and an ordered query string.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::Error;

const QUERY_ENCODE: &AsciiSet = &CONTROLS.add(b' ').add(b'&').add(b'=').add(b'#').add(b'%');

/// A parsed `http://` or `https://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
    query: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Scheme::Https)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Url {
    /// Parses a URL of the form `scheme://host[:port][/path][?query]`.
    pub fn parse(s: &str) -> Result<Url, Error> {
        let (scheme_str, rest) = s
            .split_once("://")
            .ok_or_else(|| Error::Syntax(format!("missing scheme in url: {s}")))?;

        let scheme = match scheme_str.to_ascii_lowercase().as_str() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(Error::Syntax(format!("unsupported scheme: {other}"))),
        };

        let (authority, path_and_query) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        if authority.is_empty() {
            return Err(Error::Syntax("empty host in url".into()));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port = p
                    .parse::<u16>()
                    .map_err(|_| Error::Syntax(format!("invalid port: {p}")))?;
                (h, Some(port))
            }
            None => (authority, None),
        };

        let (path, query_str) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_and_query, None),
        };

        let path = if path.is_empty() { "/".to_string() } else { path.to_string() };

        let query = query_str.map(parse_query).unwrap_or_default();

        Ok(Url {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
            path,
            query,
        })
    }

    /// Builds a `Url` on the server side from the `Host` header and the
    /// request-target off the wire, rather than a full `scheme://...` URL —
    /// the server never sees one, only the pieces HTTP/1.1 splits across
    /// the request line and the `Host` header. Always `http`: the server
    /// core has no notion of the TLS layer terminating in front of it.
    pub fn from_request_target(host_header: Option<&str>, request_target: &str) -> Url {
        let (host, port) = match host_header {
            Some(h) => match h.rsplit_once(':') {
                Some((h, p)) if p.parse::<u16>().is_ok() => (h.to_ascii_lowercase(), p.parse().ok()),
                _ => (h.to_ascii_lowercase(), None),
            },
            None => ("localhost".to_string(), None),
        };

        let (path, query_str) = match request_target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (request_target, None),
        };
        let path = if path.is_empty() { "/".to_string() } else { path.to_string() };
        let query = query_str.map(parse_query).unwrap_or_default();

        Url { scheme: Scheme::Http, host, port, path, query }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port, falling back to the scheme's default (80/443).
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    /// `true` if the port was explicitly present and is not the default.
    fn port_is_explicit(&self) -> bool {
        matches!(self.port, Some(p) if p != self.scheme.default_port())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.path = if path.starts_with('/') { path } else { format!("/{path}") };
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn add_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// The `Host` header value: `host` or `host:port` when the port is
    /// non-default.
    pub fn host_header(&self) -> String {
        if self.port_is_explicit() {
            format!("{}:{}", self.host, self.port())
        } else {
            self.host.clone()
        }
    }

    /// The request-target: path plus percent-encoded query string.
    pub fn request_target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            let mut out = self.path.clone();
            out.push('?');
            for (i, (k, v)) in self.query.iter().enumerate() {
                if i > 0 {
                    out.push('&');
                }
                out.push_str(&utf8_percent_encode(k, QUERY_ENCODE).to_string());
                out.push('=');
                out.push_str(&utf8_percent_encode(v, QUERY_ENCODE).to_string());
            }
            out
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host_header(), self.request_target())
    }
}

fn parse_query(s: &str) -> Vec<(String, String)> {
    s.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_host_path_query() {
        let url = Url::parse("http://x/get?k1=v1&k2=v2").unwrap();
        assert_eq!(url.host(), "x");
        assert_eq!(url.port(), 80);
        assert_eq!(url.path(), "/get");
        assert_eq!(url.query(), &[("k1".to_string(), "v1".to_string()), ("k2".to_string(), "v2".to_string())]);
    }

    #[test]
    fn default_ports_are_implicit_in_host_header() {
        let url = Url::parse("https://example.com/a").unwrap();
        assert_eq!(url.host_header(), "example.com");
        let url = Url::parse("https://example.com:444/a").unwrap();
        assert_eq!(url.host_header(), "example.com:444");
    }

    #[test]
    fn lowercases_host() {
        let url = Url::parse("http://EXAMPLE.com/").unwrap();
        assert_eq!(url.host(), "example.com");
    }

    #[test]
    fn defaults_path_to_root() {
        let url = Url::parse("http://x").unwrap();
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(Url::parse("ftp://x/").is_err());
    }

    #[test]
    fn from_request_target_splits_path_and_query() {
        let url = Url::from_request_target(Some("x:8080"), "/books?id=1");
        assert_eq!(url.host(), "x");
        assert_eq!(url.port(), 8080);
        assert_eq!(url.path(), "/books");
        assert_eq!(url.query(), &[("id".to_string(), "1".to_string())]);
    }

    #[test]
    fn from_request_target_without_host_header_defaults() {
        let url = Url::from_request_target(None, "/");
        assert_eq!(url.host(), "localhost");
    }
}
