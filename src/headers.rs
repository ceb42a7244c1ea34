//! Ordered, case-insensitive header dictionary.
//!
//! Mirrors `webcc::HttpHeaderDict`: a `Vec` of `(name, value)` pairs rather
//! than a `HashMap`, because insertion order must survive into serialization
//! and the number of headers on a single message is always small.

use std::fmt;

pub const HOST: &str = "Host";
pub const DATE: &str = "Date";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";
pub const CONNECTION: &str = "Connection";
pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const ACCEPT: &str = "Accept";
pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
pub const USER_AGENT: &str = "User-Agent";
pub const SERVER: &str = "Server";

#[inline]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// An ordered list of header fields with case-insensitive name semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| eq_ignore_case(k, name))
    }

    /// Inserts or replaces a header. Replacing preserves the original
    /// insertion position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.find(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.find(name).map(|idx| self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The value of the `i`-th header pair, in insertion order.
    pub fn get_at(&self, i: usize) -> Option<(&str, &str)> {
        self.entries.get(i).map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `true` iff the `Connection` header names `close` (case-insensitive).
    pub fn connection_close(&self) -> bool {
        self.get(CONNECTION)
            .map(|v| v.eq_ignore_ascii_case("close"))
            .unwrap_or(false)
    }

    /// `true` iff `Connection: keep-alive` is present or absent-by-default
    /// (HTTP/1.1's default).
    pub fn connection_keep_alive(&self) -> bool {
        !self.connection_close()
    }

    /// Parsed `Content-Length`, if present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.get(CONTENT_LENGTH).and_then(|v| v.trim().parse().ok())
    }

    /// `true` iff `Transfer-Encoding` names `chunked` (the last coding, per
    /// RFC 9112 — this implementation only ever writes a single coding).
    pub fn is_chunked(&self) -> bool {
        self.get(TRANSFER_ENCODING)
            .map(|v| v.split(',').any(|tok| tok.trim().eq_ignore_ascii_case("chunked")))
            .unwrap_or(false)
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.get(CONTENT_ENCODING)
    }

    pub fn accepts_gzip(&self) -> bool {
        self.get(ACCEPT_ENCODING)
            .map(|v| v.contains("gzip"))
            .unwrap_or(false)
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "{k}: {v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_then_get_is_case_insensitive_and_single_valued() {
        let mut h = Headers::new();
        h.set("content-type", "text/plain");
        assert_eq!(h.get("Content-Type"), Some("text/plain"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn repeated_set_with_different_casing_preserves_position() {
        let mut h = Headers::new();
        h.set("Accept", "a");
        h.set("X-Other", "b");
        h.set("ACCEPT", "c");
        assert_eq!(h.len(), 2);
        assert_eq!(h.get_at(0), Some(("Accept", "c")));
        assert_eq!(h.get_at(1), Some(("X-Other", "b")));
    }

    #[test]
    fn connection_close_detection() {
        let mut h = Headers::new();
        assert!(h.connection_keep_alive());
        h.set("Connection", "Close");
        assert!(h.connection_close());
        assert!(!h.connection_keep_alive());
    }

    #[test]
    fn chunked_detection() {
        let mut h = Headers::new();
        h.set("Transfer-Encoding", "chunked");
        assert!(h.is_chunked());
    }
}
