//! Incremental byte-stream parsing of a request or response message.
//!
//! `httparse` tokenizes the start line and header block; everything after
//! that — picking the body framing, reading a fixed or chunked body,
//! optionally decompressing it, optionally streaming it straight to disk —
//! is this module's own state machine, kept deliberately close to the shape
//! of the teacher's `BodyProgress` states (`Fixed`, `Chunked`, `Eof`) even
//! though here each state drives a blocking read loop instead of a reactor
//! callback.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::trace;

use crate::body::Body;
use crate::compress::{self, Encoding};
use crate::error::{Error, Result};
use crate::headers::{self, Headers};
use crate::message::Version;
use crate::request::Method;
use crate::response::Status;

/// `httparse` requires a fixed upper bound on the number of headers it will
/// tokenize in one pass.
const MAX_HEADER_COUNT: usize = 64;
/// Read calls pull this many bytes at a time while hunting for the header
/// terminator or a body chunk.
const READ_CHUNK: usize = 4096;

/// Caps applied while parsing a message, matching the server's
/// `max_header_bytes`/`max_body_bytes` configuration (§6). The client
/// engine uses generous fixed defaults since the crate exposes no
/// per-session equivalent.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_header_bytes: usize,
    pub max_body_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_header_bytes: 64 * 1024, max_body_bytes: 64 * 1024 * 1024 }
    }
}

/// How the body is framed on the wire, decided once the header block is
/// fully parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// No body at all (e.g. HEAD response, 204/304, explicit `Content-Length: 0`).
    None,
    /// `Content-Length: N`.
    Fixed(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// No framing header at all; read until the peer closes the connection.
    /// Only legal on a response.
    ReadToEnd,
}

/// The parsed start line and headers, common to requests and responses,
/// plus the framing decision made from them.
pub struct Head {
    headers: Headers,
    framing: Framing,
}

fn decide_framing(headers: &Headers, body_allowed: bool, limits: &Limits) -> Result<Framing> {
    if !body_allowed {
        return Ok(Framing::None);
    }
    if headers.is_chunked() {
        return Ok(Framing::Chunked);
    }
    if let Some(len) = headers.content_length() {
        if len > limits.max_body_bytes {
            return Err(Error::UnsupportedFraming(format!(
                "declared Content-Length {len} exceeds the {}-byte limit",
                limits.max_body_bytes
            )));
        }
        return Ok(if len == 0 { Framing::None } else { Framing::Fixed(len) });
    }
    Ok(Framing::None)
}

/// Reads from `src` until `buf` contains a full `\r\n\r\n`-terminated header
/// block, returning the offset of the blank line's first byte.
fn read_until_headers_end(src: &mut impl Read, buf: &mut Vec<u8>, limits: &Limits) -> Result<usize> {
    loop {
        if let Some(pos) = find_header_terminator(buf) {
            return Ok(pos);
        }
        if buf.len() > limits.max_header_bytes {
            return Err(Error::Syntax("header block too large".into()));
        }
        let mut chunk = [0u8; READ_CHUNK];
        let n = src.read(&mut chunk).map_err(Error::SocketRead)?;
        if n == 0 {
            return Err(Error::Syntax("connection closed before headers completed".into()));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn headers_from_raw(raw: &[&str]) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in raw.iter().filter_map(|line| line.split_once(':')) {
        headers.set(name.trim(), value.trim().to_string());
    }
    headers
}

/// Reads a full request from `src`: start line, headers, and (if framed) a
/// body. `src` must already be positioned at the start of a request.
pub fn read_request(src: &mut impl Read, limits: &Limits) -> Result<(Method, String, Version, Head, Body)> {
    let mut buf = Vec::new();
    let header_end = read_until_headers_end(src, &mut buf, limits)?;
    let total = header_end + 4;

    let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut req = httparse::Request::new(&mut raw_headers);
    let status = req
        .parse(&buf[..total])
        .map_err(|e| Error::Syntax(format!("malformed request: {e}")))?;
    if status.is_partial() {
        return Err(Error::Syntax("incomplete request line".into()));
    }

    let method_str = req.method.ok_or_else(|| Error::Syntax("missing method".into()))?;
    let method = Method::parse(method_str)
        .ok_or_else(|| Error::Syntax(format!("unsupported method: {method_str}")))?;
    let path = req.path.ok_or_else(|| Error::Syntax("missing request target".into()))?.to_string();
    let version = match req.version {
        Some(1) => Version::Http11,
        Some(0) => Version::Http10,
        _ => return Err(Error::Syntax("unsupported HTTP version".into())),
    };

    let header_lines: Vec<String> = req
        .headers
        .iter()
        .map(|h| format!("{}: {}", h.name, String::from_utf8_lossy(h.value)))
        .collect();
    let header_refs: Vec<&str> = header_lines.iter().map(|s| s.as_str()).collect();
    let headers = headers_from_raw(&header_refs);

    let framing = decide_framing(&headers, method != Method::Head, limits)?;
    let head = Head { headers, framing };

    let leftover = buf[total..].to_vec();
    let body = read_body(src, &head, leftover)?;
    trace!("parsed {method:?} {path} ({framing:?})");

    Ok((method, path, version, head, body))
}

/// Reads a full response's start line and header block from `src`, without
/// reading the body. `response_to_head` indicates the request's method was
/// `HEAD`, which forbids any response body regardless of framing headers.
/// Returns the parsed head plus leftover bytes already read past the header
/// terminator.
fn parse_response_head(
    src: &mut impl Read,
    response_to_head: bool,
    limits: &Limits,
) -> Result<(Version, Status, String, Head, Vec<u8>)> {
    let mut buf = Vec::new();
    let header_end = read_until_headers_end(src, &mut buf, limits)?;
    let total = header_end + 4;

    let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut resp = httparse::Response::new(&mut raw_headers);
    let status = resp
        .parse(&buf[..total])
        .map_err(|e| Error::Syntax(format!("malformed response: {e}")))?;
    if status.is_partial() {
        return Err(Error::Syntax("incomplete status line".into()));
    }

    let version = match resp.version {
        Some(1) => Version::Http11,
        Some(0) => Version::Http10,
        _ => return Err(Error::Syntax("unsupported HTTP version".into())),
    };
    let code = resp.code.ok_or_else(|| Error::Syntax("missing status code".into()))?;
    let status_code = Status(code);
    let reason = resp.reason.unwrap_or("").to_string();

    let header_lines: Vec<String> = resp
        .headers
        .iter()
        .map(|h| format!("{}: {}", h.name, String::from_utf8_lossy(h.value)))
        .collect();
    let header_refs: Vec<&str> = header_lines.iter().map(|s| s.as_str()).collect();
    let headers = headers_from_raw(&header_refs);

    let body_allowed = !response_to_head && !status_code.forbids_body();
    let framing = if body_allowed && !headers.is_chunked() && headers.content_length().is_none() {
        Framing::ReadToEnd
    } else {
        decide_framing(&headers, body_allowed, limits)?
    };
    let head = Head { headers, framing };
    let leftover = buf[total..].to_vec();
    trace!("parsed response {} {reason} ({framing:?})", status_code.0);

    Ok((version, status_code, reason, head, leftover))
}

/// Reads a full response from `src`, buffering the body in memory.
pub fn read_response(
    src: &mut impl Read,
    response_to_head: bool,
    limits: &Limits,
) -> Result<(Version, Status, String, Head, Body)> {
    let (version, status, reason, head, leftover) = parse_response_head(src, response_to_head, limits)?;
    let body = read_body(src, &head, leftover)?;
    Ok((version, status, reason, head, body))
}

/// Reads a full response the same way as `read_response`, except the body
/// is written straight to `dest` instead of being buffered in memory. If
/// `Content-Encoding` names a supported codec, the raw bytes land in a
/// sibling temp file first and are then decoded into `dest`; either way, a
/// failure anywhere in the body phase removes whatever partial file(s) it
/// created and surfaces the underlying error (`DecodeError` for a failed
/// decode, matching §7).
pub fn read_response_to_file(
    src: &mut impl Read,
    response_to_head: bool,
    limits: &Limits,
    dest: &Path,
) -> Result<(Version, Status, String, Head, Body)> {
    let (version, status, reason, head, leftover) = parse_response_head(src, response_to_head, limits)?;
    let encoding = match head.headers.content_encoding() {
        Some(v) => Some(Encoding::from_header(v).ok_or_else(|| Error::UnsupportedEncoding(v.to_string()))?),
        None => None,
    };

    let mut dest_file = File::create(dest).map_err(Error::File)?;

    match encoding {
        None => {
            if let Err(e) = stream_body(src, &head, leftover, &mut dest_file) {
                let _ = std::fs::remove_file(dest);
                return Err(e);
            }
        }
        Some(encoding) => {
            let raw_path = dest.with_extension("raw");
            let result = (|| -> Result<()> {
                {
                    let mut raw_file = File::create(&raw_path).map_err(Error::File)?;
                    stream_body(src, &head, leftover, &mut raw_file)?;
                }
                let mut raw_bytes = Vec::new();
                File::open(&raw_path)
                    .map_err(Error::File)?
                    .read_to_end(&mut raw_bytes)
                    .map_err(Error::File)?;
                let decoded = compress::decompress(encoding, &raw_bytes)?;
                dest_file.write_all(&decoded).map_err(Error::File)
            })();
            let _ = std::fs::remove_file(&raw_path);
            if let Err(e) = result {
                let _ = std::fs::remove_file(dest);
                return Err(e);
            }
        }
    }

    let chunk_size = 64 * 1024;
    let body = Body::from_file(dest, chunk_size).map_err(Error::File)?;
    Ok((version, status, reason, head, body))
}

/// Reads the body described by `head.framing`, starting from whatever
/// header-block leftover bytes are already buffered, then decompresses it
/// if `Content-Encoding` names a codec this crate supports.
fn read_body(src: &mut impl Read, head: &Head, leftover: Vec<u8>) -> Result<Body> {
    let mut raw = Vec::new();
    stream_body(src, head, leftover, &mut raw)?;

    let encoding = match head.headers.content_encoding() {
        Some(v) => Some(Encoding::from_header(v).ok_or_else(|| Error::UnsupportedEncoding(v.to_string()))?),
        None => None,
    };
    let decoded = match encoding {
        Some(encoding) if !raw.is_empty() => compress::decompress(encoding, &raw)?,
        Some(_) => raw,
        None => raw,
    };

    Ok(Body::from_bytes(decoded))
}

/// Reads the body described by `head.framing` and writes every byte to
/// `out`, without decoding — shared by the in-memory path (`out` is a
/// `Vec<u8>`) and the streaming-to-disk path (`out` is a `File`).
fn stream_body(src: &mut impl Read, head: &Head, leftover: Vec<u8>, out: &mut impl Write) -> Result<()> {
    match head.framing {
        Framing::None => Ok(()),
        Framing::Fixed(len) => stream_fixed(src, leftover, len, out),
        Framing::Chunked => stream_chunked(src, leftover, out),
        Framing::ReadToEnd => stream_to_end(src, leftover, out),
    }
}

fn stream_fixed(src: &mut impl Read, leftover: Vec<u8>, len: u64, out: &mut impl Write) -> Result<()> {
    let len = len as usize;
    let take = len.min(leftover.len());
    out.write_all(&leftover[..take]).map_err(Error::SocketWrite)?;
    let mut remaining = len - take;
    let mut chunk = [0u8; READ_CHUNK];
    while remaining > 0 {
        let want = remaining.min(chunk.len());
        let n = src.read(&mut chunk[..want]).map_err(Error::SocketRead)?;
        if n == 0 {
            return Err(Error::Syntax("connection closed mid-body".into()));
        }
        out.write_all(&chunk[..n]).map_err(Error::SocketWrite)?;
        remaining -= n;
    }
    Ok(())
}

fn stream_to_end(src: &mut impl Read, leftover: Vec<u8>, out: &mut impl Write) -> Result<()> {
    out.write_all(&leftover).map_err(Error::SocketWrite)?;
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = src.read(&mut chunk).map_err(Error::SocketRead)?;
        if n == 0 {
            break;
        }
        out.write_all(&chunk[..n]).map_err(Error::SocketWrite)?;
    }
    Ok(())
}

/// Streams a chunked body: `hex-size[;ext]\r\nDATA\r\n` repeated, terminated
/// by a zero-size chunk and an (ignored) trailer section.
fn stream_chunked(src: &mut impl Read, mut pending: Vec<u8>, out: &mut impl Write) -> Result<()> {
    loop {
        let size_line_end = loop {
            if let Some(pos) = pending.windows(2).position(|w| w == b"\r\n") {
                break pos;
            }
            pull_more(src, &mut pending)?;
        };
        let size_line = std::str::from_utf8(&pending[..size_line_end])
            .map_err(|_| Error::Syntax("non-utf8 chunk size line".into()))?;
        let size_str = size_line.split(';').next().unwrap_or(size_line).trim();
        let chunk_len = usize::from_str_radix(size_str, 16)
            .map_err(|_| Error::Syntax(format!("invalid chunk size: {size_str}")))?;
        pending.drain(..size_line_end + 2);

        if chunk_len == 0 {
            // Trailer section: read up to the final blank line and discard.
            loop {
                if pending.windows(2).position(|w| w == b"\r\n") == Some(0) {
                    pending.drain(..2);
                    return Ok(());
                }
                if find_header_terminator(&pending).is_some() {
                    return Ok(());
                }
                pull_more(src, &mut pending)?;
            }
        }

        while pending.len() < chunk_len + 2 {
            pull_more(src, &mut pending)?;
        }
        out.write_all(&pending[..chunk_len]).map_err(Error::SocketWrite)?;
        pending.drain(..chunk_len + 2);
    }
}

fn pull_more(src: &mut impl Read, pending: &mut Vec<u8>) -> Result<()> {
    let mut chunk = [0u8; READ_CHUNK];
    let n = src.read(&mut chunk).map_err(Error::SocketRead)?;
    if n == 0 {
        return Err(Error::Syntax("connection closed mid-chunk".into()));
    }
    pending.extend_from_slice(&chunk[..n]);
    Ok(())
}

pub fn head_headers(head: &Head) -> &Headers {
    &head.headers
}
