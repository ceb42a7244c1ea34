//! The body contract: a tagged enum standing in for the original source's
//! `Body -> StringBody/FileBody/FormBody` virtual hierarchy, per the
//! re-architecture direction in the spec's design notes. Every variant
//! shares one operation — produce the next payload chunk, optionally
//! freeing the previous one — which the parser also implements from the
//! other end when streaming a response straight to disk.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::multipart::{self, FormPart};

/// A single buffer in a body's payload iteration. An empty payload means
/// iteration is finished.
pub type Payload = Vec<u8>;

/// The request/response body. Bodies are owned by their message.
pub enum Body {
    /// An empty body (HEAD responses, 204, 304, bodyless requests).
    Empty,
    /// A fully in-memory body; the whole buffer is yielded in one chunk.
    String(StringBody),
    /// A body read from a file in fixed-size chunks, without loading the
    /// whole file into memory.
    File(FileBody),
    /// A multipart/form-data body built from named fields and file parts.
    Form(FormBody),
}

impl Body {
    pub fn empty() -> Body {
        Body::Empty
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Body {
        Body::String(StringBody::new(data.into()))
    }

    pub fn from_file(path: impl Into<PathBuf>, chunk_size: usize) -> io::Result<Body> {
        Ok(Body::File(FileBody::open(path.into(), chunk_size)?))
    }

    pub fn from_form(parts: Vec<FormPart>) -> Body {
        Body::Form(FormBody::new(parts))
    }

    /// The total byte count a full iteration of this body would yield.
    /// `None` means the size cannot be known in advance (never the case
    /// for the variants this crate defines, but kept for symmetry with the
    /// parser's own "unknown length" framing).
    pub fn size(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::String(b) => Some(b.size()),
            Body::File(b) => Some(b.size()),
            Body::Form(b) => Some(b.size()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.size(), Some(0)) || matches!(self, Body::Empty)
    }

    /// Multipart's `Content-Type: multipart/form-data; boundary=...` value,
    /// when this is a form body.
    pub fn content_type(&self) -> Option<String> {
        match self {
            Body::Form(b) => Some(format!("multipart/form-data; boundary={}", b.boundary)),
            _ => None,
        }
    }

    /// Initializes iteration state. Must be called before the first
    /// `next_payload()`.
    pub fn init_payload(&mut self) {
        match self {
            Body::Empty => {}
            Body::String(b) => b.init_payload(),
            Body::File(b) => b.init_payload(),
            Body::Form(b) => b.init_payload(),
        }
    }

    /// Yields the next payload chunk. An empty vec means iteration is done;
    /// once empty has been returned, subsequent calls keep returning empty.
    pub fn next_payload(&mut self) -> Result<Payload, Error> {
        match self {
            Body::Empty => Ok(Vec::new()),
            Body::String(b) => Ok(b.next_payload()),
            Body::File(b) => b.next_payload(),
            Body::Form(b) => Ok(b.next_payload()),
        }
    }

    /// Reads the whole body into memory, consuming any remaining payload
    /// iteration. Used by the parser to assemble a `String`-style body from
    /// parsed wire bytes.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, Error> {
        self.init_payload();
        let mut out = Vec::new();
        loop {
            let chunk = self.next_payload()?;
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::String(b) => write!(f, "Body::String({} bytes)", b.size()),
            Body::File(b) => write!(f, "Body::File({:?}, {} bytes)", b.path, b.size()),
            Body::Form(b) => write!(f, "Body::Form({} parts)", b.parts.len()),
        }
    }
}

/// An in-memory body: the whole buffer, yielded once.
pub struct StringBody {
    data: Vec<u8>,
    yielded: bool,
}

impl StringBody {
    pub fn new(data: Vec<u8>) -> Self {
        StringBody { data, yielded: false }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn init_payload(&mut self) {
        self.yielded = false;
    }

    fn next_payload(&mut self) -> Payload {
        if self.yielded {
            Vec::new()
        } else {
            self.yielded = true;
            self.data.clone()
        }
    }
}

/// A body streamed from (or, on the server, served from) a file, read in
/// fixed-size chunks so the whole file never needs to live in memory.
pub struct FileBody {
    path: PathBuf,
    chunk_size: usize,
    size: u64,
    file: Option<File>,
}

impl FileBody {
    pub fn open(path: PathBuf, chunk_size: usize) -> io::Result<Self> {
        let file = File::open(&path)?;
        let size = file.metadata()?.len();
        Ok(FileBody { path, chunk_size: chunk_size.max(1), size, file: Some(file) })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_payload(&mut self) {
        if let Some(file) = &mut self.file {
            let _ = file.seek(SeekFrom::Start(0));
        }
    }

    fn next_payload(&mut self) -> Result<Payload, Error> {
        let file = match &mut self.file {
            Some(f) => f,
            None => return Ok(Vec::new()),
        };
        let mut buf = vec![0u8; self.chunk_size];
        let n = file.read(&mut buf).map_err(Error::File)?;
        buf.truncate(n);
        if n == 0 {
            self.file = None;
        }
        Ok(buf)
    }
}

/// A multipart/form-data body, yielding boundary + headers + data + CRLF
/// per part in attachment order, then the closing boundary.
pub struct FormBody {
    parts: Vec<FormPart>,
    boundary: String,
    rendered: Option<Vec<u8>>,
    offset: usize,
}

impl FormBody {
    pub fn new(parts: Vec<FormPart>) -> Self {
        let boundary = multipart::generate_boundary();
        FormBody { parts, boundary, rendered: None, offset: 0 }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn size(&self) -> u64 {
        multipart::total_size(&self.parts, &self.boundary)
    }

    fn init_payload(&mut self) {
        self.rendered = Some(multipart::render(&self.parts, &self.boundary));
        self.offset = 0;
    }

    fn next_payload(&mut self) -> Payload {
        let Some(rendered) = &self.rendered else {
            return Vec::new();
        };
        if self.offset >= rendered.len() {
            return Vec::new();
        }
        let chunk = rendered[self.offset..].to_vec();
        self.offset = rendered.len();
        chunk
    }
}

/// Writes every payload chunk of `body` to `out`, driving the iteration
/// contract end to end. Used by the parser's streaming hand-off and by
/// tests; production writers use `Message::write_to` instead, which
/// interleaves this with header serialization.
pub fn write_all(body: &mut Body, out: &mut impl Write) -> Result<(), Error> {
    body.init_payload();
    loop {
        let chunk = body.next_payload()?;
        if chunk.is_empty() {
            break;
        }
        out.write_all(&chunk).map_err(Error::SocketWrite)?;
    }
    Ok(())
}
