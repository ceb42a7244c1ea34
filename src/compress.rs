//! Gzip/deflate encode and decode, used by request-body compression and by
//! the parser's `Content-Encoding` decode stage.
//!
//! Grounded on the `flate2` dependency used throughout the surrounding
//! ecosystem for this exact concern (e.g. the `http-serve` crate in the
//! retrieval pack depends on `flate2` for response compression).

use std::io::{Read, Write};

use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

use crate::error::Error;

/// Request-body compression is skipped below this size — matching the
/// original source's documented 1400-byte threshold.
pub const GZIP_THRESHOLD: usize = 1400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    pub fn from_header(value: &str) -> Option<Encoding> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" => Some(Encoding::Gzip),
            "deflate" => Some(Encoding::Deflate),
            _ => None,
        }
    }

    pub fn header_value(self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }
}

pub fn compress(encoding: Encoding, data: &[u8]) -> Result<Vec<u8>, Error> {
    match encoding {
        Encoding::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(data).map_err(|e| Error::Decode(e.to_string()))?;
            enc.finish().map_err(|e| Error::Decode(e.to_string()))
        }
        Encoding::Deflate => {
            let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
            enc.write_all(data).map_err(|e| Error::Decode(e.to_string()))?;
            enc.finish().map_err(|e| Error::Decode(e.to_string()))
        }
    }
}

pub fn decompress(encoding: Encoding, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    match encoding {
        Encoding::Gzip => {
            GzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| Error::Decode(e.to_string()))?;
        }
        Encoding::Deflate => {
            DeflateDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| Error::Decode(e.to_string()))?;
        }
    }
    Ok(out)
}

/// Compresses `data` iff it meets the gzip threshold, returning `None` when
/// compression was skipped — callers must only set `Content-Encoding` when
/// this returns `Some` (Open Question 1 of the spec).
pub fn compress_if_worthwhile(encoding: Encoding, data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    if data.len() < GZIP_THRESHOLD {
        return Ok(None);
    }
    compress(encoding, data).map(Some)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gzip_round_trips() {
        let data = b"a".repeat(2000);
        let compressed = compress(Encoding::Gzip, &data).unwrap();
        let restored = decompress(Encoding::Gzip, &compressed).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn deflate_round_trips() {
        let data = b"hello world".repeat(200);
        let compressed = compress(Encoding::Deflate, &data).unwrap();
        let restored = decompress(Encoding::Deflate, &compressed).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn below_threshold_is_skipped() {
        let data = b"short";
        assert!(compress_if_worthwhile(Encoding::Gzip, data).unwrap().is_none());
    }

    #[test]
    fn above_threshold_compresses() {
        let data = b"x".repeat(GZIP_THRESHOLD + 1);
        assert!(compress_if_worthwhile(Encoding::Gzip, &data).unwrap().is_some());
    }
}
