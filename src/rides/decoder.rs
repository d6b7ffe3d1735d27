//! Decoding of push payloads into ride status records.
//!
//! A push payload is text: base64 over a compressed UTF-8 JSON array of
//! [`RideStatusRecord`]. The compression format is detected from the leading
//! bytes, the same way the backend's consumers always have:
//!
//! - gzip, starting with the `1f 8b` magic number
//! - zlib, starting with a valid two-byte zlib header
//! - raw deflate otherwise
//!
//! Decompressed content is capped at [`MAX_DECOMPRESSED_LEN`] bytes.

use std::io::{self, Read};

use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use log::debug;
use thiserror::Error;

use crate::rides::structs::RideStatusRecord;

/// Largest decompressed payload accepted, far above a park's worth of records.
pub const MAX_DECOMPRESSED_LEN: u64 = 4 * 1024 * 1024;

/// Errors raised when a push payload cannot be turned into ride records.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload text is not base64.
    #[error("malformed payload, invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded bytes do not decompress.
    #[error("malformed payload, failed to decompress {format}: {source}")]
    Decompression {
        format: Compression,
        source: io::Error,
    },
    /// The content inflates past [`MAX_DECOMPRESSED_LEN`].
    #[error("malformed payload, {format} content exceeds {limit} bytes")]
    TooLarge { format: Compression, limit: u64 },
    /// The decompressed text is not a JSON array of ride records.
    #[error("malformed payload, invalid ride records: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compression formats a payload may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    Deflate,
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zlib => write!(f, "zlib"),
            Compression::Deflate => write!(f, "deflate"),
        }
    }
}

/// Detects the compression format from the first bytes of the content.
pub fn detect_compression(prefix: &[u8]) -> Compression {
    match prefix {
        [0x1f, 0x8b, ..] => Compression::Gzip,
        [cmf, flg, ..] if is_zlib_header(*cmf, *flg) => Compression::Zlib,
        _ => Compression::Deflate,
    }
}

/// CM=8 (deflate), window size <= 32K, and the header checksum holds.
fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0f == 8 && cmf >> 4 <= 7 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}

fn decompress(bytes: &[u8], limit: u64) -> Result<Vec<u8>, PayloadError> {
    let format = detect_compression(bytes);
    let mut decompressed = Vec::new();

    // One byte past the limit tells an oversized payload from one that fits
    let result = match format {
        Compression::Gzip => GzDecoder::new(bytes)
            .take(limit + 1)
            .read_to_end(&mut decompressed),
        Compression::Zlib => ZlibDecoder::new(bytes)
            .take(limit + 1)
            .read_to_end(&mut decompressed),
        Compression::Deflate => DeflateDecoder::new(bytes)
            .take(limit + 1)
            .read_to_end(&mut decompressed),
    };

    if let Err(source) = result {
        return Err(PayloadError::Decompression { format, source });
    }
    if decompressed.len() as u64 > limit {
        return Err(PayloadError::TooLarge { format, limit });
    }

    debug!(
        "decompressed {} {} bytes into {} bytes",
        format,
        bytes.len(),
        decompressed.len()
    );
    Ok(decompressed)
}

/// Decodes a push payload into the ride records it carries.
///
/// # Arguments
///
/// * `payload` - The push text. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns a [`PayloadError`] if any step fails. Callers treat it as a push
/// carrying no record.
pub fn decode_payload(payload: &str) -> Result<Vec<RideStatusRecord>, PayloadError> {
    let compressed = STANDARD.decode(payload.trim())?;
    let decompressed = decompress(&compressed, MAX_DECOMPRESSED_LEN)?;
    // serde_json validates UTF-8 while parsing
    let records: Vec<RideStatusRecord> = serde_json::from_slice(&decompressed)?;

    debug!("decoded {} ride records", records.len());

    Ok(records)
}
