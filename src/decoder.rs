//! Decoding of the tile data stored in tile layers and chunks.
//!
//! Tiled stores tile data either as comma separated values
//! or as base64 encoded little endian u32 values,
//! optionally compressed with gzip or zlib.

use std::io::Read;

use crate::{Error, Result};

/// Text encoding of tile data.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Encoding {
    Csv,
    Base64,
}

impl std::str::FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Encoding::Csv),
            "base64" => Ok(Encoding::Base64),
            other => Err(Error::UnsupportedFeature(format!("Unsupported data encoding '{}'", other))),
        }
    }
}

/// Compression applied to base64 encoded tile data.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zlib,
    /// Recognized, but decoding is not supported.
    Zstd,
}

impl std::str::FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "zlib" => Ok(Compression::Zlib),
            "zstd" => Ok(Compression::Zstd),
            other => Err(Error::UnsupportedFeature(format!("Unsupported data compression '{}'", other))),
        }
    }
}

/// Decode a tile data string into raw 32 bit tile values (GIDs including flip flags).
///
/// Empty input decodes to an empty list.
/// Input that is not empty but cannot be decoded results in [Error::Decode].
///
/// Malformed values in csv data are skipped with a warning,
/// which produces fewer values than expected.
/// Callers have to compare the result against the expected number of tiles.
pub fn decode_tile_data(data: &str, encoding: Encoding, compression: Compression) -> Result<Vec<u32>> {
    match encoding {
        Encoding::Csv => {
            if compression != Compression::None {
                return Err(Error::UnsupportedFeature("Compression is only supported for base64 data".into()));
            }
            Ok(decode_csv(data))
        },
        Encoding::Base64 => {
            let raw_bytes = decode_base64(data)?;
            if raw_bytes.is_empty() {
                return Ok(Vec::new());
            }
            let raw_bytes = decompress(raw_bytes, compression)?;
            bytes_to_u32(&raw_bytes)
        },
    }
}

fn decode_csv(data: &str) -> Vec<u32> {
    data.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("skipping malformed tile value '{}': {}", token, e);
                None
            }
        })
        .collect()
}

/// Decode standard base64, ignoring whitespace.
/// Decoding stops at padding or at the first character outside of the alphabet.
fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let mut cleaned: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/'))
        .collect();

    match cleaned.len() % 4 {
        0 => {},
        1 => return Err(Error::Decode(format!("Truncated base64 data ({} characters)", cleaned.len()))),
        n => cleaned.extend(std::iter::repeat('=').take(4 - n)),
    }

    base64::decode_config(&cleaned, base64::STANDARD)
        .map_err(|e| Error::Decode(format!("Invalid base64 data: {}", e)))
}

fn decompress(raw_bytes: Vec<u8>, compression: Compression) -> Result<Vec<u8>> {
    // The output size is not known up front, the decoders grow the buffer as needed.
    macro_rules! decode_with {
        ($input:ident $compression:ident) => {{
            let mut decoded = Vec::with_capacity($input.len() * 10);
            let mut decoder = libflate::$compression::Decoder::new(&$input[..])
                .map_err(|e| Error::Decode(format!("Invalid {} header: {}", stringify!($compression), e)))?;
            decoder.read_to_end(&mut decoded)
                .map_err(|e| Error::Decode(format!("Failed to decompress {} data: {}", stringify!($compression), e)))?;
            decoded
        }};
    }

    Ok(match compression {
        Compression::None => raw_bytes,
        Compression::Zlib => decode_with!(raw_bytes zlib),
        Compression::Gzip => decode_with!(raw_bytes gzip),
        Compression::Zstd => return Err(Error::UnsupportedFeature("zstd compressed tile data".into())),
    })
}

fn bytes_to_u32(raw_bytes: &[u8]) -> Result<Vec<u32>> {
    const BYTE_SIZE: usize = std::mem::size_of::<u32>();
    if raw_bytes.len() % BYTE_SIZE != 0 {
        return Err(Error::Decode(format!(
            "Tile data has {} bytes, which is not a multiple of {}", raw_bytes.len(), BYTE_SIZE
        )));
    }

    // convert chunk of bytes into raw GIDs
    Ok(
        raw_bytes.chunks_exact(BYTE_SIZE)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
    )
}
