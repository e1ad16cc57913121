//! Compression utilities
//!
//! Package entries carry a 16-bit codec id next to their locator. This
//! module maps those ids to the actual decoders.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Error, Result};

pub mod refpack;

/// Stored as-is
pub const CODEC_NONE: u16 = 0x0000;
/// Tombstone for a deleted index entry
pub const CODEC_DELETED: u16 = 0xFFE0;
/// RefPack, internal variant
pub const CODEC_REFPACK: u16 = 0xFFFE;
/// RefPack, streamable variant
pub const CODEC_STREAMABLE: u16 = 0xFFFF;
/// zlib ("ZB")
pub const CODEC_ZLIB: u16 = 0x5A42;

/// Upper bound on buffer space reserved from a declared size; larger outputs
/// grow as they are written.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Decoder selected by a codec id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None,
    RefPack,
    Zlib,
    Deleted,
    Unknown(u16),
}

impl CompressionMethod {
    /// Map a codec id from an index entry
    #[must_use]
    pub fn from_codec(codec: u16) -> Self {
        match codec {
            CODEC_NONE => CompressionMethod::None,
            CODEC_REFPACK | CODEC_STREAMABLE => CompressionMethod::RefPack,
            CODEC_ZLIB => CompressionMethod::Zlib,
            CODEC_DELETED => CompressionMethod::Deleted,
            other => CompressionMethod::Unknown(other),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::None => "none",
            CompressionMethod::RefPack => "refpack",
            CompressionMethod::Zlib => "zlib",
            CompressionMethod::Deleted => "deleted",
            CompressionMethod::Unknown(_) => "unknown",
        }
    }
}

/// Decode `data` stored with `codec`. `size` is the decompressed size from
/// the index entry.
///
/// # Errors
/// Returns [`Error::UnsupportedCompression`] for codec ids with no decoder
/// (including the deleted tombstone) and [`Error::CorruptData`] when the
/// payload does not decode.
pub fn decompress(codec: u16, data: &[u8], size: usize) -> Result<Vec<u8>> {
    match CompressionMethod::from_codec(codec) {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::RefPack => refpack::decompress(data),
        CompressionMethod::Zlib => zlib_decompress(data, Some(size)),
        CompressionMethod::Deleted | CompressionMethod::Unknown(_) => {
            Err(Error::UnsupportedCompression { codec })
        }
    }
}

/// Compress data with zlib at the default level
///
/// # Errors
/// Returns an error if the encoder fails.
pub fn zlib_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate zlib data, capped at `expected_size` bytes when given
///
/// # Errors
/// Returns [`Error::CorruptData`] if the stream is not valid zlib.
pub fn zlib_decompress(data: &[u8], expected_size: Option<usize>) -> Result<Vec<u8>> {
    let decoder = ZlibDecoder::new(data);
    let capacity = expected_size.unwrap_or_else(|| data.len().saturating_mul(4));
    let mut decompressed = Vec::with_capacity(capacity.min(MAX_PREALLOC));

    let read = match expected_size {
        Some(size) => decoder.take(size as u64).read_to_end(&mut decompressed),
        None => {
            let mut decoder = decoder;
            decoder.read_to_end(&mut decompressed)
        }
    };
    read.map_err(|e| Error::corrupt(format!("zlib: {e}")))?;

    if let Some(size) = expected_size {
        if decompressed.len() != size {
            tracing::warn!(
                "zlib stream inflated to {} bytes, index says {}",
                decompressed.len(),
                size
            );
        }
    }

    Ok(decompressed)
}
