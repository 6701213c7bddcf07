/*!
Compression adapters for scalar payloads.

The writer tries to compress every stringified scalar and keeps the
compressed form only when it is strictly smaller. The default adapter uses
zlib (DEFLATE with a 2-byte header and Adler-32 trailer), whose small fixed
overhead means short payloads stay uncompressed.
*/

use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::{Result, SnapwireError};

/// Compression abstraction for payload bytes
///
/// This trait lets the writer and reader work with any algorithm without
/// being coupled to a specific implementation.
pub trait CompressionAdapter {
    /// Compress the input data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the input data
    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of the compression algorithm
    fn algorithm_name(&self) -> &str;
}

/// Zlib compression adapter
///
/// # Example
/// ```rust
/// use snapwire_core::{CompressionAdapter, ZlibCompressor};
///
/// let compressor = ZlibCompressor::new();
/// let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
/// let compressed = compressor.compress(data)?;
/// assert!(compressed.len() < data.len());
/// assert_eq!(compressor.decompress(&compressed)?, data.to_vec());
/// # Ok::<(), snapwire_core::SnapwireError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ZlibCompressor {
    compression_level: Compression,
}

impl ZlibCompressor {
    /// Create a new zlib compressor with default compression level (6)
    pub fn new() -> Self {
        Self {
            compression_level: Compression::default(),
        }
    }

    /// Create a new zlib compressor with the specified level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: Compression::new(level),
        }
    }

    /// Create a compressor for fast compression (level 1)
    pub fn fast() -> Self {
        Self::with_level(1)
    }

    /// Create a compressor for maximum compression (level 9)
    pub fn max() -> Self {
        Self::with_level(9)
    }

    pub fn level(&self) -> u32 {
        self.compression_level.level()
    }
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for ZlibCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.compression_level);

        encoder.write_all(data).map_err(|e| {
            SnapwireError::compression(format!("Failed to write data for compression: {e}"))
        })?;

        encoder
            .finish()
            .map_err(|e| SnapwireError::compression(format!("Failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(compressed_data);
        let mut decompressed = Vec::new();

        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SnapwireError::compression(format!("Failed to decompress data: {e}")))?;

        Ok(decompressed)
    }

    fn algorithm_name(&self) -> &str {
        "zlib"
    }
}

/// Pass-through adapter. Its output is never smaller than its input, so a
/// writer using it never emits the COMPRESSED marker.
#[derive(Debug, Clone)]
pub struct NoCompression;

impl NoCompression {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoCompression {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed_data.to_vec())
    }

    fn algorithm_name(&self) -> &str {
        "none"
    }
}
