//! Snappy decompression for iWork IWA files
//!
//! iWork uses a custom Snappy framing format that differs from the standard:
//! - No stream identifier chunk
//! - No CRC-32C checksums
//! - Custom chunk header format (4 bytes: type + 24-bit length)

use bytes::Bytes;
use snap::raw::{Decoder, Encoder};

use crate::iwa::{Error, Result};

/// Largest uncompressed block iWork writes per frame
const FRAME_BLOCK_SIZE: usize = 64 * 1024;

/// Largest payload a 24-bit frame length can declare
const MAX_FRAME_LEN: usize = 0x00FF_FFFF;

/// Custom Snappy stream decompressor for iWork IWA files
#[derive(Debug)]
pub struct SnappyStream {
    decompressed: Vec<u8>,
    frames: usize,
}

impl SnappyStream {
    /// Decompress a framed IWA entry
    ///
    /// iWork IWA files use a custom Snappy framing format:
    /// - 4-byte header: [chunk_type, length_byte1, length_byte2, length_byte3]
    /// - chunk_type is always 0 for compressed chunks
    /// - length is a 24-bit little-endian integer
    /// - No stream identifier, no CRC checksums
    ///
    /// Frames are decompressed in order and concatenated.
    pub fn decompress(data: &[u8]) -> Result<Self> {
        let mut decompressed = Vec::new();
        let mut decoder = Decoder::new();
        let mut rest = data;
        let mut frames = 0;

        while !rest.is_empty() {
            if rest.len() < 4 {
                return Err(Error::MalformedChunk(format!(
                    "Truncated frame header at frame {}: {} bytes left",
                    frames,
                    rest.len()
                )));
            }

            let chunk_type = rest[0];
            if chunk_type != 0 {
                return Err(Error::MalformedChunk(format!(
                    "Unexpected chunk type: {}, expected 0",
                    chunk_type
                )));
            }

            // Extract 24-bit length (little-endian)
            let length = u32::from_le_bytes([rest[1], rest[2], rest[3], 0]) as usize;
            rest = &rest[4..];

            if length > rest.len() {
                return Err(Error::MalformedChunk(format!(
                    "Frame {} declares {} bytes but only {} remain",
                    frames,
                    length,
                    rest.len()
                )));
            }

            let (payload, tail) = rest.split_at(length);
            if !payload.is_empty() {
                let mut block = decoder.decompress_vec(payload).map_err(|e| {
                    Error::MalformedChunk(format!("Decompression failed in frame {}: {}", frames, e))
                })?;
                decompressed.append(&mut block);
            }

            rest = tail;
            frames += 1;
        }

        Ok(SnappyStream {
            decompressed,
            frames,
        })
    }

    /// Compress data into the iWork framing, one frame per 64 KiB block
    pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = Encoder::new();
        let mut framed = Vec::with_capacity(data.len() / 2 + 8);

        for block in data.chunks(FRAME_BLOCK_SIZE) {
            let compressed = encoder
                .compress_vec(block)
                .map_err(|e| Error::MalformedChunk(format!("Compression failed: {}", e)))?;
            if compressed.len() > MAX_FRAME_LEN {
                return Err(Error::MalformedChunk(format!(
                    "Compressed frame of {} bytes exceeds the 24-bit length field",
                    compressed.len()
                )));
            }
            let length = (compressed.len() as u32).to_le_bytes();
            framed.extend_from_slice(&[0, length[0], length[1], length[2]]);
            framed.extend_from_slice(&compressed);
        }

        Ok(framed)
    }

    /// Get the decompressed data as a slice
    pub fn data(&self) -> &[u8] {
        &self.decompressed
    }

    /// Number of frames read from the entry
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Consume self and return the decompressed data
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.decompressed)
    }
}

impl AsRef<[u8]> for SnappyStream {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream() {
        let stream = SnappyStream::decompress(&[]).unwrap();
        assert_eq!(stream.data().len(), 0);
        assert_eq!(stream.frame_count(), 0);
    }

    #[test]
    fn test_invalid_chunk_type() {
        let invalid_data = [1, 0, 0, 0];
        match SnappyStream::decompress(&invalid_data).unwrap_err() {
            Error::MalformedChunk(msg) => assert!(msg.contains("Unexpected chunk type")),
            other => panic!("Expected MalformedChunk error, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_length_overrun() {
        let data = [0, 10, 0, 0, 1, 2, 3];
        match SnappyStream::decompress(&data).unwrap_err() {
            Error::MalformedChunk(msg) => assert!(msg.contains("declares 10 bytes")),
            other => panic!("Expected MalformedChunk error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            SnappyStream::decompress(&[0, 1]),
            Err(Error::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_corrupt_payload() {
        let data = [0, 3, 0, 0, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            SnappyStream::decompress(&data),
            Err(Error::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_multi_frame_concatenation() {
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let framed = SnappyStream::compress(&payload).unwrap();

        let stream = SnappyStream::decompress(&framed).unwrap();
        assert_eq!(stream.frame_count(), 4);
        assert_eq!(stream.data(), payload.as_slice());
    }
}
