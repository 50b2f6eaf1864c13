//! Compression method dispatch

use crate::{bc0_compress, bc0_decompress, prs_compress, prs_decompress, CompressionError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Compression method used for a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Zlib,
    Bzip2,
    Prs,
    Bc0,
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionType::None => "none",
            CompressionType::Zlib => "zlib",
            CompressionType::Bzip2 => "bzip2",
            CompressionType::Prs => "prs",
            CompressionType::Bc0 => "bc0",
        };
        f.write_str(name)
    }
}

impl FromStr for CompressionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "zlib" => Ok(CompressionType::Zlib),
            "bzip2" => Ok(CompressionType::Bzip2),
            "prs" => Ok(CompressionType::Prs),
            "bc0" => Ok(CompressionType::Bc0),
            other => Err(format!("unknown compression type: {}", other)),
        }
    }
}

/// Compress data using the specified method
///
/// `level` only applies to PRS.
pub fn compress(data: &[u8], method: CompressionType, level: usize) -> Result<Vec<u8>> {
    match method {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionType::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionType::Prs => prs_compress(data, level, None),
        CompressionType::Bc0 => Ok(bc0_compress(data, None)),
    }
}

/// Decompress data using the specified method
///
/// `max_output_size` of 0 means unbounded. BC0 streams carry no framing to
/// reject, so oversized BC0 output is checked after decoding.
pub fn decompress(data: &[u8], method: CompressionType, max_output_size: usize) -> Result<Vec<u8>> {
    let decompressed = match method {
        CompressionType::None => data.to_vec(),
        CompressionType::Zlib => read_limited(ZlibDecoder::new(data), max_output_size)?,
        CompressionType::Bzip2 => {
            read_limited(bzip2::read::BzDecoder::new(data), max_output_size)?
        }
        CompressionType::Prs => return prs_decompress(data, max_output_size),
        CompressionType::Bc0 => bc0_decompress(data),
    };

    if max_output_size != 0 && decompressed.len() > max_output_size {
        return Err(CompressionError::OutputLimitExceeded {
            limit: max_output_size,
        });
    }
    Ok(decompressed)
}

/// Read a decoder to the end, stopping one byte past the limit
fn read_limited<R: Read>(mut decoder: R, max_output_size: usize) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    if max_output_size == 0 {
        decoder.read_to_end(&mut decompressed)?;
    } else {
        decoder
            .take(max_output_size as u64 + 1)
            .read_to_end(&mut decompressed)?;
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"Hello, World! This is a test of the compression system. Hello, World!";

    #[test]
    fn test_every_method_roundtrips() {
        for method in [
            CompressionType::None,
            CompressionType::Zlib,
            CompressionType::Bzip2,
            CompressionType::Prs,
            CompressionType::Bc0,
        ] {
            let compressed = compress(SAMPLE, method, 2).unwrap();
            match method {
                CompressionType::None => assert_eq!(SAMPLE, &compressed[..]),
                _ => assert_ne!(SAMPLE, &compressed[..], "method {}", method),
            }
            let decompressed = decompress(&compressed, method, 0).unwrap();
            assert_eq!(SAMPLE, &decompressed[..], "method {}", method);
        }
    }

    #[test]
    fn test_output_limit_applies_to_every_method() {
        for method in [
            CompressionType::None,
            CompressionType::Zlib,
            CompressionType::Bzip2,
            CompressionType::Prs,
            CompressionType::Bc0,
        ] {
            let compressed = compress(SAMPLE, method, 1).unwrap();
            assert!(
                matches!(
                    decompress(&compressed, method, 10),
                    Err(CompressionError::OutputLimitExceeded { limit: 10 })
                ),
                "method {}",
                method
            );
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("PRS".parse::<CompressionType>().unwrap(), CompressionType::Prs);
        assert_eq!("bc0".parse::<CompressionType>().unwrap(), CompressionType::Bc0);
        assert_eq!(CompressionType::Bzip2.to_string(), "bzip2");
        assert!("lzma".parse::<CompressionType>().is_err());
    }
}
