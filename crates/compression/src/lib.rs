//! # PServ Compression Library
//!
//! Codecs for the compressed payloads the game clients exchange with the
//! server and load from disk. Encoder output is bit-compatible with the
//! decoders built into the clients.
//!
//! ## Architecture
//!
//! ### 1. PRS ([`prs`])
//! The main LZ77-style format, with literals, short/long/extended copies,
//! and an explicit stop opcode:
//! - [`PrsCompressor`]: streaming compressor with a configurable search depth
//! - [`prs_decompress`]: decoder with an optional output size cap
//! - [`prs_decompress_size`]: decoded size without producing the output
//! - [`prs_disassemble`]: one text line per opcode, for debugging
//!
//! ### 2. BC0 ([`bc0`])
//! A simpler format decoded through a 4096-byte circular memo, with no stop
//! opcode: [`bc0_compress`], [`bc0_decompress`], [`bc0_decompress_size`],
//! [`bc0_disassemble`].
//!
//! ### 3. Dispatch ([`compression`])
//! [`CompressionType`] selects between PRS, BC0, zlib, bzip2 and raw payloads.
//!
//! ## Usage Example
//!
//! ```rust
//! use pserv_compression::{prs_compress, prs_decompress, prs_decompress_size};
//!
//! let data = b"quest data quest data quest data";
//! let compressed = prs_compress(data, 2, None).unwrap();
//! assert_eq!(prs_decompress_size(&compressed, 0).unwrap(), data.len());
//! assert_eq!(prs_decompress(&compressed, 0).unwrap(), data);
//! ```
//!
//! Every call owns its own window, index and memo, so independent calls can
//! run on separate threads.

pub mod bc0;
pub mod bitstream;
pub mod compression;
mod error;
pub mod prs;
pub mod window;

pub use bc0::*;
pub use compression::*;
pub use error::*;
pub use prs::*;

/// Progress callback: `(input bytes processed, output bytes written)`
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);
