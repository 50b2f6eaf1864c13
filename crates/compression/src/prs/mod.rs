//! PRS codec
//!
//! PRS is an LZ77-style format whose control stream is read one bit at a time
//! and interleaved with the data stream, so the decoder only ever moves
//! forward through the input.
//!
//! | Opcode        | Control bits | Data bytes                  | Meaning                          |
//! |---------------|--------------|-----------------------------|----------------------------------|
//! | Literal       | `1`          | 1                           | emit the byte                    |
//! | Short copy    | `00bb`       | 1 (offset, -256..=-1)       | copy `bb + 2` bytes              |
//! | Long copy     | `01`         | 2 LE (13-bit offset, size)  | copy `size + 2` bytes (size ≠ 0) |
//! | Extended copy | `01`         | 2 LE (size field 0) + 1     | copy `byte + 1` bytes            |
//! | Stop          | `01`         | 2 zero bytes                | end of stream                    |
//!
//! Copies run one byte at a time, so a copy may overlap the bytes it is
//! producing and repeat them.

mod compressor;
mod decoder;

pub use compressor::*;
pub use decoder::*;

/// Longest copy any opcode can express
pub(crate) const MAX_COPY: usize = 0x100;
pub(crate) const SHORT_COPY_MAX_SIZE: usize = 5;
pub(crate) const SHORT_COPY_MAX_DISTANCE: isize = 0x100;
pub(crate) const LONG_COPY_MAX_DISTANCE: isize = 0x1FFF;
