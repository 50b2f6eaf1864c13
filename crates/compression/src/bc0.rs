//! BC0 codec
//!
//! BC0 is a simpler relative of PRS. Each control byte announces eight
//! opcodes (LSB first) and is followed directly by their data bytes:
//!
//! - `1`: literal, one data byte
//! - `0`: backreference, two data bytes `BBBBBBBB AAAACCCC` giving memo offset
//!   `AAAABBBBBBBB` and size `CCCC + 3`
//!
//! There is no stop opcode. The decoder keeps a 4096-byte circular memo of
//! its output. The first output byte lands at memo offset 0xFEE, so memo
//! pages start 0x12 bytes before multiples of 0x1000 in the output, and a
//! backreference names a memo slot rather than a distance.

use crate::bitstream::{ByteReader, GroupWriter};
use crate::{CompressionError, ProgressFn, Result};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::io::Write;
use tracing::{debug, warn};

const MEMO_SIZE: usize = 0x1000;
const MEMO_MASK: usize = MEMO_SIZE - 1;
/// Memo offset of the first output byte
const MEMO_START: usize = 0x0FEE;
/// Output offset `o` lives at memo slot `(o - PAGE_BIAS) & MEMO_MASK`
const PAGE_BIAS: usize = MEMO_SIZE - MEMO_START;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 0x12;

/// Entry in the compressor's window index: an input offset ordered by the
/// (up to) 18 bytes starting there, then by offset
#[derive(Debug, Clone, Copy)]
struct WindowKey<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> WindowKey<'a> {
    fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    fn prefix(&self) -> &'a [u8] {
        let end = (self.offset + MAX_MATCH).min(self.data.len());
        &self.data[self.offset..end]
    }
}

impl Ord for WindowKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix()
            .cmp(other.prefix())
            .then(self.offset.cmp(&other.offset))
    }
}

impl PartialOrd for WindowKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for WindowKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WindowKey<'_> {}

fn match_length(data: &[u8], a: usize, b: usize) -> usize {
    data[a..]
        .iter()
        .zip(&data[b..])
        .take(MAX_MATCH)
        .take_while(|(x, y)| x == y)
        .count()
}

/// Compress a whole buffer with BC0
///
/// `progress` receives `(input offset, output bytes)` each time the input
/// offset enters a new 4096-byte page.
///
/// The output decodes correctly but is not always as small as what the
/// game's own tools produce.
pub fn bc0_compress(data: &[u8], mut progress: Option<ProgressFn<'_>>) -> Vec<u8> {
    let mut w = GroupWriter::new();
    let mut index: BTreeSet<WindowKey<'_>> = BTreeSet::new();
    let mut read_offset = 0;
    let mut last_progress_offset = 0;

    while read_offset < data.len() {
        if let Some(progress) = progress.as_mut() {
            if (last_progress_offset & !MEMO_MASK) != (read_offset & !MEMO_MASK) {
                last_progress_offset = read_offset;
                progress(read_offset, w.len());
            }
        }

        // Exact matches are rare, so the best candidate is either side of
        // where the current position would sort
        let key = WindowKey::new(data, read_offset);
        let mut match_offset = 0;
        let mut match_size = 0;
        if let Some(after) = index.range(key..).next() {
            match_offset = after.offset;
            match_size = match_length(data, read_offset, after.offset);
        }
        if let Some(before) = index.range(..key).next_back() {
            let size = match_length(data, read_offset, before.offset);
            if size > match_size {
                match_offset = before.offset;
                match_size = size;
            }
        }

        if match_size >= MIN_MATCH {
            let memo_offset = match_offset.wrapping_sub(PAGE_BIAS) & MEMO_MASK;
            w.write_control(false);
            w.write_data((memo_offset & 0xFF) as u8);
            w.write_data((((memo_offset >> 4) & 0xF0) | (match_size - MIN_MATCH)) as u8);
        } else {
            match_size = 1;
            w.write_control(true);
            w.write_data(data[read_offset]);
        }
        w.flush_if_ready();

        for _ in 0..match_size {
            if read_offset >= MEMO_SIZE {
                index.remove(&WindowKey::new(data, read_offset - MEMO_SIZE));
            }
            index.insert(WindowKey::new(data, read_offset));
            read_offset += 1;
        }
    }

    let out = w.finish();
    debug!("BC0 compressed {} bytes into {} bytes", data.len(), out.len());
    out
}

/// One decoded BC0 opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bc0Opcode {
    Literal(u8),
    Backreference { memo_offset: usize, count: usize },
}

/// Iterator over the opcodes of a BC0 stream
///
/// Input that ends partway through an opcode ends the iteration; the partial
/// opcode is dropped.
pub struct Bc0Reader<'a> {
    input: ByteReader<'a>,
    control: u16,
}

impl<'a> Bc0Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            input: ByteReader::new(data),
            control: 0,
        }
    }
}

impl Iterator for Bc0Reader<'_> {
    type Item = Bc0Opcode;

    fn next(&mut self) -> Option<Bc0Opcode> {
        if self.input.is_empty() {
            return None;
        }

        // High byte marks which low bits are still unread
        self.control >>= 1;
        if self.control & 0x100 == 0 {
            self.control = 0xFF00 | self.input.read_u8().ok()? as u16;
            if self.input.is_empty() {
                return None;
            }
        }

        if self.control & 1 == 0 {
            let a1 = self.input.read_u8().ok()?;
            if self.input.is_empty() {
                warn!(
                    "Discarding truncated BC0 backreference at offset {:#X}",
                    self.input.position() - 1
                );
                return None;
            }
            let a2 = self.input.read_u8().ok()?;
            Some(Bc0Opcode::Backreference {
                memo_offset: a1 as usize | (((a2 as usize) << 4) & 0xF00),
                count: (a2 & 0x0F) as usize + MIN_MATCH,
            })
        } else {
            Some(Bc0Opcode::Literal(self.input.read_u8().ok()?))
        }
    }
}

/// Decompress a BC0 stream
pub fn bc0_decompress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut memo = [0u8; MEMO_SIZE];
    let mut memo_offset = MEMO_START;

    for opcode in Bc0Reader::new(data) {
        match opcode {
            Bc0Opcode::Literal(v) => {
                out.push(v);
                memo[memo_offset] = v;
                memo_offset = (memo_offset + 1) & MEMO_MASK;
            }
            Bc0Opcode::Backreference {
                memo_offset: source,
                count,
            } => {
                for z in 0..count {
                    let v = memo[(source + z) & MEMO_MASK];
                    out.push(v);
                    memo[memo_offset] = v;
                    memo_offset = (memo_offset + 1) & MEMO_MASK;
                }
            }
        }
    }

    out
}

/// Compute the decompressed size of a BC0 stream without producing it
///
/// `max_output_size` of 0 means unbounded.
pub fn bc0_decompress_size(data: &[u8], max_output_size: usize) -> Result<usize> {
    let mut size = 0;
    for opcode in Bc0Reader::new(data) {
        size += match opcode {
            Bc0Opcode::Literal(_) => 1,
            Bc0Opcode::Backreference { count, .. } => count,
        };
        if max_output_size != 0 && size > max_output_size {
            return Err(CompressionError::OutputLimitExceeded {
                limit: max_output_size,
            });
        }
    }
    Ok(size)
}

/// Write one line per opcode of a BC0 stream to `sink`
///
/// Returns the number of bytes the stream decompresses to.
pub fn bc0_disassemble<W: Write>(sink: &mut W, data: &[u8]) -> Result<usize> {
    let mut output_bytes = 0;
    for opcode in Bc0Reader::new(data) {
        match opcode {
            Bc0Opcode::Literal(v) => {
                writeln!(sink, "[{:X}] literal {:02X}", output_bytes, v)?;
                output_bytes += 1;
            }
            Bc0Opcode::Backreference { memo_offset, count } => {
                writeln!(
                    sink,
                    "[{:X}] backreference {:03X} {:02X}",
                    output_bytes, memo_offset, count
                )?;
                output_bytes += count;
            }
        }
    }
    Ok(output_bytes)
}
