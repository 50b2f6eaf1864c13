//! PRS compressor
//!
//! Input is pushed in with [`PrsCompressor::add`] and encoded greedily as soon
//! as enough lookahead has accumulated. [`PrsCompressor::close`] drains the
//! remaining input and terminates the stream.

use super::{LONG_COPY_MAX_DISTANCE, MAX_COPY, SHORT_COPY_MAX_DISTANCE, SHORT_COPY_MAX_SIZE};
use crate::bitstream::ControlWriter;
use crate::window::ByteWindow;
use crate::{CompressionError, ProgressFn, Result};
use tracing::debug;

/// Default literal-prefix search depth
pub const DEFAULT_LEVEL: usize = 1;

/// Progress is reported each time this many input bytes are committed
const PROGRESS_INTERVAL_MASK: usize = 0xFFF;

#[derive(Debug, Default, Clone, Copy)]
struct Match {
    /// Absolute offset the copy starts from
    offset: usize,
    size: usize,
    /// Literals written before the copy
    literals: usize,
}

/// Streaming PRS compressor
pub struct PrsCompressor<'a> {
    level: usize,
    progress: Option<ProgressFn<'a>>,
    window: ByteWindow,
    writer: ControlWriter,
    output: Option<Vec<u8>>,
}

impl<'a> PrsCompressor<'a> {
    /// Create a compressor
    ///
    /// `level` is how many literal-prefix lengths are tried before each match
    /// (0 or 1 means plain greedy matching). Higher levels find denser
    /// encodings at a proportional cost in time.
    pub fn new(level: usize) -> Self {
        Self {
            level,
            progress: None,
            window: ByteWindow::new(),
            writer: ControlWriter::new(),
            output: None,
        }
    }

    /// Create a compressor that reports `(input bytes committed, output bytes)`
    /// every 4096 committed input bytes
    pub fn with_progress(level: usize, progress: ProgressFn<'a>) -> Self {
        Self {
            progress: Some(progress),
            ..Self::new(level)
        }
    }

    /// Total number of input bytes received
    pub fn input_size(&self) -> usize {
        self.window.end()
    }

    pub fn is_closed(&self) -> bool {
        self.output.is_some()
    }

    /// Feed more input
    pub fn add(&mut self, data: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(CompressionError::Closed);
        }
        let capacity = MAX_COPY + self.level;
        for &v in data {
            if self.window.forward_len() >= capacity {
                self.advance()?;
            }
            self.window.push(v);
        }
        Ok(())
    }

    /// Encode all remaining input, write the stop opcode, and return the
    /// compressed stream
    ///
    /// Closing twice returns the same buffer.
    pub fn close(&mut self) -> Result<&[u8]> {
        if self.output.is_none() {
            while self.window.forward_len() > 0 {
                self.advance()?;
            }
            self.writer.write_bit(false);
            self.writer.write_bit(true);
            self.writer.put_u16_le(0);

            let output = std::mem::take(&mut self.writer).finish()?;
            debug!(
                "PRS compressed {} bytes into {} bytes (level {})",
                self.window.end(),
                output.len(),
                self.level
            );
            self.output = Some(output);
        }
        Ok(self.output.as_deref().unwrap_or_default())
    }

    /// Close the compressor and take ownership of the output
    pub fn into_output(mut self) -> Result<Vec<u8>> {
        self.close()?;
        Ok(self.output.take().unwrap_or_default())
    }

    fn advance(&mut self) -> Result<()> {
        let best = self.find_best_match();

        for _ in 0..best.literals {
            self.write_literal();
        }

        // Shortest usable encoding for the match:
        // - short copy if offset in [-0x100, -1] and size in [2, 5]
        // - long copy if offset in [-0x1FFF, -1] and size in [3, 9]
        // - extended copy if offset in [-0x1FFF, -1] and size in [10, 0x100]
        // A size-2 match out of short range costs more as a copy than as
        // literals.
        let offset = best.offset as isize - self.window.boundary() as isize;
        let size = best.size;
        if size < 2 {
            self.write_literal();
        } else if offset >= -SHORT_COPY_MAX_DISTANCE && size <= SHORT_COPY_MAX_SIZE {
            self.write_short_copy(offset, size);
        } else if size < 3 {
            self.write_literal();
        } else if offset >= -LONG_COPY_MAX_DISTANCE && size <= 9 {
            self.write_long_copy(offset, size);
        } else if offset >= -LONG_COPY_MAX_DISTANCE && size <= MAX_COPY {
            self.write_extended_copy(offset, size);
        } else {
            return Err(CompressionError::InvalidMatch { offset, size });
        }
        Ok(())
    }

    /// Search the history for the best copy, optionally preceded by up to
    /// `level - 1` literals
    ///
    /// Literal prefixes are evaluated by committing them to the window
    /// speculatively; the window is restored before returning.
    fn find_best_match(&mut self) -> Match {
        let mut best = Match::default();
        let max_literals = self.level.min(self.window.forward_len());

        for literals in 0..max_literals {
            if literals > 0 {
                self.window.commit();
            }

            let target = self.window.boundary();
            let first = self.window.at(target);
            for source in self.window.candidates(first, target) {
                if best.size >= MAX_COPY {
                    break;
                }
                let size = self.window.match_length(source, target, MAX_COPY);
                // Later candidates win ties: a nearer copy is more likely
                // to fit the short encoding
                if size >= best.size + best.literals {
                    best = Match {
                        offset: source,
                        size,
                        literals,
                    };
                }
            }
        }

        for _ in 1..max_literals {
            self.window.uncommit();
        }
        best
    }

    fn write_literal(&mut self) {
        self.writer.write_bit(true);
        let v = self.window.at(self.window.boundary());
        self.writer.put_u8(v);
        self.commit(1);
    }

    fn write_short_copy(&mut self, offset: isize, size: usize) {
        let encoded_size = (size - 2) as u8;
        self.writer.write_bit(false);
        self.writer.write_bit(false);
        self.writer.write_bit(encoded_size & 2 != 0);
        self.writer.write_bit(encoded_size & 1 != 0);
        self.writer.put_u8(offset as u8);
        self.commit(size);
    }

    fn write_long_copy(&mut self, offset: isize, size: usize) {
        self.writer.write_bit(false);
        self.writer.write_bit(true);
        self.writer.put_u16_le(((offset << 3) as u16) | (size - 2) as u16);
        self.commit(size);
    }

    fn write_extended_copy(&mut self, offset: isize, size: usize) {
        self.writer.write_bit(false);
        self.writer.write_bit(true);
        self.writer.put_u16_le((offset << 3) as u16);
        self.writer.put_u8((size - 1) as u8);
        self.commit(size);
    }

    /// Move encoded bytes from the forward region into the history
    fn commit(&mut self, size: usize) {
        for _ in 0..size {
            self.window.commit();
            self.window.retire();
            let committed = self.window.boundary();
            if committed & PROGRESS_INTERVAL_MASK == 0 {
                if let Some(progress) = self.progress.as_mut() {
                    progress(committed, self.writer.len());
                }
            }
        }
    }
}

/// Compress a whole buffer with PRS
pub fn prs_compress(
    data: &[u8],
    level: usize,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<u8>> {
    let mut prs = match progress {
        Some(progress) => PrsCompressor::with_progress(level, progress),
        None => PrsCompressor::new(level),
    };
    prs.add(data)?;
    prs.into_output()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_only_stop() {
        let out = prs_compress(&[], 1, None).unwrap();
        assert_eq!(out, vec![0x02, 0x00, 0x00]);
    }

    #[test]
    fn test_single_literal() {
        let out = prs_compress(b"A", 1, None).unwrap();
        assert_eq!(out, vec![0x05, 0x41, 0x00, 0x00]);
    }

    #[test]
    fn test_short_copy_encoding() {
        let out = prs_compress(b"abab", 1, None).unwrap();
        // literal, literal, short copy (size 2, offset -2), stop
        assert_eq!(out, vec![0x83, b'a', b'b', 0xFE, 0x00, 0x00]);
    }

    #[test]
    fn test_run_uses_extended_copies() {
        let data = vec![b'x'; 300];
        let out = prs_compress(&data, 1, None).unwrap();
        assert_eq!(
            out,
            vec![0x55, b'x', 0xF8, 0xFF, 0xFF, 0xF8, 0xFF, 0x2A, 0x00, 0x00]
        );
    }

    #[test]
    fn test_zeros_compress_well() {
        let data = vec![0u8; 4096];
        let out = prs_compress(&data, 1, None).unwrap();
        assert!(out.len() < data.len() / 20, "got {} bytes", out.len());
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i * i % 251) as u8).collect();
        let expected = prs_compress(&data, 3, None).unwrap();

        let mut prs = PrsCompressor::new(3);
        for chunk in data.chunks(77) {
            prs.add(chunk).unwrap();
        }
        assert_eq!(prs.input_size(), data.len());
        assert_eq!(prs.close().unwrap(), &expected[..]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut prs = PrsCompressor::new(2);
        prs.add(b"hello hello hello").unwrap();
        let first = prs.close().unwrap().to_vec();
        let second = prs.close().unwrap().to_vec();
        assert_eq!(first, second);
        assert!(prs.is_closed());
    }

    #[test]
    fn test_add_after_close_fails() {
        let mut prs = PrsCompressor::new(1);
        prs.add(b"data").unwrap();
        prs.close().unwrap();
        assert!(matches!(prs.add(b"more"), Err(CompressionError::Closed)));
    }

    #[test]
    fn test_progress_reported_every_4096_bytes() {
        let data: Vec<u8> = (0..8192u32).map(|i| (i % 13) as u8).collect();
        let mut calls = Vec::new();
        let mut record = |input: usize, output: usize| calls.push((input, output));
        prs_compress(&data, 1, Some(&mut record)).unwrap();
        let inputs: Vec<usize> = calls.iter().map(|&(input, _)| input).collect();
        assert_eq!(inputs, vec![4096, 8192]);
        assert!(calls.iter().all(|&(_, output)| output > 0));
    }

    #[test]
    fn test_level_zero_writes_only_literals() {
        let out = prs_compress(b"aaaa", 0, None).unwrap();
        // four literals and a stop: 1,1,1,1,0,1
        assert_eq!(out, vec![0x2F, b'a', b'a', b'a', b'a', 0x00, 0x00]);
    }
}
