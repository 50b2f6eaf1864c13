//! PRS decoding: opcode reader, decompressor, size computation, and
//! disassembler

use crate::bitstream::{ByteReader, ControlReader};
use crate::{CompressionError, Result};
use std::fmt;
use std::io::Write;
use tracing::trace;

/// Which encoding a backreference used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyKind {
    /// `00bb` + 1 offset byte
    Short,
    /// `01` + 2 bytes with a nonzero size field
    Long,
    /// `01` + 2 bytes with a zero size field + 1 size byte
    Extended,
}

impl fmt::Display for CopyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyKind::Short => write!(f, "short"),
            CopyKind::Long => write!(f, "long"),
            CopyKind::Extended => write!(f, "extended"),
        }
    }
}

/// One decoded PRS opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrsOpcode {
    Literal(u8),
    /// Copy `count` bytes starting `distance` bytes before the end of output
    Copy {
        kind: CopyKind,
        distance: usize,
        count: usize,
    },
    Stop,
}

/// An opcode and where it started in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrsStep {
    pub input_offset: usize,
    pub input_bit: usize,
    pub opcode: PrsOpcode,
}

/// Iterator over the opcodes of a PRS stream
///
/// Ends after a stop opcode, after the first error, or when input runs out
/// between opcodes. Running out of input inside an opcode yields
/// [`CompressionError::Truncated`].
pub struct PrsReader<'a> {
    input: ByteReader<'a>,
    control: ControlReader,
    done: bool,
}

impl<'a> PrsReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            input: ByteReader::new(data),
            control: ControlReader::new(),
            done: false,
        }
    }

    fn read_opcode(&mut self) -> Result<PrsOpcode> {
        // 1 = literal
        if self.control.read_bit(&mut self.input)? {
            return Ok(PrsOpcode::Literal(self.input.read_u8()?));
        }

        if self.control.read_bit(&mut self.input)? {
            // 01 = long copy. The 16-bit field is AAAAABBBCCCCCCCC (low byte
            // first), giving distance field CCCCCCCCAAAAA and size BBB.
            let a = self.input.read_u16_le()?;
            let field = (a >> 3) as usize;
            if field == 0 {
                return Ok(PrsOpcode::Stop);
            }
            let (kind, count) = match a & 7 {
                0 => (CopyKind::Extended, self.input.read_u8()? as usize + 1),
                size => (CopyKind::Long, size as usize + 2),
            };
            Ok(PrsOpcode::Copy {
                kind,
                distance: 0x2000 - field,
                count,
            })
        } else {
            // 00 = short copy. The size bits come from the control stream,
            // which may pull a control byte before the offset byte is read.
            let count = self.control.read_pair(&mut self.input)? as usize + 2;
            let distance = 0x100 - self.input.read_u8()? as usize;
            Ok(PrsOpcode::Copy {
                kind: CopyKind::Short,
                distance,
                count,
            })
        }
    }
}

impl Iterator for PrsReader<'_> {
    type Item = Result<PrsStep>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.input.is_empty() {
            return None;
        }

        let input_offset = self.input.position();
        let buffered = self.control.buffered_bits() as usize;
        let input_bit = 8 * input_offset + if buffered > 0 { 8 - buffered } else { 0 };

        let step = self.read_opcode().map(|opcode| PrsStep {
            input_offset,
            input_bit,
            opcode,
        });
        if matches!(step, Ok(PrsStep { opcode: PrsOpcode::Stop, .. }) | Err(_)) {
            self.done = true;
        }
        Some(step)
    }
}

/// Start of a backreference, which must lie before the current end of output
#[inline]
fn copy_source(output_len: usize, distance: usize) -> Result<usize> {
    output_len
        .checked_sub(distance)
        .ok_or(CompressionError::BackreferenceOutOfRange {
            distance,
            output_offset: output_len,
        })
}

#[inline]
fn check_limit(size: usize, max_output_size: usize) -> Result<()> {
    if max_output_size != 0 && size > max_output_size {
        return Err(CompressionError::OutputLimitExceeded {
            limit: max_output_size,
        });
    }
    Ok(())
}

/// Decompress a PRS stream
///
/// `max_output_size` of 0 means unbounded; otherwise decoding fails as soon as
/// the output would grow past it.
pub fn prs_decompress(data: &[u8], max_output_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);

    for step in PrsReader::new(data) {
        match step?.opcode {
            PrsOpcode::Literal(v) => {
                check_limit(out.len() + 1, max_output_size)?;
                out.push(v);
            }
            PrsOpcode::Copy {
                distance, count, ..
            } => {
                let source = copy_source(out.len(), distance)?;
                check_limit(out.len() + count, max_output_size)?;
                // Byte at a time: the range may run past the current end of
                // output, repeating what it has just written
                for z in 0..count {
                    let v = out[source + z];
                    out.push(v);
                }
            }
            PrsOpcode::Stop => break,
        }
    }

    trace!("PRS decompressed {} bytes into {} bytes", data.len(), out.len());
    Ok(out)
}

/// Compute the decompressed size of a PRS stream without producing it
pub fn prs_decompress_size(data: &[u8], max_output_size: usize) -> Result<usize> {
    let mut size = 0;

    for step in PrsReader::new(data) {
        match step?.opcode {
            PrsOpcode::Literal(_) => size += 1,
            PrsOpcode::Copy {
                distance, count, ..
            } => {
                copy_source(size, distance)?;
                size += count;
            }
            PrsOpcode::Stop => break,
        }
        check_limit(size, max_output_size)?;
    }

    Ok(size)
}

/// Write one line per opcode of a PRS stream to `sink`
///
/// Returns the number of bytes the stream decompresses to.
pub fn prs_disassemble<W: Write>(sink: &mut W, data: &[u8]) -> Result<usize> {
    let mut output_bytes = 0;

    for step in PrsReader::new(data) {
        let step = step?;
        let prefix = format!(
            "[{:X} / {:X} => {:X}]",
            step.input_offset, step.input_bit, output_bytes
        );
        match step.opcode {
            PrsOpcode::Literal(v) => {
                writeln!(sink, "{} literal {:02X}", prefix, v)?;
                output_bytes += 1;
            }
            PrsOpcode::Copy {
                kind,
                distance,
                count,
            } => {
                let source = copy_source(output_bytes, distance)?;
                writeln!(
                    sink,
                    "{} {} copy -{:X} (from {:X}) {:X}",
                    prefix, kind, distance, source, count
                )?;
                output_bytes += count;
            }
            PrsOpcode::Stop => {
                writeln!(sink, "{} end", prefix)?;
                break;
            }
        }
    }

    Ok(output_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompress_short_copy() {
        let data = [0x83, b'a', b'b', 0xFE, 0x00, 0x00];
        assert_eq!(prs_decompress(&data, 0).unwrap(), b"abab");
        assert_eq!(prs_decompress_size(&data, 0).unwrap(), 4);
    }

    #[test]
    fn test_decompress_extended_copy_repeats_pattern() {
        // literal 'x', extended copy -1 of 256 bytes, stop
        let data = [0x15, b'x', 0xF8, 0xFF, 0xFF, 0x00, 0x00];
        let out = prs_decompress(&data, 0).unwrap();
        assert_eq!(out, vec![b'x'; 257]);
    }

    #[test]
    fn test_decompress_long_copy() {
        // "abc", long copy -3 of size 6, stop: bits 1,1,1,0,1,0,1
        let data = [0x57, b'a', b'b', b'c', 0xEC, 0xFF, 0x00, 0x00];
        let out = prs_decompress(&data, 0).unwrap();
        assert_eq!(out, b"abcabcabc");
    }

    #[test]
    fn test_backreference_before_start_is_rejected() {
        // long copy -1 of size 3 with no output yet
        let data = [0x02, 0xF9, 0xFF];
        assert!(matches!(
            prs_decompress(&data, 0),
            Err(CompressionError::BackreferenceOutOfRange {
                distance: 1,
                output_offset: 0
            })
        ));
        assert!(prs_decompress_size(&data, 0).is_err());
        assert!(prs_disassemble(&mut Vec::<u8>::new(), &data).is_err());
    }

    #[test]
    fn test_truncated_literal_is_rejected() {
        assert!(matches!(
            prs_decompress(&[0x01], 0),
            Err(CompressionError::Truncated { offset: 1 })
        ));
    }

    #[test]
    fn test_truncated_long_copy_is_rejected() {
        assert!(matches!(
            prs_decompress(&[0x05, b'a', 0xF8], 0),
            Err(CompressionError::Truncated { .. })
        ));
        // extended copy missing its size byte
        assert!(prs_decompress_size(&[0x05, b'a', 0xF8, 0xFF], 0).is_err());
    }

    #[test]
    fn test_missing_stop_is_tolerated() {
        assert_eq!(prs_decompress(&[0x01, 0x41], 0).unwrap(), b"A");
        assert!(prs_decompress(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_output_limit() {
        let data = [0x15, b'x', 0xF8, 0xFF, 0xFF, 0x00, 0x00];
        assert!(matches!(
            prs_decompress(&data, 100),
            Err(CompressionError::OutputLimitExceeded { limit: 100 })
        ));
        assert!(matches!(
            prs_decompress_size(&data, 100),
            Err(CompressionError::OutputLimitExceeded { limit: 100 })
        ));
        assert_eq!(prs_decompress(&data, 257).unwrap().len(), 257);
        assert_eq!(prs_decompress_size(&data, 257).unwrap(), 257);
    }

    #[test]
    fn test_reader_steps() {
        let data = [0x83, b'a', b'b', 0xFE, 0x00, 0x00];
        let steps: Vec<PrsStep> = PrsReader::new(&data).map(|s| s.unwrap()).collect();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].opcode, PrsOpcode::Literal(b'a'));
        assert_eq!(steps[0].input_offset, 0);
        assert_eq!(
            steps[2].opcode,
            PrsOpcode::Copy {
                kind: CopyKind::Short,
                distance: 2,
                count: 2
            }
        );
        assert_eq!(steps[2].input_bit, 8 * 3 + 2);
        assert_eq!(steps[3].opcode, PrsOpcode::Stop);
    }

    #[test]
    fn test_disassemble_lines() {
        let data = [0x83, b'a', b'b', 0xFE, 0x00, 0x00];
        let mut sink = Vec::new();
        let size = prs_disassemble(&mut sink, &data).unwrap();
        assert_eq!(size, 4);
        let text = String::from_utf8(sink).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[0 / 0 => 0] literal 61");
        assert_eq!(lines[2], "[3 / 1A => 2] short copy -2 (from 0) 2");
        assert_eq!(lines[3], "[4 / 26 => 4] end");
    }
}
