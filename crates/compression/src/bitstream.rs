//! Interleaved control/data bitstreams
//!
//! Both codecs interleave a bit-packed control stream with the data bytes the
//! control bits announce, so a decoder never has to seek backward. Control bits
//! are packed LSB first.
//!
//! - PRS reserves a control byte, keeps writing data bytes after it, and
//!   backpatches the reserved byte once eight bits are known ([`ControlWriter`]).
//! - BC0 buffers one group of eight opcodes and emits the control byte followed
//!   by the group's data bytes ([`GroupWriter`]).

use crate::{CompressionError, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Marker bit: set while the low byte of a control word still holds unread
/// (or unwritten) bits.
const MARKER: u16 = 0x0100;

/// Byte reader over a compressed buffer that reports truncation with the
/// offset at which input ran out
pub struct ByteReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            len: data.len(),
        }
    }

    /// Current offset in the input
    #[inline]
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        if !self.buf.has_remaining() {
            return Err(CompressionError::Truncated {
                offset: self.position(),
            });
        }
        Ok(self.buf.get_u8())
    }

    #[inline]
    pub fn read_u16_le(&mut self) -> Result<u16> {
        if self.buf.remaining() < 2 {
            return Err(CompressionError::Truncated {
                offset: self.position(),
            });
        }
        Ok(self.buf.get_u16_le())
    }
}

/// PRS control stream reader
///
/// The low byte holds control bits; the high byte holds one marker bit per
/// valid low bit. A new control byte is pulled from the input once the last
/// marker has been shifted out.
#[derive(Debug, Default)]
pub struct ControlReader {
    bits: u16,
}

impl ControlReader {
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn read_bit(&mut self, input: &mut ByteReader<'_>) -> Result<bool> {
        if self.bits & MARKER == 0 {
            self.bits = 0xFF00 | input.read_u8()? as u16;
        }
        let bit = self.bits & 1 != 0;
        self.bits >>= 1;
        Ok(bit)
    }

    /// Reads two bits, first one as the high bit
    pub fn read_pair(&mut self, input: &mut ByteReader<'_>) -> Result<u8> {
        let high = self.read_bit(input)? as u8;
        let low = self.read_bit(input)? as u8;
        Ok((high << 1) | low)
    }

    /// Number of control bits left in the current control byte
    pub fn buffered_bits(&self) -> u8 {
        let mut z = self.bits;
        let mut count = 0;
        while z & MARKER != 0 {
            z >>= 1;
            count += 1;
        }
        count
    }
}

/// PRS control stream writer with backpatched control bytes
#[derive(Debug)]
pub struct ControlWriter {
    out: BytesMut,
    control_offset: usize,
    pending: u16,
}

impl ControlWriter {
    pub fn new() -> Self {
        let mut out = BytesMut::new();
        out.put_u8(0);
        Self {
            out,
            control_offset: 0,
            pending: 0,
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        let marked = if bit { 0x8080 } else { 0x8000 };
        if self.pending & MARKER != 0 {
            self.out[self.control_offset] = self.pending as u8;
            self.control_offset = self.out.len();
            self.out.put_u8(0);
            self.pending = marked;
        } else {
            self.pending = (self.pending >> 1) | marked;
        }
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.out.put_u8(v);
    }

    #[inline]
    pub fn put_u16_le(&mut self, v: u16) {
        self.out.put_u16_le(v);
    }

    /// Bytes written so far, including the reserved control byte
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Backpatches the last partial control byte, or drops the reserved byte
    /// if no bits were ever written into it
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.pending & 0xFF00 != 0 {
            while self.pending & MARKER == 0 {
                self.pending >>= 1;
            }
            self.out[self.control_offset] = self.pending as u8;
        } else {
            if self.control_offset + 1 != self.out.len() {
                return Err(CompressionError::UncontrolledData);
            }
            self.out.truncate(self.control_offset);
        }
        Ok(self.out.to_vec())
    }
}

impl Default for ControlWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// BC0 writer: eight control bits per group, each group followed by its data
#[derive(Debug, Default)]
pub struct GroupWriter {
    out: BytesMut,
    group: BytesMut,
    control: u8,
    count: u8,
}

impl GroupWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_control(&mut self, bit: bool) {
        debug_assert!(self.count < 8, "control group already full");
        if bit {
            self.control |= 1 << self.count;
        }
        self.count += 1;
    }

    #[inline]
    pub fn write_data(&mut self, v: u8) {
        self.group.put_u8(v);
    }

    /// Emits the current group once all eight control bits are used
    pub fn flush_if_ready(&mut self) {
        if self.count == 8 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.out.put_u8(self.control);
        self.out.put_slice(&self.group);
        self.group.clear();
        self.control = 0;
        self.count = 0;
    }

    /// Output size so far, counting the pending control byte
    pub fn len(&self) -> usize {
        self.out.len() + 1 + self.group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty() && self.count == 0
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.count > 0 || !self.group.is_empty() {
            self.flush();
        }
        self.out.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_writer_backpatches_lsb_first() {
        let mut w = ControlWriter::new();
        for bit in [true, false, true, true, false, false, false, true] {
            w.write_bit(bit);
        }
        w.put_u8(0xAA);
        // The ninth bit reserves a new control byte after the data
        w.write_bit(true);
        let out = w.finish().unwrap();
        assert_eq!(out, vec![0b1000_1101, 0xAA, 0x01]);
    }

    #[test]
    fn test_control_writer_pads_partial_byte() {
        let mut w = ControlWriter::new();
        w.write_bit(false);
        w.write_bit(true);
        w.put_u16_le(0);
        assert_eq!(w.finish().unwrap(), vec![0x02, 0x00, 0x00]);
    }

    #[test]
    fn test_control_writer_without_bits() {
        assert!(ControlWriter::new().finish().unwrap().is_empty());

        let mut w = ControlWriter::new();
        w.put_u8(1);
        assert!(matches!(w.finish(), Err(CompressionError::UncontrolledData)));
    }

    #[test]
    fn test_control_reader_refills_every_eight_bits() {
        let data = [0b0000_0101u8, 0xFF];
        let mut r = ByteReader::new(&data);
        let mut cr = ControlReader::new();
        assert_eq!(cr.buffered_bits(), 0);
        assert!(cr.read_bit(&mut r).unwrap());
        assert_eq!(cr.buffered_bits(), 7);
        assert!(!cr.read_bit(&mut r).unwrap());
        assert!(cr.read_bit(&mut r).unwrap());
        for _ in 3..8 {
            assert!(!cr.read_bit(&mut r).unwrap());
        }
        assert_eq!(r.position(), 1);
        assert!(cr.read_bit(&mut r).unwrap());
        assert_eq!(r.position(), 2);
        assert!(cr.read_pair(&mut r).is_ok());
    }

    #[test]
    fn test_byte_reader_truncation_offset() {
        let data = [1u8];
        let mut r = ByteReader::new(&data);
        assert!(matches!(
            r.read_u16_le(),
            Err(CompressionError::Truncated { offset: 0 })
        ));
        assert_eq!(r.read_u8().unwrap(), 1);
        assert!(matches!(
            r.read_u8(),
            Err(CompressionError::Truncated { offset: 1 })
        ));
    }

    #[test]
    fn test_group_writer_interleaves_groups() {
        let mut w = GroupWriter::new();
        for i in 0..8 {
            w.write_control(true);
            w.write_data(i);
            w.flush_if_ready();
        }
        w.write_control(false);
        w.write_data(0x10);
        w.write_data(0x20);
        w.flush_if_ready();
        let out = w.finish();
        assert_eq!(
            out,
            vec![0xFF, 0, 1, 2, 3, 4, 5, 6, 7, 0x00, 0x10, 0x20]
        );
    }

    #[test]
    fn test_group_writer_empty() {
        let w = GroupWriter::new();
        assert!(w.is_empty());
        assert!(w.finish().is_empty());
    }
}
