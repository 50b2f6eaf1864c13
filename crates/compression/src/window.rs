//! Sliding byte window for the PRS compressor
//!
//! The window holds one logical byte stream split at a boundary: bytes before
//! the boundary have been committed to the compressed output (the history a
//! backreference may copy from), bytes after it are input not yet encoded.
//! Only committed bytes are indexed, so a match can never start in input the
//! decoder has not produced yet.

use std::collections::VecDeque;

/// Furthest a PRS backreference can reach, plus one
pub const HISTORY_SIZE: usize = 0x2000;

#[derive(Debug)]
pub struct ByteWindow {
    /// Bytes from `base` up to the end of input received so far
    bytes: VecDeque<u8>,
    /// Absolute offset of `bytes[0]`
    base: usize,
    /// End of the committed region
    boundary: usize,
    /// Committed offsets per byte value, ascending
    index: Vec<VecDeque<usize>>,
}

impl ByteWindow {
    pub fn new() -> Self {
        Self {
            bytes: VecDeque::new(),
            base: 0,
            boundary: 0,
            index: vec![VecDeque::new(); 256],
        }
    }

    /// Appends a byte to the uncommitted region
    pub fn push(&mut self, v: u8) {
        self.bytes.push_back(v);
    }

    /// Byte at an absolute offset still held by the window
    #[inline]
    pub fn at(&self, offset: usize) -> u8 {
        self.bytes[offset - self.base]
    }

    /// Absolute offset one past the last byte received
    #[inline]
    pub fn end(&self) -> usize {
        self.base + self.bytes.len()
    }

    #[inline]
    pub fn boundary(&self) -> usize {
        self.boundary
    }

    /// Number of received bytes not yet committed
    #[inline]
    pub fn forward_len(&self) -> usize {
        self.end() - self.boundary
    }

    /// Moves one byte across the boundary and indexes it
    pub fn commit(&mut self) {
        debug_assert!(self.boundary < self.end(), "commit past end of input");
        let offset = self.boundary;
        let v = self.at(offset) as usize;
        self.index[v].push_back(offset);
        self.boundary += 1;
    }

    /// Undoes the most recent [`commit`](Self::commit)
    pub fn uncommit(&mut self) {
        self.boundary -= 1;
        let offset = self.boundary;
        let v = self.at(offset) as usize;
        let removed = self.index[v].pop_back();
        debug_assert_eq!(removed, Some(offset));
    }

    /// Drops history and index entries that no backreference can reach from
    /// the current boundary
    pub fn retire(&mut self) {
        let horizon = self.boundary.saturating_sub(HISTORY_SIZE);
        while self.base < horizon {
            self.bytes.pop_front();
            self.base += 1;
        }
        if self.boundary > 0 {
            let last = self.at(self.boundary - 1) as usize;
            let offsets = &mut self.index[last];
            while offsets.front().is_some_and(|&o| o < horizon) {
                offsets.pop_front();
            }
        }
    }

    /// Committed offsets holding `v` that are still reachable from `target`,
    /// oldest first
    pub fn candidates(&self, v: u8, target: usize) -> impl Iterator<Item = usize> + '_ {
        self.index[v as usize]
            .iter()
            .copied()
            .skip_while(move |&o| o + HISTORY_SIZE <= target)
    }

    /// Length of the match between the history starting at `source` and the
    /// input starting at `target`
    ///
    /// The history region `source..target` is repeated as often as needed, so
    /// a short region can cover a long run the same way the decoder's
    /// byte-at-a-time copy reproduces it.
    pub fn match_length(&self, source: usize, target: usize, limit: usize) -> usize {
        let loop_bytes = target - source;
        let end = self.end();
        let mut size = 0;
        while size < limit
            && target + size < end
            && self.at(source + size % loop_bytes) == self.at(target + size)
        {
            size += 1;
        }
        size
    }
}

impl Default for ByteWindow {
    fn default() -> Self {
        Self::new()
    }
}
