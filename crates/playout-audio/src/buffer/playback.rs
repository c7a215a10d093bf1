//! Fixed-capacity byte buffer holding one render tick of audio.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::source::FrameSource;
use playout_core::Result;

/// One tick of interleaved PCM, reused for every tick of a session.
///
/// The capacity is fixed at construction and the buffer is never resized.
#[derive(Debug)]
pub struct PlaybackBuffer {
    data: Box<[u8]>,
    /// Bytes of real audio in the current chunk; the rest is silence.
    filled: usize,
}

impl PlaybackBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            filled: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes of the current chunk that came from the source.
    pub const fn filled(&self) -> usize {
        self.filled
    }

    /// Zero the whole buffer.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.filled = 0;
    }

    /// Load the next chunk from `source` into the start of the buffer.
    ///
    /// Returns the number of bytes read. A short read leaves the tail
    /// zeroed so the full capacity can still be written out; `Ok(0)` means
    /// the source is exhausted.
    pub fn load_from(&mut self, source: &mut dyn FrameSource) -> Result<usize> {
        let read = source.read_frames(&mut self.data)?;
        let read = read.min(self.data.len());
        self.data[read..].fill(0);
        self.filled = read;
        Ok(read)
    }

    /// The full-capacity chunk to hand to the sink.
    pub fn chunk(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReaderSource;
    use std::io::Cursor;

    #[test]
    fn test_new_is_zeroed() {
        let buffer = PlaybackBuffer::new(1764);
        assert_eq!(buffer.capacity(), 1764);
        assert!(buffer.chunk().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_full_load() {
        let mut source = ReaderSource::new(Cursor::new(vec![9u8; 8]));
        let mut buffer = PlaybackBuffer::new(4);

        assert_eq!(buffer.load_from(&mut source).unwrap(), 4);
        assert_eq!(buffer.chunk(), &[9, 9, 9, 9]);
        assert_eq!(buffer.filled(), 4);
    }

    #[test]
    fn test_short_load_zeroes_tail() {
        let mut source = ReaderSource::new(Cursor::new(vec![5u8; 6]));
        let mut buffer = PlaybackBuffer::new(4);

        assert_eq!(buffer.load_from(&mut source).unwrap(), 4);
        assert_eq!(buffer.load_from(&mut source).unwrap(), 2);
        assert_eq!(buffer.chunk(), &[5, 5, 0, 0]);
        assert_eq!(buffer.capacity(), 4);

        assert_eq!(buffer.load_from(&mut source).unwrap(), 0);
    }

    #[test]
    fn test_clear() {
        let mut source = ReaderSource::new(Cursor::new(vec![1u8; 4]));
        let mut buffer = PlaybackBuffer::new(4);
        buffer.load_from(&mut source).unwrap();

        buffer.clear();
        assert_eq!(buffer.filled(), 0);
        assert_eq!(buffer.chunk(), &[0, 0, 0, 0]);
    }
}
