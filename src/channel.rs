//! Random-access byte channel abstraction

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};

/// A seekable, readable, writable byte sequence with a known total length.
///
/// The core operates on this trait instead of `std::fs::File` directly so
/// that detection and repair can be exercised against in-memory buffers.
/// A channel is exclusively owned by one in-flight operation; no sharing
/// across concurrent operations.
pub trait ByteChannel: Read + Write + Seek {
    /// Total length of the channel in bytes.
    fn byte_len(&mut self) -> io::Result<u64>;

    /// Resize the channel to exactly `len` bytes, truncating or
    /// zero-extending as needed. The cursor position is left unchanged.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl ByteChannel for File {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl ByteChannel for Cursor<Vec<u8>> {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}
