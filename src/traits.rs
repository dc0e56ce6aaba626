//! Declaration of traits reused across the code.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// Implementation of the LayoutDisplay trait.
/// It is used to display the layout of a given structure such as a disk or partition.
pub trait LayoutDisplay {
    fn display_layout(&self, indent: u8) -> Result<String, fmt::Error>;
}

/// A source of bytes addressed by absolute offset.
///
/// Implementations never keep a notion of "current position" visible to the
/// caller: every read names its own offset. A read that runs past the end of
/// the source returns the bytes that exist, so the returned buffer may be
/// shorter than `length`. Callers decide whether that is an error.
pub trait ByteSource {
    fn read_at(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>>;
}

/// Any seekable reader (an open image file, an in-memory cursor, ...) is a byte source.
impl<T: Read + Seek> ByteSource for T {
    fn read_at(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        self.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::with_capacity(length);
        self.by_ref().take(length as u64).read_to_end(&mut buf)?;

        Ok(buf)
    }
}
