//! Little-endian field extraction and bounded reads shared by the decoders.

use std::io;

use crate::traits::ByteSource;

/// A read returned fewer bytes than the structure being decoded requires.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("truncated input{}: expected {expected} bytes, found {found}", at_offset(.offset))]
pub struct Truncated {
    /// Byte offset of the read in the source, `None` when a caller-supplied
    /// buffer was too short.
    pub offset: Option<u64>,
    pub expected: usize,
    pub found: usize,
}

fn at_offset(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!(" at byte offset {offset}"),
        None => String::new(),
    }
}

/// Reads exactly `length` bytes at `offset` from a byte source.
///
/// # Errors
///
/// - The source's `io::Error` if the read itself fails.
/// - [`Truncated`] if the source holds fewer than `length` bytes from `offset`.
pub fn read_exact_at<S, E>(source: &mut S, offset: u64, length: usize) -> Result<Vec<u8>, E>
where
    S: ByteSource + ?Sized,
    E: From<io::Error> + From<Truncated>,
{
    let buf = source.read_at(offset, length)?;

    if buf.len() < length {
        return Err(Truncated {
            offset: Some(offset),
            expected: length,
            found: buf.len(),
        }
        .into());
    }

    Ok(buf)
}

/// Checks that `buffer` holds at least `length` bytes.
///
/// The buffer's position in the source is unknown here, so the error carries
/// no offset.
pub fn ensure_len(buffer: &[u8], length: usize) -> Result<(), Truncated> {
    if buffer.len() < length {
        return Err(Truncated {
            offset: None,
            expected: length,
            found: buffer.len(),
        });
    }
    Ok(())
}

/// Extracts a 32-bit unsigned integer from a buffer at a given offset.
///
/// # Panics
///
/// Panics if the slice does not contain enough bytes starting from the offset.
pub fn u32_at(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

/// Extracts a 8-bit unsigned integer from a buffer at a given offset.
pub fn u8_at(buffer: &[u8], offset: usize) -> u8 {
    buffer[offset]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Debug)]
    enum TestError {
        Io,
        Truncated(Truncated),
    }

    impl From<io::Error> for TestError {
        fn from(_: io::Error) -> Self {
            TestError::Io
        }
    }

    impl From<Truncated> for TestError {
        fn from(t: Truncated) -> Self {
            TestError::Truncated(t)
        }
    }

    #[test]
    fn little_endian_fields() {
        let buf = [0x78, 0x56, 0x34, 0x12, 0xFF];
        assert_eq!(u32_at(&buf, 0), 0x1234_5678);
        assert_eq!(u8_at(&buf, 4), 0xFF);
    }

    #[test]
    fn read_exact_at_reports_short_reads() {
        let mut src = Cursor::new(vec![0u8; 600]);

        let ok: Result<Vec<u8>, TestError> = read_exact_at(&mut src, 0, 512);
        assert_eq!(ok.unwrap().len(), 512);

        let short: Result<Vec<u8>, TestError> = read_exact_at(&mut src, 512, 512);
        match short {
            Err(TestError::Truncated(t)) => {
                assert_eq!(t.offset, Some(512));
                assert_eq!(t.expected, 512);
                assert_eq!(t.found, 88);
                assert_eq!(
                    t.to_string(),
                    "truncated input at byte offset 512: expected 512 bytes, found 88"
                );
            }
            other => panic!("expected a truncated read, got {other:?}"),
        }
    }

    #[test]
    fn short_buffer_has_no_offset() {
        let err = ensure_len(&[0u8; 31], 32).unwrap_err();

        assert_eq!(err.offset, None);
        assert_eq!(err.to_string(), "truncated input: expected 32 bytes, found 31");
        assert!(ensure_len(&[0u8; 32], 32).is_ok());
    }
}
