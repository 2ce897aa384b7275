//! Bounds-checked reading of primitive fields from received buffers
//!
//! All multi-byte values on both wire protocols are little-endian. Strings are
//! zero-terminated and decoded lossily, since player names may carry arbitrary bytes.

use crate::WireError;
use bytes::Buf;

/// Reads a zero-terminated string starting at `offset`
///
/// Returns the decoded string and the offset just past the terminator, or `None`
/// when `offset` is outside the buffer or no terminator follows it.
pub fn read_cstring(buffer: &[u8], offset: usize) -> Option<(String, usize)> {
    let rest = buffer.get(offset..)?;
    if rest.is_empty() {
        return None;
    }
    let end = rest.iter().position(|&b| b == 0)?;
    let value = String::from_utf8_lossy(&rest[..end]).into_owned();
    Some((value, offset + end + 1))
}

/// Forward-only cursor over a byte slice
///
/// Every read either returns a value and advances, or returns a [`WireError`]
/// and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Creates a reader positioned at `offset`
    pub fn at(buf: &'a [u8], offset: usize) -> Result<Self, WireError> {
        if offset > buf.len() {
            return Err(WireError::OutOfBounds {
                offset,
                len: buf.len(),
            });
        }
        Ok(Self { buf, pos: offset })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), WireError> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?.get_u8())
    }

    pub fn read_u32_le(&mut self) -> Result<u32, WireError> {
        Ok(self.take(4)?.get_u32_le())
    }

    pub fn read_i32_le(&mut self) -> Result<i32, WireError> {
        Ok(self.take(4)?.get_i32_le())
    }

    pub fn read_f32_le(&mut self) -> Result<f32, WireError> {
        Ok(self.take(4)?.get_f32_le())
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        self.take_array()
    }

    /// Reads a zero-terminated string and moves past its terminator
    pub fn read_cstring(&mut self) -> Result<String, WireError> {
        if self.pos >= self.buf.len() {
            return Err(WireError::OutOfBounds {
                offset: self.pos,
                len: self.buf.len(),
            });
        }
        let (value, next) = read_cstring(self.buf, self.pos)
            .ok_or(WireError::MissingTerminator { offset: self.pos })?;
        self.pos = next;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_read_cstring_basic() {
        let buf = b"map\0de_dust\0";
        assert_eq!(read_cstring(buf, 0), Some(("map".to_string(), 4)));
        assert_eq!(read_cstring(buf, 4), Some(("de_dust".to_string(), 12)));
    }

    #[test]
    fn test_read_cstring_empty_string() {
        let buf = [0u8, b'a', 0];
        assert_eq!(read_cstring(&buf, 0), Some((String::new(), 1)));
    }

    #[test]
    fn test_read_cstring_out_of_bounds() {
        let buf = b"abc\0";
        assert_eq!(read_cstring(buf, 4), None);
        assert_eq!(read_cstring(buf, 100), None);
        assert_eq!(read_cstring(&[], 0), None);
    }

    #[test]
    fn test_read_cstring_missing_terminator() {
        assert_eq!(read_cstring(b"no terminator", 0), None);
        assert_eq!(read_cstring(b"ok\0tail", 3), None);
    }

    #[test]
    fn test_read_cstring_invalid_utf8_is_lossy() {
        let buf = [0xFFu8, b'x', 0];
        let (s, next) = read_cstring(&buf, 0).unwrap();
        assert_eq!(next, 3);
        assert!(s.ends_with('x'));
    }

    #[test]
    fn test_reader_integers() {
        let mut buf = Vec::new();
        buf.push(7u8);
        buf.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        buf.extend_from_slice(&(-5i32).to_le_bytes());
        buf.extend_from_slice(&12.5f32.to_le_bytes());

        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_i32_le().unwrap(), -5);
        assert_approx_eq!(reader.read_f32_le().unwrap(), 12.5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_truncated_read_keeps_position() {
        let buf = [1u8, 2, 3];
        let mut reader = ByteReader::new(&buf);
        reader.skip(1).unwrap();

        let err = reader.read_u32_le().unwrap_err();
        assert_eq!(
            err,
            WireError::Truncated {
                offset: 1,
                needed: 4,
                available: 2
            }
        );
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_reader_cstring_errors() {
        let buf = b"abc";
        let mut reader = ByteReader::new(buf);
        assert_eq!(
            reader.read_cstring(),
            Err(WireError::MissingTerminator { offset: 0 })
        );

        let mut at_end = ByteReader::at(buf, 3).unwrap();
        assert_eq!(
            at_end.read_cstring(),
            Err(WireError::OutOfBounds { offset: 3, len: 3 })
        );
    }

    #[test]
    fn test_reader_at_rejects_offset_past_end() {
        assert!(ByteReader::at(&[0u8; 4], 4).is_ok());
        assert_eq!(
            ByteReader::at(&[0u8; 4], 5).unwrap_err(),
            WireError::OutOfBounds { offset: 5, len: 4 }
        );
    }
}
