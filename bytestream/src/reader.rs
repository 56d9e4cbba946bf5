//! Byte-level reader with bounded operations.

use crate::error::{ByteError, ByteResult};

/// A big-endian reader over a borrowed byte slice.
///
/// All read operations are bounds-checked and return errors on failure.
/// The reader never panics on malformed input.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` from a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of bytes remaining to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bytes to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the current byte position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the unread tail without consuming it.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> ByteResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> ByteResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i16`.
    pub fn read_i16(&mut self) -> ByteResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> ByteResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> ByteResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i64`.
    pub fn read_i64(&mut self) -> ByteResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian IEEE-754 `f32`.
    pub fn read_f32(&mut self) -> ByteResult<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian IEEE-754 `f64`.
    pub fn read_f64(&mut self) -> ByteResult<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Reads `len` bytes as a borrowed slice.
    pub fn read_bytes(&mut self, len: usize) -> ByteResult<&'a [u8]> {
        self.ensure(len)?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Skips `len` bytes.
    pub fn skip(&mut self, len: usize) -> ByteResult<()> {
        self.ensure(len)?;
        self.pos += len;
        Ok(())
    }

    fn ensure(&self, len: usize) -> ByteResult<()> {
        let available = self.remaining();
        if len > available {
            return Err(ByteError::UnexpectedEof {
                requested: len,
                available,
            });
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> ByteResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reader() {
        let reader = ByteReader::new(&[]);
        assert!(reader.is_empty());
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn read_from_empty_fails() {
        let mut reader = ByteReader::new(&[]);
        let result = reader.read_u8();
        assert!(matches!(
            result,
            Err(ByteError::UnexpectedEof {
                requested: 1,
                available: 0
            })
        ));
    }

    #[test]
    fn reads_are_big_endian() {
        let mut reader = ByteReader::new(&[0x12, 0x34, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert!(reader.is_empty());
    }

    #[test]
    fn read_signed() {
        let mut reader = ByteReader::new(&[0xFF, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_i32().unwrap(), -1);
    }

    #[test]
    fn read_floats() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_be_bytes());
        bytes.extend_from_slice(&(-2.25f64).to_be_bytes());
        let mut reader = ByteReader::new(&bytes);
        assert!((reader.read_f32().unwrap() - 1.5).abs() < f32::EPSILON);
        assert!((reader.read_f64().unwrap() + 2.25).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_read_does_not_advance() {
        let mut reader = ByteReader::new(&[0x01, 0x02, 0x03]);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            ByteError::UnexpectedEof {
                requested: 4,
                available: 3
            }
        );
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
    }

    #[test]
    fn read_bytes_and_rest() {
        let mut reader = ByteReader::new(b"abcdef");
        assert_eq!(reader.read_bytes(2).unwrap(), b"ab");
        reader.skip(1).unwrap();
        assert_eq!(reader.rest(), b"def");
        assert!(reader.read_bytes(4).is_err());
        assert_eq!(reader.read_bytes(3).unwrap(), b"def");
        assert!(reader.rest().is_empty());
    }
}
