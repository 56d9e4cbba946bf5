//! Byte-level writer for building big-endian fixtures.

use crate::error::{ByteError, ByteResult};

/// A growable big-endian byte writer.
///
/// Writes are accumulated in an internal buffer. Call [`finish`](Self::finish)
/// to get the final byte buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    /// Creates a new empty `ByteWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `ByteWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
        }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Writes a `u16` length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::LengthOverflow`] if `len` exceeds `u16::MAX`.
    pub fn write_len_u16(&mut self, len: usize) -> ByteResult<()> {
        let value = u16::try_from(len).map_err(|_| ByteError::LengthOverflow {
            length: len,
            max: u16::MAX as usize,
        })?;
        self.write_u16(value);
        Ok(())
    }

    /// Writes a `u32` length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::LengthOverflow`] if `len` exceeds `u32::MAX`.
    pub fn write_len_u32(&mut self, len: usize) -> ByteResult<()> {
        let value = u32::try_from(len).map_err(|_| ByteError::LengthOverflow {
            length: len,
            max: u32::MAX as usize,
        })?;
        self.write_u32(value);
        Ok(())
    }

    /// Finishes writing and returns the byte buffer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// Finishes writing and appends to the provided buffer.
    pub fn finish_into(mut self, buf: &mut Vec<u8>) {
        buf.append(&mut self.bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_writer() {
        let writer = ByteWriter::new();
        assert_eq!(writer.len(), 0);
        assert!(writer.is_empty());
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn writes_are_big_endian() {
        let mut writer = ByteWriter::new();
        writer.write_u16(0xABCD);
        writer.write_i32(-2);
        assert_eq!(writer.finish(), vec![0xAB, 0xCD, 0xFF, 0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn len_prefix_u16_overflow() {
        let mut writer = ByteWriter::new();
        let err = writer.write_len_u16(70_000).unwrap_err();
        assert!(matches!(
            err,
            ByteError::LengthOverflow {
                length: 70_000,
                max: 65_535
            }
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn len_prefix_u32() {
        let mut writer = ByteWriter::new();
        writer.write_len_u32(3).unwrap();
        assert_eq!(writer.finish(), vec![0, 0, 0, 3]);
    }

    #[test]
    fn finish_into() {
        let mut writer = ByteWriter::with_capacity(4);
        writer.write_u8(0xAB);

        let mut buf = vec![0x00, 0x11];
        writer.finish_into(&mut buf);
        assert_eq!(buf, vec![0x00, 0x11, 0xAB]);
    }
}
