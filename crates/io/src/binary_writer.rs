//! Binary writer for serializing Neo data structures.

use crate::{IoError, IoResult, Serializable};
use bytes::{BufMut, BytesMut};

/// A writer that serializes Neo data structures to a growable buffer.
pub struct BinaryWriter {
    buffer: BytesMut,
}

impl BinaryWriter {
    /// Creates a new binary writer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Creates a new binary writer with the specified initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, value: u8) -> IoResult<()> {
        self.buffer.put_u8(value);
        Ok(())
    }

    /// Writes a boolean as a single byte.
    pub fn write_bool(&mut self, value: bool) -> IoResult<()> {
        self.write_byte(u8::from(value))
    }

    /// Writes a u16 in little-endian order.
    pub fn write_u16(&mut self, value: u16) -> IoResult<()> {
        self.buffer.put_u16_le(value);
        Ok(())
    }

    /// Writes a u32 in little-endian order.
    pub fn write_u32(&mut self, value: u32) -> IoResult<()> {
        self.buffer.put_u32_le(value);
        Ok(())
    }

    /// Writes a u64 in little-endian order.
    pub fn write_u64(&mut self, value: u64) -> IoResult<()> {
        self.buffer.put_u64_le(value);
        Ok(())
    }

    /// Writes an i32 in little-endian order.
    pub fn write_i32(&mut self, value: i32) -> IoResult<()> {
        self.buffer.put_i32_le(value);
        Ok(())
    }

    /// Writes an i64 in little-endian order.
    pub fn write_i64(&mut self, value: i64) -> IoResult<()> {
        self.buffer.put_i64_le(value);
        Ok(())
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Writes a variable-length integer.
    pub fn write_var_int(&mut self, value: u64) -> IoResult<()> {
        match value {
            0..=0xFC => self.write_byte(value as u8),
            0xFD..=0xFFFF => {
                self.write_byte(0xFD)?;
                self.write_u16(value as u16)
            }
            0x1_0000..=0xFFFF_FFFF => {
                self.write_byte(0xFE)?;
                self.write_u32(value as u32)
            }
            _ => {
                self.write_byte(0xFF)?;
                self.write_u64(value)
            }
        }
    }

    /// Writes a length-prefixed byte string.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.write_var_int(bytes.len() as u64)?;
        self.write_bytes(bytes)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_var_string(&mut self, value: &str) -> IoResult<()> {
        self.write_var_bytes(value.as_bytes())
    }

    /// Writes a UTF-8 string into a fixed-size field, zero padded.
    pub fn write_fixed_string(&mut self, value: &str, length: usize) -> IoResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() > length {
            return Err(IoError::invalid_operation(
                "write_fixed_string",
                "string longer than field",
            ));
        }
        self.write_bytes(bytes)?;
        for _ in bytes.len()..length {
            self.write_byte(0)?;
        }
        Ok(())
    }

    /// Writes a serializable value.
    pub fn write_serializable<T: Serializable>(&mut self, value: &T) -> IoResult<()> {
        value.serialize(self)
    }

    /// Writes a count-prefixed list of serializable values.
    pub fn write_serializable_vec<T: Serializable>(&mut self, values: &[T]) -> IoResult<()> {
        self.write_var_int(values.len() as u64)?;
        for value in values {
            value.serialize(self)?;
        }
        Ok(())
    }

    /// Consumes the writer and returns the written bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the encoded size of a var-int.
pub(crate) fn var_int_size(value: u64) -> usize {
    match value {
        0..=0xFC => 1,
        0xFD..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_int_boundaries() {
        for (value, encoded) in [
            (0u64, vec![0x00]),
            (0xFC, vec![0xFC]),
            (0xFD, vec![0xFD, 0xFD, 0x00]),
            (0xFFFF, vec![0xFD, 0xFF, 0xFF]),
            (0x1_0000, vec![0xFE, 0x00, 0x00, 0x01, 0x00]),
        ] {
            let mut writer = BinaryWriter::new();
            writer.write_var_int(value).unwrap();
            assert_eq!(writer.to_bytes(), encoded, "value {value}");
            assert_eq!(var_int_size(value), encoded.len());
        }

        let mut writer = BinaryWriter::new();
        writer.write_var_int(0x1_0000_0000).unwrap();
        assert_eq!(writer.to_bytes()[0], 0xFF);
        assert_eq!(writer.len(), 9);
    }

    #[test]
    fn little_endian_integers() {
        let mut writer = BinaryWriter::new();
        writer.write_u32(0xDEAD_BEEF).unwrap();
        assert_eq!(writer.to_bytes(), vec![0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn fixed_string_pads_with_zeros() {
        let mut writer = BinaryWriter::new();
        writer.write_fixed_string("neo", 5).unwrap();
        assert_eq!(writer.to_bytes(), b"neo\0\0".to_vec());
        assert!(writer.write_fixed_string("too long", 4).is_err());
    }
}
