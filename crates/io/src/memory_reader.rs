// Copyright (C) 2015-2025 The Neo Project.
//
// memory_reader.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Bounds-checked reader over an in-memory byte slice.

use crate::error::{IoError, IoResult};

/// A reader for decoding Neo data structures from memory.
pub struct MemoryReader {
    span: Vec<u8>,
    pos: usize,
}

impl MemoryReader {
    /// Creates a new reader over the given data.
    pub fn new(data: &[u8]) -> Self {
        Self {
            span: data.to_vec(),
            pos: 0,
        }
    }

    /// Gets the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Gets the total length of the underlying data.
    pub fn len(&self) -> usize {
        self.span.len()
    }

    /// Returns whether the underlying data is empty.
    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    /// Gets the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.span.len() - self.pos
    }

    fn ensure(&self, amount: usize) -> IoResult<()> {
        if self.pos + amount > self.span.len() {
            return Err(IoError::end_of_stream(amount, "memory reader"));
        }
        Ok(())
    }

    /// Peeks at the next byte without advancing.
    pub fn peek(&self) -> IoResult<u8> {
        self.ensure(1)?;
        Ok(self.span[self.pos])
    }

    /// Reads a single byte.
    pub fn read_byte(&mut self) -> IoResult<u8> {
        self.ensure(1)?;
        let b = self.span[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Reads a boolean; any value other than 0 or 1 is malformed.
    pub fn read_bool(&mut self) -> IoResult<bool> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(IoError::format_exception(
                "read_bool".to_string(),
                format!("invalid boolean value {other}"),
            )),
        }
    }

    /// Reads a u16 in little-endian order.
    pub fn read_u16(&mut self) -> IoResult<u16> {
        self.ensure(2)?;
        let bytes: [u8; 2] = self.span[self.pos..self.pos + 2].try_into().unwrap();
        self.pos += 2;
        Ok(u16::from_le_bytes(bytes))
    }

    /// Reads a u32 in little-endian order.
    pub fn read_u32(&mut self) -> IoResult<u32> {
        self.ensure(4)?;
        let bytes: [u8; 4] = self.span[self.pos..self.pos + 4].try_into().unwrap();
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a u64 in little-endian order.
    pub fn read_u64(&mut self) -> IoResult<u64> {
        self.ensure(8)?;
        let bytes: [u8; 8] = self.span[self.pos..self.pos + 8].try_into().unwrap();
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads an i32 in little-endian order.
    pub fn read_i32(&mut self) -> IoResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads an i64 in little-endian order.
    pub fn read_i64(&mut self) -> IoResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> IoResult<Vec<u8>> {
        self.ensure(count)?;
        let bytes = self.span[self.pos..self.pos + count].to_vec();
        self.pos += count;
        Ok(bytes)
    }

    /// Reads a variable-length integer, rejecting values above `max`.
    pub fn read_var_int(&mut self, max: u64) -> IoResult<u64> {
        let prefix = self.read_byte()?;
        let value = match prefix {
            0xFD => self.read_u16()? as u64,
            0xFE => self.read_u32()? as u64,
            0xFF => self.read_u64()?,
            b => b as u64,
        };
        if value > max {
            return Err(IoError::length_exceeded(value, max, "var int"));
        }
        Ok(value)
    }

    /// Reads a length-prefixed byte string of at most `max` bytes.
    pub fn read_var_bytes(&mut self, max: usize) -> IoResult<Vec<u8>> {
        let length = self.read_var_int(max as u64)? as usize;
        self.read_bytes(length)
    }

    /// Reads a length-prefixed UTF-8 string of at most `max` bytes.
    pub fn read_var_string(&mut self, max: usize) -> IoResult<String> {
        let bytes = self.read_var_bytes(max)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Reads a fixed-size zero-padded UTF-8 string field.
    pub fn read_fixed_string(&mut self, length: usize) -> IoResult<String> {
        let bytes = self.read_bytes(length)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if bytes[end..].iter().any(|&b| b != 0) {
            return Err(IoError::format_exception(
                "read_fixed_string",
                "garbage after terminator",
            ));
        }
        Ok(String::from_utf8(bytes[..end].to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryWriter;

    #[test]
    fn reads_back_what_writer_wrote() {
        let mut writer = BinaryWriter::new();
        writer.write_byte(7).unwrap();
        writer.write_bool(true).unwrap();
        writer.write_u32(0x01020304).unwrap();
        writer.write_i64(-42).unwrap();
        writer.write_var_bytes(b"abc").unwrap();
        writer.write_var_string("neo").unwrap();

        let mut reader = MemoryReader::new(&writer.to_bytes());
        assert_eq!(reader.read_byte().unwrap(), 7);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_u32().unwrap(), 0x01020304);
        assert_eq!(reader.read_i64().unwrap(), -42);
        assert_eq!(reader.read_var_bytes(16).unwrap(), b"abc".to_vec());
        assert_eq!(reader.read_var_string(16).unwrap(), "neo");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn var_int_respects_max() {
        let mut writer = BinaryWriter::new();
        writer.write_var_int(1000).unwrap();
        let mut reader = MemoryReader::new(&writer.to_bytes());
        assert!(matches!(
            reader.read_var_int(999),
            Err(IoError::LengthExceeded { length: 1000, .. })
        ));
    }

    #[test]
    fn short_reads_fail() {
        let mut reader = MemoryReader::new(&[1, 2]);
        assert!(reader.read_u32().is_err());
        // Position must not move on a failed read.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn rejects_malformed_boolean() {
        let mut reader = MemoryReader::new(&[2]);
        assert!(reader.read_bool().is_err());
    }
}
