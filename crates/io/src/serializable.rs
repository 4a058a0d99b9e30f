//! Serialization traits for Neo objects.

use crate::{BinaryWriter, IoResult, MemoryReader};

/// Neo objects with a canonical binary form.
pub trait Serializable {
    /// The size of the object in bytes after serialization.
    fn size(&self) -> usize;

    /// Serializes the object into the writer.
    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()>;

    /// Deserializes an object from the reader.
    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self>
    where
        Self: Sized;
}

/// Extension methods for serializable objects.
pub trait SerializableExt: Serializable {
    /// Serializes the object to a byte vector.
    fn to_array(&self) -> IoResult<Vec<u8>> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize(&mut writer)?;
        Ok(writer.to_bytes())
    }

    /// Deserializes an object from a byte slice, requiring full consumption.
    fn from_array(data: &[u8]) -> IoResult<Self>
    where
        Self: Sized,
    {
        let mut reader = MemoryReader::new(data);
        let value = Self::deserialize(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(crate::IoError::format_exception(
                "from_array",
                "trailing bytes after object",
            ));
        }
        Ok(value)
    }
}

impl<T: Serializable> SerializableExt for T {}

/// Helpers shared by composite encodings.
pub mod helper {
    use super::Serializable;
    use crate::binary_writer::var_int_size;

    /// Encoded size of a var-int.
    pub fn get_var_size(value: u64) -> usize {
        var_int_size(value)
    }

    /// Encoded size of a length-prefixed byte string.
    pub fn get_var_bytes_size(bytes: &[u8]) -> usize {
        var_int_size(bytes.len() as u64) + bytes.len()
    }

    /// Encoded size of a count-prefixed list of serializable values.
    pub fn get_array_size<T: Serializable>(items: &[T]) -> usize {
        var_int_size(items.len() as u64) + items.iter().map(Serializable::size).sum::<usize>()
    }
}
