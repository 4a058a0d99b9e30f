//! Binary serialization primitives for Neo N3.
//!
//! All integers are little-endian. Variable-length integers use the
//! 1/3/5/9-byte scheme: values below `0xFD` occupy a single byte, then
//! `0xFD u16`, `0xFE u32` and `0xFF u64` follow. Strings and byte strings
//! are length-prefixed with a var-int; arrays are count-prefixed.

mod binary_writer;
mod error;
mod memory_reader;
mod serializable;

pub use binary_writer::BinaryWriter;
pub use error::{IoError, IoResult};
pub use memory_reader::MemoryReader;
pub use serializable::{helper, Serializable, SerializableExt};
