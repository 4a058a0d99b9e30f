//! Values on the evaluation stack.

use crate::{VmError, VmResult};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Maximum serialized size of a single item in bytes.
pub const MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Maximum width of an integer: 32 bytes of two's complement.
pub const MAX_INTEGER_SIZE: usize = 32;

/// Type tags, matching the binary serialization of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StackItemType {
    Any = 0x00,
    Pointer = 0x10,
    Boolean = 0x20,
    Integer = 0x21,
    ByteString = 0x28,
    Buffer = 0x30,
    Array = 0x40,
    Struct = 0x41,
    Map = 0x48,
    InteropInterface = 0x60,
}

impl StackItemType {
    /// Decodes a type tag byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Any),
            0x10 => Some(Self::Pointer),
            0x20 => Some(Self::Boolean),
            0x21 => Some(Self::Integer),
            0x28 => Some(Self::ByteString),
            0x30 => Some(Self::Buffer),
            0x40 => Some(Self::Array),
            0x41 => Some(Self::Struct),
            0x48 => Some(Self::Map),
            0x60 => Some(Self::InteropInterface),
            _ => None,
        }
    }
}

/// A host object handed to scripts as an opaque stack item.
pub trait InteropInterface: fmt::Debug {
    /// A short name describing the wrapped object.
    fn interface_type(&self) -> &str;

    /// Downcasting access.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// A value in the NeoVM.
///
/// Compound items (`Array`, `Struct`, `Map`) have reference semantics:
/// cloning a stack item clones the handle, not the contents. `Struct`
/// additionally compares by value, element for element.
#[derive(Debug, Clone)]
pub enum StackItem {
    Null,
    Boolean(bool),
    Integer(BigInt),
    ByteString(Vec<u8>),
    Buffer(Vec<u8>),
    Array(Rc<RefCell<Vec<StackItem>>>),
    Struct(Rc<RefCell<Vec<StackItem>>>),
    Map(Rc<RefCell<Vec<(StackItem, StackItem)>>>),
    Pointer(usize),
    InteropInterface(Rc<dyn InteropInterface>),
}

impl StackItem {
    /// Creates an integer item, checking the 32-byte bound.
    pub fn from_integer(value: BigInt) -> VmResult<Self> {
        check_integer(&value)?;
        Ok(Self::Integer(value))
    }

    /// Creates an integer item from a machine integer.
    pub fn from_int<T: Into<i64>>(value: T) -> Self {
        Self::Integer(BigInt::from(value.into()))
    }

    /// Creates a byte string item.
    pub fn from_bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::ByteString(value.into())
    }

    /// Creates an empty array item.
    pub fn new_array() -> Self {
        Self::Array(Rc::new(RefCell::new(Vec::new())))
    }

    /// Creates an array item over the given elements.
    pub fn array_of(items: Vec<StackItem>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    /// Creates a struct item over the given elements.
    pub fn struct_of(items: Vec<StackItem>) -> Self {
        Self::Struct(Rc::new(RefCell::new(items)))
    }

    /// Creates an empty map item.
    pub fn new_map() -> Self {
        Self::Map(Rc::new(RefCell::new(Vec::new())))
    }

    /// Gets the type tag.
    pub fn item_type(&self) -> StackItemType {
        match self {
            Self::Null => StackItemType::Any,
            Self::Boolean(_) => StackItemType::Boolean,
            Self::Integer(_) => StackItemType::Integer,
            Self::ByteString(_) => StackItemType::ByteString,
            Self::Buffer(_) => StackItemType::Buffer,
            Self::Array(_) => StackItemType::Array,
            Self::Struct(_) => StackItemType::Struct,
            Self::Map(_) => StackItemType::Map,
            Self::Pointer(_) => StackItemType::Pointer,
            Self::InteropInterface(_) => StackItemType::InteropInterface,
        }
    }

    /// Whether the item is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the item is a primitive (boolean, integer or byte string).
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.item_type(),
            StackItemType::Boolean | StackItemType::Integer | StackItemType::ByteString
        )
    }

    /// Interprets the item as a boolean.
    pub fn try_bool(&self) -> VmResult<bool> {
        Ok(match self {
            Self::Null => false,
            Self::Boolean(value) => *value,
            Self::Integer(value) => !value.is_zero(),
            Self::ByteString(bytes) | Self::Buffer(bytes) => bytes.iter().any(|&b| b != 0),
            Self::Array(_)
            | Self::Struct(_)
            | Self::Map(_)
            | Self::Pointer(_)
            | Self::InteropInterface(_) => true,
        })
    }

    /// Interprets the item as an integer.
    pub fn try_integer(&self) -> VmResult<BigInt> {
        match self {
            Self::Boolean(value) => Ok(BigInt::from(u8::from(*value))),
            Self::Integer(value) => Ok(value.clone()),
            Self::ByteString(bytes) | Self::Buffer(bytes) => {
                if bytes.len() > MAX_INTEGER_SIZE {
                    return Err(VmError::InvalidCast(format!(
                        "{} bytes do not fit an integer",
                        bytes.len()
                    )));
                }
                Ok(BigInt::from_signed_bytes_le(bytes))
            }
            other => Err(VmError::InvalidCast(format!(
                "{:?} is not convertible to integer",
                other.item_type()
            ))),
        }
    }

    /// Interprets the item as bytes.
    pub fn try_bytes(&self) -> VmResult<Vec<u8>> {
        match self {
            Self::Boolean(value) => Ok(vec![u8::from(*value)]),
            Self::Integer(value) => Ok(integer_to_bytes(value)),
            Self::ByteString(bytes) | Self::Buffer(bytes) => Ok(bytes.clone()),
            other => Err(VmError::InvalidCast(format!(
                "{:?} is not convertible to bytes",
                other.item_type()
            ))),
        }
    }

    /// Value equality for primitives, reference equality for arrays and
    /// maps, element-wise equality for structs.
    pub fn equals(&self, other: &StackItem) -> VmResult<bool> {
        Ok(match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            (Self::InteropInterface(a), Self::InteropInterface(b)) => Rc::ptr_eq(a, b),
            (Self::Pointer(a), Self::Pointer(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => {
                if Rc::ptr_eq(a, b) {
                    true
                } else {
                    let a = a.borrow();
                    let b = b.borrow();
                    if a.len() != b.len() {
                        false
                    } else {
                        for (x, y) in a.iter().zip(b.iter()) {
                            if !x.equals(y)? {
                                return Ok(false);
                            }
                        }
                        true
                    }
                }
            }
            (a, b) if a.is_primitive() && b.is_primitive() => a.try_bytes()? == b.try_bytes()?,
            (Self::Buffer(a), Self::Buffer(b)) => a == b,
            _ => false,
        })
    }

    /// Converts the item to another type.
    pub fn convert(&self, target: StackItemType) -> VmResult<StackItem> {
        if self.item_type() == target {
            return Ok(self.clone());
        }
        match target {
            StackItemType::Boolean => Ok(Self::Boolean(self.try_bool()?)),
            StackItemType::Integer => Ok(Self::Integer(self.try_integer()?)),
            StackItemType::ByteString => Ok(Self::ByteString(self.try_bytes()?)),
            StackItemType::Buffer => Ok(Self::Buffer(self.try_bytes()?)),
            StackItemType::Array => match self {
                Self::Struct(fields) => Ok(Self::Array(Rc::new(RefCell::new(
                    fields.borrow().clone(),
                )))),
                _ => Err(VmError::InvalidCast(format!(
                    "{:?} is not convertible to array",
                    self.item_type()
                ))),
            },
            StackItemType::Struct => match self {
                Self::Array(items) => Ok(Self::Struct(Rc::new(RefCell::new(
                    items.borrow().clone(),
                )))),
                _ => Err(VmError::InvalidCast(format!(
                    "{:?} is not convertible to struct",
                    self.item_type()
                ))),
            },
            StackItemType::Any if self.is_null() => Ok(Self::Null),
            other => Err(VmError::InvalidCast(format!(
                "conversion to {other:?} not supported"
            ))),
        }
    }

    /// Recursively copies the item, giving compounds fresh identities.
    pub fn deep_copy(&self) -> StackItem {
        match self {
            Self::Array(items) => Self::Array(Rc::new(RefCell::new(
                items.borrow().iter().map(StackItem::deep_copy).collect(),
            ))),
            Self::Struct(items) => Self::Struct(Rc::new(RefCell::new(
                items.borrow().iter().map(StackItem::deep_copy).collect(),
            ))),
            Self::Map(entries) => Self::Map(Rc::new(RefCell::new(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.deep_copy(), v.deep_copy()))
                    .collect(),
            ))),
            other => other.clone(),
        }
    }

    /// Number of items reachable from this one, itself included. Used by
    /// the reference counter to weigh pushes of compound items.
    pub fn reachable_count(&self) -> usize {
        match self {
            Self::Array(items) | Self::Struct(items) => {
                1 + items
                    .borrow()
                    .iter()
                    .map(StackItem::reachable_count)
                    .sum::<usize>()
            }
            Self::Map(entries) => {
                1 + entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| k.reachable_count() + v.reachable_count())
                    .sum::<usize>()
            }
            _ => 1,
        }
    }
}

/// Minimal two's-complement little-endian encoding of an integer.
pub fn integer_to_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    }
}

/// Rejects integers wider than [`MAX_INTEGER_SIZE`] bytes.
pub fn check_integer(value: &BigInt) -> VmResult<()> {
    if integer_to_bytes(value).len() > MAX_INTEGER_SIZE {
        return Err(VmError::LimitExceeded(format!(
            "integer of {} bits exceeds 32 bytes",
            value.abs().bits()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_interpretation() {
        assert!(!StackItem::Null.try_bool().unwrap());
        assert!(StackItem::from_int(5).try_bool().unwrap());
        assert!(!StackItem::from_bytes(vec![0, 0]).try_bool().unwrap());
        assert!(StackItem::from_bytes(vec![0, 1]).try_bool().unwrap());
        assert!(StackItem::new_array().try_bool().unwrap());
    }

    #[test]
    fn integer_byte_roundtrip() {
        for value in [0i64, 1, -1, 127, -128, 255, 65535, -65536] {
            let item = StackItem::from_int(value);
            let bytes = item.try_bytes().unwrap();
            let back = StackItem::from_bytes(bytes).try_integer().unwrap();
            assert_eq!(back, BigInt::from(value), "value {value}");
        }
    }

    #[test]
    fn oversized_integer_rejected() {
        let big = BigInt::from(1) << 256;
        assert!(StackItem::from_integer(big).is_err());
        let bytes = vec![1u8; 33];
        assert!(StackItem::from_bytes(bytes).try_integer().is_err());
    }

    #[test]
    fn arrays_compare_by_reference() {
        let a = StackItem::array_of(vec![StackItem::from_int(1)]);
        let b = StackItem::array_of(vec![StackItem::from_int(1)]);
        assert!(!a.equals(&b).unwrap());
        assert!(a.equals(&a.clone()).unwrap());
    }

    #[test]
    fn structs_compare_by_value() {
        let a = StackItem::struct_of(vec![StackItem::from_int(1), StackItem::from_bytes(b"x".to_vec())]);
        let b = StackItem::struct_of(vec![StackItem::from_int(1), StackItem::from_bytes(b"x".to_vec())]);
        assert!(a.equals(&b).unwrap());
        let c = StackItem::struct_of(vec![StackItem::from_int(2)]);
        assert!(!a.equals(&c).unwrap());
    }

    #[test]
    fn clone_shares_compound_contents() {
        let array = StackItem::new_array();
        let alias = array.clone();
        if let StackItem::Array(items) = &array {
            items.borrow_mut().push(StackItem::from_int(7));
        }
        if let StackItem::Array(items) = &alias {
            assert_eq!(items.borrow().len(), 1);
        }
        // A deep copy does not share.
        let copy = array.deep_copy();
        assert!(!array.equals(&copy).unwrap());
    }

    #[test]
    fn convert_between_array_and_struct() {
        let array = StackItem::array_of(vec![StackItem::from_int(1)]);
        let as_struct = array.convert(StackItemType::Struct).unwrap();
        assert_eq!(as_struct.item_type(), StackItemType::Struct);
        let back = as_struct.convert(StackItemType::Array).unwrap();
        assert_eq!(back.item_type(), StackItemType::Array);
    }

    #[test]
    fn reachable_count_counts_nested_items() {
        let inner = StackItem::array_of(vec![StackItem::from_int(1), StackItem::from_int(2)]);
        let outer = StackItem::array_of(vec![inner, StackItem::Null]);
        assert_eq!(outer.reachable_count(), 5);
    }
}
