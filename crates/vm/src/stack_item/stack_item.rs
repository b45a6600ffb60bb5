//! Stack item implementation for the Neo Virtual Machine.
//!
//! [`StackItem`] is a closed sum over the seven runtime value kinds. Byte
//! arrays, interop handles and the three compound kinds are reference counted,
//! so duplicating a slot shares the value and [`StackItem::claims`] reports how
//! many slots currently hold it.

use crate::big_integer::BigInteger;
use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngineLimits;
use crate::stack_item::{Array, InteropInterface, Map, StackItemType, Struct};
use std::fmt;
use std::rc::Rc;

/// Represents a value in the Neo VM.
#[derive(Clone)]
pub enum StackItem {
    Boolean(bool),
    Integer(BigInteger),
    ByteArray(Rc<[u8]>),
    Interop(Rc<InteropInterface>),
    Array(Array),
    Struct(Struct),
    Map(Map),
}

impl StackItem {
    pub fn from_bool(value: bool) -> Self {
        Self::Boolean(value)
    }

    pub fn from_int(value: impl Into<BigInteger>) -> Self {
        Self::Integer(value.into())
    }

    pub fn from_bytes(value: impl Into<Rc<[u8]>>) -> Self {
        Self::ByteArray(value.into())
    }

    pub fn from_interop(data: impl Into<Box<[u8]>>) -> Self {
        Self::Interop(Rc::new(InteropInterface::new(data)))
    }

    pub fn new_array(items: Vec<StackItem>) -> Self {
        Self::Array(Array::new(items))
    }

    pub fn new_struct(items: Vec<StackItem>) -> Self {
        Self::Struct(Struct::new(items))
    }

    pub fn new_map() -> Self {
        Self::Map(Map::new())
    }

    /// Builds an item from a type tag and its serialized bytes.
    ///
    /// Compound tags produce an empty container; fill it through the
    /// container's own accessors.
    pub fn from_raw(item_type: StackItemType, data: &[u8]) -> Self {
        match item_type {
            StackItemType::ByteArray => Self::from_bytes(data),
            StackItemType::Boolean => Self::Boolean(data.iter().any(|b| *b != 0)),
            StackItemType::Integer => Self::Integer(BigInteger::from_bytes_le(data)),
            StackItemType::InteropInterface => Self::from_interop(data),
            StackItemType::Array => Self::new_array(Vec::new()),
            StackItemType::Struct => Self::new_struct(Vec::new()),
            StackItemType::Map => Self::new_map(),
        }
    }

    pub fn item_type(&self) -> StackItemType {
        match self {
            Self::Boolean(_) => StackItemType::Boolean,
            Self::Integer(_) => StackItemType::Integer,
            Self::ByteArray(_) => StackItemType::ByteArray,
            Self::Interop(_) => StackItemType::InteropInterface,
            Self::Array(_) => StackItemType::Array,
            Self::Struct(_) => StackItemType::Struct,
            Self::Map(_) => StackItemType::Map,
        }
    }

    /// Truthiness of the item.
    pub fn get_boolean(&self) -> bool {
        match self {
            Self::Boolean(value) => *value,
            Self::Integer(value) => !value.is_zero(),
            Self::ByteArray(bytes) => bytes.iter().any(|b| *b != 0),
            Self::Interop(_) | Self::Array(_) | Self::Struct(_) | Self::Map(_) => true,
        }
    }

    /// Numeric coercion. Compound items and interop handles fail.
    pub fn get_big_integer(&self) -> VmResult<BigInteger> {
        match self {
            Self::Boolean(value) => Ok(BigInteger::from(*value)),
            Self::Integer(value) => Ok(value.clone()),
            Self::ByteArray(bytes) => Ok(BigInteger::from_bytes_le(bytes)),
            other => Err(VmError::invalid_type_msg(format!(
                "{:?} has no integer value",
                other.item_type()
            ))),
        }
    }

    /// Numeric coercion bounded to `i32`.
    pub fn get_int32(&self) -> VmResult<i32> {
        self.get_big_integer()?
            .to_i32()
            .ok_or_else(|| VmError::invalid_parameter_msg("integer does not fit in 32 bits"))
    }

    /// Byte view of a primitive item. `false` and integer zero are empty.
    pub fn get_byte_array(&self) -> VmResult<Vec<u8>> {
        match self {
            Self::Boolean(true) => Ok(vec![1]),
            Self::Boolean(false) => Ok(Vec::new()),
            Self::Integer(value) if value.is_zero() => Ok(Vec::new()),
            Self::Integer(value) => Ok(value.to_byte_array()),
            Self::ByteArray(bytes) => Ok(bytes.to_vec()),
            other => Err(VmError::invalid_type_msg(format!(
                "{:?} has no byte representation",
                other.item_type()
            ))),
        }
    }

    /// Length of [`Self::get_byte_array`] without materializing it.
    pub fn byte_array_size(&self) -> VmResult<usize> {
        match self {
            Self::Boolean(value) => Ok(usize::from(*value)),
            Self::Integer(value) if value.is_zero() => Ok(0),
            Self::Integer(value) => Ok(value.byte_len()),
            Self::ByteArray(bytes) => Ok(bytes.len()),
            other => Err(VmError::invalid_type_msg(format!(
                "{:?} has no byte representation",
                other.item_type()
            ))),
        }
    }

    /// Value equality with the default traversal cap.
    pub fn equals(&self, other: &StackItem) -> bool {
        self.equals_within(other, ExecutionEngineLimits::DEFAULT.traversal_limit())
            .unwrap_or(false)
    }

    /// Value equality. Primitives compare byte views, structs compare
    /// element-wise, and arrays, maps and interop handles compare by identity.
    pub fn equals_within(&self, other: &StackItem, limit: usize) -> VmResult<bool> {
        let equal = match (self, other) {
            (Self::Struct(a), Self::Struct(b)) => return a.equals(b, limit),
            (Self::Struct(_), _) | (_, Self::Struct(_)) => false,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::Interop(a), Self::Interop(b)) => Rc::ptr_eq(a, b),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::ByteArray(a), Self::ByteArray(b)) => a == b,
            (a, b) => match (a.get_byte_array(), b.get_byte_array()) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            },
        };
        Ok(equal)
    }

    /// Wire bytes for primitives. Compound items are not wire-representable
    /// and serialize as empty.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Self::Boolean(value) => vec![u8::from(*value)],
            Self::Integer(value) => value.to_byte_array(),
            Self::ByteArray(bytes) => bytes.to_vec(),
            Self::Interop(handle) => handle.data().to_vec(),
            Self::Array(_) | Self::Struct(_) | Self::Map(_) => Vec::new(),
        }
    }

    pub fn serialized_size(&self) -> usize {
        match self {
            Self::Boolean(_) => 1,
            Self::Integer(value) => value.byte_len(),
            Self::ByteArray(bytes) => bytes.len(),
            Self::Interop(handle) => handle.data().len(),
            Self::Array(_) | Self::Struct(_) | Self::Map(_) => 0,
        }
    }

    /// Number of slots sharing this value. Inline values always report one.
    pub fn claims(&self) -> usize {
        match self {
            Self::Boolean(_) | Self::Integer(_) => 1,
            Self::ByteArray(bytes) => Rc::strong_count(bytes),
            Self::Interop(handle) => Rc::strong_count(handle),
            Self::Array(array) => array.claims(),
            Self::Struct(item) => item.claims(),
            Self::Map(map) => map.claims(),
        }
    }

    /// Arrays, structs and maps.
    pub fn is_compound(&self) -> bool {
        self.item_type().is_compound()
    }

    /// Array or struct element handles.
    pub fn as_list(&self) -> Option<Vec<StackItem>> {
        match self {
            Self::Array(array) => Some(array.to_vec()),
            Self::Struct(item) => Some(item.to_vec()),
            _ => None,
        }
    }
}

impl From<bool> for StackItem {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<BigInteger> for StackItem {
    fn from(value: BigInteger) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for StackItem {
    fn from(value: i64) -> Self {
        Self::Integer(BigInteger::from(value))
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(value: Vec<u8>) -> Self {
        Self::ByteArray(value.into())
    }
}

impl From<&[u8]> for StackItem {
    fn from(value: &[u8]) -> Self {
        Self::ByteArray(value.into())
    }
}

impl From<Array> for StackItem {
    fn from(value: Array) -> Self {
        Self::Array(value)
    }
}

impl From<Struct> for StackItem {
    fn from(value: Struct) -> Self {
        Self::Struct(value)
    }
}

impl From<Map> for StackItem {
    fn from(value: Map) -> Self {
        Self::Map(value)
    }
}

impl fmt::Debug for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "Boolean({value})"),
            Self::Integer(value) => write!(f, "Integer({value})"),
            Self::ByteArray(bytes) => write!(f, "ByteArray({})", hex::encode(bytes)),
            Self::Interop(handle) => write!(f, "Interop({})", hex::encode(handle.data())),
            Self::Array(array) => fmt::Debug::fmt(array, f),
            Self::Struct(item) => fmt::Debug::fmt(item, f),
            Self::Map(map) => fmt::Debug::fmt(map, f),
        }
    }
}
