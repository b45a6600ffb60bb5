//! Stack item type tags used at the host boundary.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Wire tag of a stack item variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StackItemType {
    ByteArray = 0x00,
    Boolean = 0x01,
    Integer = 0x02,
    InteropInterface = 0x40,
    Array = 0x80,
    Struct = 0x81,
    Map = 0x82,
}

impl StackItemType {
    /// Returns true for Array, Struct and Map.
    pub fn is_compound(self) -> bool {
        matches!(self, Self::Array | Self::Struct | Self::Map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_values() {
        assert_eq!(StackItemType::try_from(0x81u8), Ok(StackItemType::Struct));
        assert!(StackItemType::try_from(0x03u8).is_err());
        assert_eq!(u8::from(StackItemType::InteropInterface), 0x40);
        assert!(StackItemType::Map.is_compound());
        assert!(!StackItemType::Integer.is_compound());
    }
}
