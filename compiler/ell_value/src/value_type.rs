//! Closed enumeration of value kinds.
//!
//! Each base kind has exactly one pointer variant. Pointer depth is one
//! level: there is no pointer-to-pointer.

use std::fmt;

use crate::error::EmitError;

/// Element kind of a value, or a single-level pointer to one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    Void,
    Boolean,
    Byte,
    Char8,
    Short,
    Int32,
    Int64,
    Double,
    PVoid,
    PBoolean,
    PByte,
    PChar8,
    PShort,
    PInt32,
    PInt64,
    PDouble,
}

impl ValueType {
    /// All base (non-pointer) kinds.
    pub const BASE: [ValueType; 8] = [
        ValueType::Void,
        ValueType::Boolean,
        ValueType::Byte,
        ValueType::Char8,
        ValueType::Short,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Double,
    ];

    /// Every kind, base kinds first, in tag order.
    pub const ALL: [ValueType; 16] = [
        ValueType::Void,
        ValueType::Boolean,
        ValueType::Byte,
        ValueType::Char8,
        ValueType::Short,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Double,
        ValueType::PVoid,
        ValueType::PBoolean,
        ValueType::PByte,
        ValueType::PChar8,
        ValueType::PShort,
        ValueType::PInt32,
        ValueType::PInt64,
        ValueType::PDouble,
    ];

    /// True for the pointer variants.
    #[inline]
    pub const fn is_pointer(self) -> bool {
        matches!(
            self,
            ValueType::PVoid
                | ValueType::PBoolean
                | ValueType::PByte
                | ValueType::PChar8
                | ValueType::PShort
                | ValueType::PInt32
                | ValueType::PInt64
                | ValueType::PDouble
        )
    }

    /// The base kind: pointer variants map to their pointee, base kinds to
    /// themselves.
    pub const fn base(self) -> ValueType {
        match self {
            ValueType::Void | ValueType::PVoid => ValueType::Void,
            ValueType::Boolean | ValueType::PBoolean => ValueType::Boolean,
            ValueType::Byte | ValueType::PByte => ValueType::Byte,
            ValueType::Char8 | ValueType::PChar8 => ValueType::Char8,
            ValueType::Short | ValueType::PShort => ValueType::Short,
            ValueType::Int32 | ValueType::PInt32 => ValueType::Int32,
            ValueType::Int64 | ValueType::PInt64 => ValueType::Int64,
            ValueType::Double | ValueType::PDouble => ValueType::Double,
        }
    }

    /// The pointer variant of a base kind. `None` for pointer variants.
    pub const fn pointer_to(self) -> Option<ValueType> {
        match self {
            ValueType::Void => Some(ValueType::PVoid),
            ValueType::Boolean => Some(ValueType::PBoolean),
            ValueType::Byte => Some(ValueType::PByte),
            ValueType::Char8 => Some(ValueType::PChar8),
            ValueType::Short => Some(ValueType::PShort),
            ValueType::Int32 => Some(ValueType::PInt32),
            ValueType::Int64 => Some(ValueType::PInt64),
            ValueType::Double => Some(ValueType::PDouble),
            ValueType::PVoid
            | ValueType::PBoolean
            | ValueType::PByte
            | ValueType::PChar8
            | ValueType::PShort
            | ValueType::PInt32
            | ValueType::PInt64
            | ValueType::PDouble => None,
        }
    }

    /// The pointee of a pointer variant. `None` for base kinds.
    #[inline]
    pub const fn pointee(self) -> Option<ValueType> {
        if self.is_pointer() {
            Some(self.base())
        } else {
            None
        }
    }

    /// Integer kinds (excluding `Boolean`).
    #[inline]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            ValueType::Byte
                | ValueType::Char8
                | ValueType::Short
                | ValueType::Int32
                | ValueType::Int64
        )
    }

    #[inline]
    pub const fn is_floating_point(self) -> bool {
        matches!(self, ValueType::Double)
    }

    /// Storage size of one element. Pointers are 64-bit.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            ValueType::Void => 0,
            ValueType::Boolean | ValueType::Byte | ValueType::Char8 => 1,
            ValueType::Short => 2,
            ValueType::Int32 => 4,
            ValueType::Int64 | ValueType::Double => 8,
            ValueType::PVoid
            | ValueType::PBoolean
            | ValueType::PByte
            | ValueType::PChar8
            | ValueType::PShort
            | ValueType::PInt32
            | ValueType::PInt64
            | ValueType::PDouble => 8,
        }
    }

    /// Stable numeric tag (index into [`ValueType::ALL`]).
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            ValueType::Void => "void",
            ValueType::Boolean => "bool",
            ValueType::Byte => "byte",
            ValueType::Char8 => "char8",
            ValueType::Short => "short",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Double => "double",
            ValueType::PVoid => "void*",
            ValueType::PBoolean => "bool*",
            ValueType::PByte => "byte*",
            ValueType::PChar8 => "char8*",
            ValueType::PShort => "short*",
            ValueType::PInt32 => "int32*",
            ValueType::PInt64 => "int64*",
            ValueType::PDouble => "double*",
        }
    }
}

impl TryFrom<u8> for ValueType {
    type Error = EmitError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        ValueType::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or_else(|| EmitError::InvalidValueType(format!("unknown value type tag {tag}")))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
