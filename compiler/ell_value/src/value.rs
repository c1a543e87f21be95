//! Typed value handles.
//!
//! A [`Value`] is a *view*: it carries an element type, an optional layout,
//! and an optional backend [`Emittable`]. The storage it points at is owned
//! by whichever backend scope allocated it, and is never freed here.

use crate::error::{EmitError, EmitResult};
use crate::layout::MemoryLayout;
use crate::value_type::ValueType;

/// Opaque handle to a backend object.
///
/// Only the backend that issued an `Emittable` can interpret it. `Copy`
/// so values can be passed around freely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Emittable(u32);

impl Emittable {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The raw index as `usize`, for backends that key tables by index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed handle on (possibly absent) backend storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    ty: ValueType,
    layout: Option<MemoryLayout>,
    data: Option<Emittable>,
}

impl Value {
    /// An unconstrained, undefined value of `ty`.
    pub fn new(ty: ValueType) -> Self {
        Self {
            ty,
            layout: None,
            data: None,
        }
    }

    /// A shape-resolved value that is not yet bound to storage.
    pub fn with_layout(ty: ValueType, layout: MemoryLayout) -> Self {
        Self {
            ty,
            layout: Some(layout),
            data: None,
        }
    }

    /// A value bound to backend storage. Backends use this to hand out
    /// the results of allocations and operations.
    pub fn from_emittable(emittable: Emittable, ty: ValueType, layout: MemoryLayout) -> Self {
        Self {
            ty,
            layout: Some(layout),
            data: Some(emittable),
        }
    }

    /// Element type.
    #[inline]
    pub fn ty(&self) -> ValueType {
        self.ty
    }

    /// Element type with any pointer level stripped.
    #[inline]
    pub fn base_type(&self) -> ValueType {
        self.ty.base()
    }

    /// Shape-resolved.
    #[inline]
    pub fn is_constrained(&self) -> bool {
        self.layout.is_some()
    }

    /// Bound to storage.
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.data.is_some()
    }

    pub fn layout(&self) -> EmitResult<&MemoryLayout> {
        self.layout
            .as_ref()
            .ok_or_else(|| EmitError::invalid_argument("value has no layout"))
    }

    /// The layout if constrained.
    #[inline]
    pub fn layout_opt(&self) -> Option<&MemoryLayout> {
        self.layout.as_ref()
    }

    /// Reinterpret the value with a new layout. Storage is untouched.
    pub fn set_layout(&mut self, layout: MemoryLayout) {
        self.layout = Some(layout);
    }

    pub fn emittable(&self) -> EmitResult<Emittable> {
        self.data
            .ok_or_else(|| EmitError::invalid_argument("value is not defined"))
    }

    /// Bind the value to backend storage.
    pub fn set_data(&mut self, emittable: Emittable) {
        self.data = Some(emittable);
    }

    /// Drop the storage binding, keeping type and layout.
    pub fn reset(&mut self) {
        self.data = None;
    }

    /// Number of layout dimensions, if constrained.
    pub fn rank(&self) -> Option<usize> {
        self.layout.as_ref().map(MemoryLayout::num_dimensions)
    }

    /// Fails with `InvalidArgument` unless the value is bound to storage.
    pub fn ensure_defined(&self) -> EmitResult<()> {
        if self.is_defined() {
            Ok(())
        } else {
            Err(EmitError::invalid_argument(format!(
                "{} value is not defined",
                self.ty
            )))
        }
    }
}

/// Immutable host data handed to `store_constant_data`.
///
/// Also the storage format of the interpreting backend.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantData {
    Boolean(Vec<bool>),
    Byte(Vec<u8>),
    Char8(Vec<i8>),
    Short(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Double(Vec<f64>),
}

impl ConstantData {
    /// Element type of the data.
    pub fn value_type(&self) -> ValueType {
        match self {
            ConstantData::Boolean(_) => ValueType::Boolean,
            ConstantData::Byte(_) => ValueType::Byte,
            ConstantData::Char8(_) => ValueType::Char8,
            ConstantData::Short(_) => ValueType::Short,
            ConstantData::Int32(_) => ValueType::Int32,
            ConstantData::Int64(_) => ValueType::Int64,
            ConstantData::Double(_) => ValueType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ConstantData::Boolean(v) => v.len(),
            ConstantData::Byte(v) => v.len(),
            ConstantData::Char8(v) => v.len(),
            ConstantData::Short(v) => v.len(),
            ConstantData::Int32(v) => v.len(),
            ConstantData::Int64(v) => v.len(),
            ConstantData::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-filled data of `len` elements of `ty`.
    pub fn zeroed(ty: ValueType, len: usize) -> EmitResult<Self> {
        Ok(match ty {
            ValueType::Boolean => ConstantData::Boolean(vec![false; len]),
            ValueType::Byte => ConstantData::Byte(vec![0; len]),
            ValueType::Char8 => ConstantData::Char8(vec![0; len]),
            ValueType::Short => ConstantData::Short(vec![0; len]),
            ValueType::Int32 => ConstantData::Int32(vec![0; len]),
            ValueType::Int64 => ConstantData::Int64(vec![0; len]),
            ValueType::Double => ConstantData::Double(vec![0.0; len]),
            other => {
                return Err(EmitError::InvalidValueType(format!(
                    "cannot hold `{other}` elements in host storage"
                )))
            }
        })
    }
}

macro_rules! constant_data_from {
    ($($elem:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$elem>> for ConstantData {
                fn from(values: Vec<$elem>) -> Self {
                    ConstantData::$variant(values)
                }
            }
        )*
    };
}

constant_data_from! {
    bool => Boolean,
    u8 => Byte,
    i8 => Char8,
    i16 => Short,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
}

/// Host element types that map onto a [`ValueType`].
pub trait Element: Copy {
    const VALUE_TYPE: ValueType;

    fn into_constant_data(values: Vec<Self>) -> ConstantData;
}

macro_rules! element_impl {
    ($($elem:ty => $ty:ident),* $(,)?) => {
        $(
            impl Element for $elem {
                const VALUE_TYPE: ValueType = ValueType::$ty;

                fn into_constant_data(values: Vec<Self>) -> ConstantData {
                    ConstantData::from(values)
                }
            }
        )*
    };
}

element_impl! {
    bool => Boolean,
    u8 => Byte,
    i8 => Char8,
    i16 => Short,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
