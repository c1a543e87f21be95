//! Rank-0 and rank-1 refinements of [`Value`].
//!
//! Operations dispatch through the active context.

use crate::active;
use crate::context::{ValueBinaryOperation, ValueLogicalOperation, ValueUnaryOperation};
use crate::error::{EmitError, EmitResult};
use crate::layout::MemoryLayout;
use crate::value::{Element, Value};
use crate::value_type::ValueType;

/// Values that support elementwise operators.
///
/// Results keep the shape of `self`; a [`Scalar`] right-hand side is
/// broadcast.
pub trait Elementwise: Sized {
    fn as_value(&self) -> &Value;

    /// Refine a value, checking its rank.
    fn from_value(value: Value) -> EmitResult<Self>;

    fn add(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        binary(ValueBinaryOperation::Add, self, rhs)
    }

    fn subtract(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        binary(ValueBinaryOperation::Subtract, self, rhs)
    }

    fn multiply(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        binary(ValueBinaryOperation::Multiply, self, rhs)
    }

    fn divide(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        binary(ValueBinaryOperation::Divide, self, rhs)
    }

    fn modulo(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        binary(ValueBinaryOperation::Modulus, self, rhs)
    }

    fn equal(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        logical(ValueLogicalOperation::Equality, self, rhs)
    }

    fn not_equal(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        logical(ValueLogicalOperation::Inequality, self, rhs)
    }

    fn less_than(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        logical(ValueLogicalOperation::LessThan, self, rhs)
    }

    fn less_equal(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        logical(ValueLogicalOperation::LessThanOrEqual, self, rhs)
    }

    fn greater_than(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        logical(ValueLogicalOperation::GreaterThan, self, rhs)
    }

    fn greater_equal(&self, rhs: &impl Elementwise) -> EmitResult<Self> {
        logical(ValueLogicalOperation::GreaterThanOrEqual, self, rhs)
    }

    fn logical_not(&self) -> EmitResult<Self> {
        let ctx = active::get_context()?;
        Self::from_value(ctx.unary_operation(ValueUnaryOperation::LogicalNot, self.as_value())?)
    }

    /// Numeric conversion of every element to `ty`.
    fn cast(&self, ty: ValueType) -> EmitResult<Self> {
        Self::from_value(active::cast(self.as_value(), ty)?)
    }
}

fn binary<T: Elementwise>(
    op: ValueBinaryOperation,
    lhs: &T,
    rhs: &impl Elementwise,
) -> EmitResult<T> {
    let ctx = active::get_context()?;
    T::from_value(ctx.binary_operation(op, lhs.as_value(), rhs.as_value())?)
}

fn logical<T: Elementwise>(
    op: ValueLogicalOperation,
    lhs: &T,
    rhs: &impl Elementwise,
) -> EmitResult<T> {
    let ctx = active::get_context()?;
    T::from_value(ctx.logical_operation(op, lhs.as_value(), rhs.as_value())?)
}

/// A rank-0 value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scalar {
    value: Value,
}

impl Scalar {
    /// An unconstrained value is given the scalar layout; any other rank is
    /// rejected.
    pub fn new(mut value: Value) -> EmitResult<Self> {
        match value.rank() {
            None => value.set_layout(MemoryLayout::scalar()),
            Some(0) => {}
            Some(rank) => {
                return Err(EmitError::invalid_argument(format!(
                    "scalar requires rank 0, got rank {rank}"
                )))
            }
        }
        Ok(Self { value })
    }

    /// A constant stored through the active context.
    pub fn constant<T: Element>(value: T) -> EmitResult<Self> {
        let mut stored = active::store_constant_data(T::into_constant_data(vec![value]))?;
        stored.set_layout(MemoryLayout::scalar());
        Self::new(stored)
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    #[inline]
    pub fn ty(&self) -> ValueType {
        self.value.base_type()
    }
}

impl Elementwise for Scalar {
    fn as_value(&self) -> &Value {
        &self.value
    }

    fn from_value(value: Value) -> EmitResult<Self> {
        Scalar::new(value)
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        scalar.value
    }
}

/// A rank-1 value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vector {
    value: Value,
}

impl Vector {
    pub fn new(value: Value) -> EmitResult<Self> {
        match value.rank() {
            Some(1) => Ok(Self { value }),
            Some(rank) => Err(EmitError::invalid_argument(format!(
                "vector requires rank 1, got rank {rank}"
            ))),
            None => Err(EmitError::invalid_argument("vector requires a layout")),
        }
    }

    /// Constant elements stored through the active context.
    pub fn constant<T: Element>(values: Vec<T>) -> EmitResult<Self> {
        Self::new(active::store_constant_data(T::into_constant_data(values))?)
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    #[inline]
    pub fn ty(&self) -> ValueType {
        self.value.base_type()
    }

    pub fn len(&self) -> usize {
        self.value.layout_opt().map_or(0, MemoryLayout::num_elements)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View of the element at `index`.
    pub fn at(&self, index: &Scalar) -> EmitResult<Scalar> {
        Scalar::new(active::offset_coordinates(&self.value, std::slice::from_ref(index))?)
    }
}

impl Elementwise for Vector {
    fn as_value(&self) -> &Value {
        &self.value
    }

    fn from_value(value: Value) -> EmitResult<Self> {
        Vector::new(value)
    }
}

impl From<Vector> for Value {
    fn from(vector: Vector) -> Self {
        vector.value
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
