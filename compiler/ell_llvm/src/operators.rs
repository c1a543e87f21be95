//! Low-level operator and comparison tags.
//!
//! Integer forms come in signed and unsigned variants: `Boolean` and `Byte`
//! operands are unsigned, the other integer kinds signed. The `F` forms
//! operate on doubles. Float comparisons are ordered except `NeqF`, which
//! is true when either side is NaN.

use ell_value::{EmitError, ValueBinaryOperation, ValueLogicalOperation, ValueType};
use inkwell::{FloatPredicate, IntPredicate};

/// How an element kind takes part in arithmetic and comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandClass {
    Signed,
    Unsigned,
    Float,
}

impl OperandClass {
    /// The class of `ty`'s base kind. `Void` has no arithmetic and is
    /// classed as signed; the emitter rejects it on type grounds.
    pub const fn of(ty: ValueType) -> Self {
        match ty {
            ValueType::Boolean | ValueType::PBoolean | ValueType::Byte | ValueType::PByte => {
                OperandClass::Unsigned
            }
            ValueType::Double | ValueType::PDouble => OperandClass::Float,
            ValueType::Void
            | ValueType::PVoid
            | ValueType::Char8
            | ValueType::PChar8
            | ValueType::Short
            | ValueType::PShort
            | ValueType::Int32
            | ValueType::PInt32
            | ValueType::Int64
            | ValueType::PInt64 => OperandClass::Signed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorType {
    Add,
    Subtract,
    Multiply,
    DivideS,
    ModS,
    AddF,
    SubtractF,
    MultiplyF,
    DivideF,
    ModF,
    DivideU,
    ModU,
}

impl OperatorType {
    const ALL: [OperatorType; 12] = [
        OperatorType::Add,
        OperatorType::Subtract,
        OperatorType::Multiply,
        OperatorType::DivideS,
        OperatorType::ModS,
        OperatorType::AddF,
        OperatorType::SubtractF,
        OperatorType::MultiplyF,
        OperatorType::DivideF,
        OperatorType::ModF,
        OperatorType::DivideU,
        OperatorType::ModU,
    ];

    #[inline]
    pub const fn is_float(self) -> bool {
        match self {
            OperatorType::AddF
            | OperatorType::SubtractF
            | OperatorType::MultiplyF
            | OperatorType::DivideF
            | OperatorType::ModF => true,
            OperatorType::Add
            | OperatorType::Subtract
            | OperatorType::Multiply
            | OperatorType::DivideS
            | OperatorType::ModS
            | OperatorType::DivideU
            | OperatorType::ModU => false,
        }
    }

    /// The low-level operator for an emitter-level operation on elements of
    /// type `ty`.
    pub const fn for_operation(op: ValueBinaryOperation, ty: ValueType) -> Self {
        match (op, OperandClass::of(ty)) {
            (ValueBinaryOperation::Add, OperandClass::Signed | OperandClass::Unsigned) => {
                OperatorType::Add
            }
            (ValueBinaryOperation::Subtract, OperandClass::Signed | OperandClass::Unsigned) => {
                OperatorType::Subtract
            }
            (ValueBinaryOperation::Multiply, OperandClass::Signed | OperandClass::Unsigned) => {
                OperatorType::Multiply
            }
            (ValueBinaryOperation::Divide, OperandClass::Signed) => OperatorType::DivideS,
            (ValueBinaryOperation::Modulus, OperandClass::Signed) => OperatorType::ModS,
            (ValueBinaryOperation::Divide, OperandClass::Unsigned) => OperatorType::DivideU,
            (ValueBinaryOperation::Modulus, OperandClass::Unsigned) => OperatorType::ModU,
            (ValueBinaryOperation::Add, OperandClass::Float) => OperatorType::AddF,
            (ValueBinaryOperation::Subtract, OperandClass::Float) => OperatorType::SubtractF,
            (ValueBinaryOperation::Multiply, OperandClass::Float) => OperatorType::MultiplyF,
            (ValueBinaryOperation::Divide, OperandClass::Float) => OperatorType::DivideF,
            (ValueBinaryOperation::Modulus, OperandClass::Float) => OperatorType::ModF,
        }
    }
}

impl TryFrom<u8> for OperatorType {
    type Error = EmitError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        OperatorType::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or_else(|| EmitError::InvalidOperatorType(format!("unknown operator tag {tag}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonType {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    EqF,
    NeqF,
    LtF,
    LteF,
    GtF,
    GteF,
    LtU,
    LteU,
    GtU,
    GteU,
}

impl ComparisonType {
    const ALL: [ComparisonType; 16] = [
        ComparisonType::Eq,
        ComparisonType::Neq,
        ComparisonType::Lt,
        ComparisonType::Lte,
        ComparisonType::Gt,
        ComparisonType::Gte,
        ComparisonType::EqF,
        ComparisonType::NeqF,
        ComparisonType::LtF,
        ComparisonType::LteF,
        ComparisonType::GtF,
        ComparisonType::GteF,
        ComparisonType::LtU,
        ComparisonType::LteU,
        ComparisonType::GtU,
        ComparisonType::GteU,
    ];

    #[inline]
    pub const fn is_float(self) -> bool {
        self.float_predicate().is_some()
    }

    /// Equality does not depend on signedness, so both integer classes share
    /// `Eq` and `Neq`.
    pub const fn for_operation(op: ValueLogicalOperation, ty: ValueType) -> Self {
        match (op, OperandClass::of(ty)) {
            (ValueLogicalOperation::Equality, OperandClass::Signed | OperandClass::Unsigned) => {
                ComparisonType::Eq
            }
            (ValueLogicalOperation::Inequality, OperandClass::Signed | OperandClass::Unsigned) => {
                ComparisonType::Neq
            }
            (ValueLogicalOperation::LessThan, OperandClass::Signed) => ComparisonType::Lt,
            (ValueLogicalOperation::LessThanOrEqual, OperandClass::Signed) => ComparisonType::Lte,
            (ValueLogicalOperation::GreaterThan, OperandClass::Signed) => ComparisonType::Gt,
            (ValueLogicalOperation::GreaterThanOrEqual, OperandClass::Signed) => ComparisonType::Gte,
            (ValueLogicalOperation::LessThan, OperandClass::Unsigned) => ComparisonType::LtU,
            (ValueLogicalOperation::LessThanOrEqual, OperandClass::Unsigned) => {
                ComparisonType::LteU
            }
            (ValueLogicalOperation::GreaterThan, OperandClass::Unsigned) => ComparisonType::GtU,
            (ValueLogicalOperation::GreaterThanOrEqual, OperandClass::Unsigned) => {
                ComparisonType::GteU
            }
            (ValueLogicalOperation::Equality, OperandClass::Float) => ComparisonType::EqF,
            (ValueLogicalOperation::Inequality, OperandClass::Float) => ComparisonType::NeqF,
            (ValueLogicalOperation::LessThan, OperandClass::Float) => ComparisonType::LtF,
            (ValueLogicalOperation::LessThanOrEqual, OperandClass::Float) => ComparisonType::LteF,
            (ValueLogicalOperation::GreaterThan, OperandClass::Float) => ComparisonType::GtF,
            (ValueLogicalOperation::GreaterThanOrEqual, OperandClass::Float) => {
                ComparisonType::GteF
            }
        }
    }

    /// Integer predicate; `None` for float comparisons.
    pub(crate) const fn int_predicate(self) -> Option<IntPredicate> {
        match self {
            ComparisonType::Eq => Some(IntPredicate::EQ),
            ComparisonType::Neq => Some(IntPredicate::NE),
            ComparisonType::Lt => Some(IntPredicate::SLT),
            ComparisonType::Lte => Some(IntPredicate::SLE),
            ComparisonType::Gt => Some(IntPredicate::SGT),
            ComparisonType::Gte => Some(IntPredicate::SGE),
            ComparisonType::LtU => Some(IntPredicate::ULT),
            ComparisonType::LteU => Some(IntPredicate::ULE),
            ComparisonType::GtU => Some(IntPredicate::UGT),
            ComparisonType::GteU => Some(IntPredicate::UGE),
            ComparisonType::EqF
            | ComparisonType::NeqF
            | ComparisonType::LtF
            | ComparisonType::LteF
            | ComparisonType::GtF
            | ComparisonType::GteF => None,
        }
    }

    /// Float predicate; `None` for integer comparisons.
    pub(crate) const fn float_predicate(self) -> Option<FloatPredicate> {
        match self {
            ComparisonType::EqF => Some(FloatPredicate::OEQ),
            ComparisonType::NeqF => Some(FloatPredicate::UNE),
            ComparisonType::LtF => Some(FloatPredicate::OLT),
            ComparisonType::LteF => Some(FloatPredicate::OLE),
            ComparisonType::GtF => Some(FloatPredicate::OGT),
            ComparisonType::GteF => Some(FloatPredicate::OGE),
            ComparisonType::Eq
            | ComparisonType::Neq
            | ComparisonType::Lt
            | ComparisonType::Lte
            | ComparisonType::Gt
            | ComparisonType::Gte
            | ComparisonType::LtU
            | ComparisonType::LteU
            | ComparisonType::GtU
            | ComparisonType::GteU => None,
        }
    }
}

impl TryFrom<u8> for ComparisonType {
    type Error = EmitError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        ComparisonType::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or_else(|| {
                EmitError::InvalidComparisonType(format!("unknown comparison tag {tag}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operator_tags() {
        assert_eq!(OperatorType::try_from(0), Ok(OperatorType::Add));
        assert_eq!(OperatorType::try_from(9), Ok(OperatorType::ModF));
        assert_eq!(OperatorType::try_from(11), Ok(OperatorType::ModU));
        assert!(matches!(
            OperatorType::try_from(12),
            Err(EmitError::InvalidOperatorType(_))
        ));
    }

    #[test]
    fn comparison_tags() {
        assert_eq!(ComparisonType::try_from(5), Ok(ComparisonType::Gte));
        assert_eq!(ComparisonType::try_from(15), Ok(ComparisonType::GteU));
        assert!(matches!(
            ComparisonType::try_from(200),
            Err(EmitError::InvalidComparisonType(_))
        ));
    }

    #[test]
    fn every_comparison_has_exactly_one_predicate() {
        for cmp in ComparisonType::ALL {
            assert_eq!(cmp.int_predicate().is_some(), cmp.float_predicate().is_none());
        }
    }

    #[test]
    fn operations_map_by_operand_kind() {
        assert_eq!(
            OperatorType::for_operation(ValueBinaryOperation::Divide, ValueType::Int32),
            OperatorType::DivideS
        );
        assert_eq!(
            OperatorType::for_operation(ValueBinaryOperation::Modulus, ValueType::Byte),
            OperatorType::ModU
        );
        let float_mod = OperatorType::for_operation(ValueBinaryOperation::Modulus, ValueType::Double);
        assert!(float_mod.is_float());
        assert_eq!(
            ComparisonType::for_operation(ValueLogicalOperation::LessThan, ValueType::Double),
            ComparisonType::LtF
        );
        assert_eq!(
            ComparisonType::for_operation(ValueLogicalOperation::LessThan, ValueType::Char8),
            ComparisonType::Lt
        );
    }

    #[test]
    fn unsigned_kinds_use_unsigned_predicates() {
        for ty in [ValueType::Boolean, ValueType::Byte, ValueType::PByte] {
            assert_eq!(OperandClass::of(ty), OperandClass::Unsigned);
            let lt = ComparisonType::for_operation(ValueLogicalOperation::LessThan, ty);
            assert_eq!(lt.int_predicate(), Some(IntPredicate::ULT));
            let ge = ComparisonType::for_operation(ValueLogicalOperation::GreaterThanOrEqual, ty);
            assert_eq!(ge.int_predicate(), Some(IntPredicate::UGE));
        }
        let eq = ComparisonType::for_operation(ValueLogicalOperation::Equality, ValueType::Byte);
        assert_eq!(eq, ComparisonType::Eq);
    }

    #[test]
    fn float_inequality_is_unordered() {
        assert_eq!(ComparisonType::NeqF.float_predicate(), Some(FloatPredicate::UNE));
        assert_eq!(ComparisonType::EqF.float_predicate(), Some(FloatPredicate::OEQ));
    }
}
