//! Arithmetic, comparison, and selection.

use ell_value::{EmitError, EmitResult};
use inkwell::values::{BasicValueEnum, FloatValue, IntValue};

use super::{backend, IrEmitter};
use crate::operators::{ComparisonType, OperatorType};
use crate::value_id::ValueId;

impl<'ctx> IrEmitter<'ctx> {
    /// `lhs op rhs`. Integer operators take integer operands and the `F`
    /// operators take doubles.
    pub fn binary_op(&mut self, op: OperatorType, lhs: ValueId, rhs: ValueId) -> EmitResult<ValueId> {
        let v: BasicValueEnum<'ctx> = if op.is_float() {
            let (l, r) = self.float_operands(lhs, rhs, "operator")?;
            let b = &self.builder;
            match op {
                OperatorType::AddF => b.build_float_add(l, r, "fadd"),
                OperatorType::SubtractF => b.build_float_sub(l, r, "fsub"),
                OperatorType::MultiplyF => b.build_float_mul(l, r, "fmul"),
                OperatorType::DivideF => b.build_float_div(l, r, "fdiv"),
                OperatorType::ModF => b.build_float_rem(l, r, "frem"),
                OperatorType::Add
                | OperatorType::Subtract
                | OperatorType::Multiply
                | OperatorType::DivideS
                | OperatorType::ModS
                | OperatorType::DivideU
                | OperatorType::ModU => return Err(unclassified(op)),
            }
            .map_err(backend)?
            .into()
        } else {
            let (l, r) = self.int_operands(lhs, rhs, "operator")?;
            let b = &self.builder;
            match op {
                OperatorType::Add => b.build_int_add(l, r, "add"),
                OperatorType::Subtract => b.build_int_sub(l, r, "sub"),
                OperatorType::Multiply => b.build_int_mul(l, r, "mul"),
                OperatorType::DivideS => b.build_int_signed_div(l, r, "sdiv"),
                OperatorType::ModS => b.build_int_signed_rem(l, r, "srem"),
                OperatorType::DivideU => b.build_int_unsigned_div(l, r, "udiv"),
                OperatorType::ModU => b.build_int_unsigned_rem(l, r, "urem"),
                OperatorType::AddF
                | OperatorType::SubtractF
                | OperatorType::MultiplyF
                | OperatorType::DivideF
                | OperatorType::ModF => return Err(unclassified(op)),
            }
            .map_err(backend)?
            .into()
        };
        Ok(self.arena.push_value(v))
    }

    /// `lhs cmp rhs` as an `i1`.
    pub fn cmp(&mut self, cmp: ComparisonType, lhs: ValueId, rhs: ValueId) -> EmitResult<ValueId> {
        let built = if let Some(predicate) = cmp.float_predicate() {
            let (l, r) = self.float_operands(lhs, rhs, "comparison")?;
            self.builder.build_float_compare(predicate, l, r, "fcmp")
        } else if let Some(predicate) = cmp.int_predicate() {
            let (l, r) = self.int_operands(lhs, rhs, "comparison")?;
            self.builder.build_int_compare(predicate, l, r, "icmp")
        } else {
            return Err(EmitError::InvalidComparisonType(format!("{cmp:?}")));
        };
        let v = built.map_err(backend)?;
        Ok(self.arena.push_value(v.into()))
    }

    /// Bitwise complement; logical negation on `i1`.
    pub fn not(&mut self, value: ValueId) -> EmitResult<ValueId> {
        let raw = self.arena.value(value);
        if !raw.is_int_value() {
            return Err(EmitError::invalid_argument("`not` requires an integer operand"));
        }
        let v = self
            .builder
            .build_not(raw.into_int_value(), "not")
            .map_err(backend)?;
        Ok(self.arena.push_value(v.into()))
    }

    /// `cond ? then_value : else_value`.
    pub fn select(
        &mut self,
        cond: ValueId,
        then_value: ValueId,
        else_value: ValueId,
    ) -> EmitResult<ValueId> {
        let raw = self.arena.value(cond);
        if !raw.is_int_value() {
            return Err(EmitError::invalid_argument("`select` condition must be an i1"));
        }
        let (t, e) = (self.arena.value(then_value), self.arena.value(else_value));
        if t.get_type() != e.get_type() {
            return Err(EmitError::invalid_argument("`select` arms differ in type"));
        }
        let v = self
            .builder
            .build_select(raw.into_int_value(), t, e, "select")
            .map_err(backend)?;
        Ok(self.arena.push_value(v))
    }

    fn int_operands(
        &self,
        lhs: ValueId,
        rhs: ValueId,
        what: &str,
    ) -> EmitResult<(IntValue<'ctx>, IntValue<'ctx>)> {
        match (self.arena.value(lhs), self.arena.value(rhs)) {
            (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r))
                if l.get_type() == r.get_type() =>
            {
                Ok((l, r))
            }
            (l, r) => Err(EmitError::invalid_argument(format!(
                "integer {what} applied to {:?} and {:?}",
                l.get_type(),
                r.get_type()
            ))),
        }
    }

    fn float_operands(
        &self,
        lhs: ValueId,
        rhs: ValueId,
        what: &str,
    ) -> EmitResult<(FloatValue<'ctx>, FloatValue<'ctx>)> {
        match (self.arena.value(lhs), self.arena.value(rhs)) {
            (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => Ok((l, r)),
            (l, r) => Err(EmitError::invalid_argument(format!(
                "floating-point {what} applied to {:?} and {:?}",
                l.get_type(),
                r.get_type()
            ))),
        }
    }
}

fn unclassified(op: OperatorType) -> EmitError {
    EmitError::InvalidOperatorType(format!("{op:?} is not classified by `is_float`"))
}
