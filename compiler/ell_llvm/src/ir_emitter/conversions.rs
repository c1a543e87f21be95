//! Bit casts and numeric conversions.

use ell_value::{EmitError, EmitResult, ValueType};
use inkwell::types::BasicTypeEnum;
use inkwell::values::BasicValueEnum;
use inkwell::{FloatPredicate, IntPredicate};

use super::{backend, IrEmitter};
use crate::value_id::ValueId;

impl<'ctx> IrEmitter<'ctx> {
    /// Reinterpret `value` as `ty` without changing its bits.
    ///
    /// Pointers cast to pointers; everything else needs equal bit widths.
    pub fn cast(&mut self, value: ValueId, ty: ValueType) -> EmitResult<ValueId> {
        let raw = self.arena.value(value);
        let target = self.basic_type(ty)?;
        if raw.get_type() == target {
            return Ok(value);
        }
        let compatible = match (bit_width(raw.get_type()), bit_width(target)) {
            (None, None) => true,
            (Some(from), Some(to)) => from == to,
            _ => false,
        };
        if !compatible {
            return Err(EmitError::invalid_argument(format!(
                "cannot bitcast {:?} to {ty}",
                raw.get_type()
            )));
        }
        let v = self
            .builder
            .build_bit_cast(raw, target, "bitcast")
            .map_err(backend)?;
        Ok(self.arena.push_value(v))
    }

    /// Numeric conversion of `value`, held as `from`, to `to`.
    ///
    /// Conversions to `Boolean` test against zero. `Boolean` and `Byte`
    /// widen as unsigned, other integers as signed. Doubles truncate toward
    /// zero.
    pub fn convert(&mut self, value: ValueId, from: ValueType, to: ValueType) -> EmitResult<ValueId> {
        let (from, to) = (from.base(), to.base());
        if from == to {
            return Ok(value);
        }
        if to == ValueType::Boolean {
            return self.nonzero(value);
        }
        let raw = self.arena.value(value);
        let v: BasicValueEnum<'ctx> = match (raw, self.basic_type(to)?) {
            (BasicValueEnum::IntValue(v), BasicTypeEnum::IntType(t)) => {
                let (width, target) = (v.get_type().get_bit_width(), t.get_bit_width());
                let b = &self.builder;
                let built = if width > target {
                    b.build_int_truncate(v, t, "trunc")
                } else if width == target {
                    Ok(v)
                } else if is_unsigned(from) {
                    b.build_int_z_extend(v, t, "zext")
                } else {
                    b.build_int_s_extend(v, t, "sext")
                };
                built.map_err(backend)?.into()
            }
            (BasicValueEnum::IntValue(v), BasicTypeEnum::FloatType(t)) => {
                let built = if is_unsigned(from) {
                    self.builder.build_unsigned_int_to_float(v, t, "uitofp")
                } else {
                    self.builder.build_signed_int_to_float(v, t, "sitofp")
                };
                built.map_err(backend)?.into()
            }
            (BasicValueEnum::FloatValue(v), BasicTypeEnum::IntType(t)) => {
                let built = if is_unsigned(to) {
                    self.builder.build_float_to_unsigned_int(v, t, "fptoui")
                } else {
                    self.builder.build_float_to_signed_int(v, t, "fptosi")
                };
                built.map_err(backend)?.into()
            }
            (v, t) => {
                return Err(EmitError::invalid_argument(format!(
                    "no numeric conversion from {:?} to {t:?}",
                    v.get_type()
                )))
            }
        };
        Ok(self.arena.push_value(v))
    }

    /// `value != 0` as an `i1`.
    fn nonzero(&mut self, value: ValueId) -> EmitResult<ValueId> {
        let built = match self.arena.value(value) {
            BasicValueEnum::IntValue(v) => self.builder.build_int_compare(
                IntPredicate::NE,
                v,
                v.get_type().const_zero(),
                "tobool",
            ),
            BasicValueEnum::FloatValue(v) => self.builder.build_float_compare(
                FloatPredicate::UNE,
                v,
                v.get_type().const_zero(),
                "tobool",
            ),
            other => {
                return Err(EmitError::invalid_argument(format!(
                    "no boolean conversion from {:?}",
                    other.get_type()
                )))
            }
        };
        let v = built.map_err(backend)?;
        Ok(self.arena.push_value(v.into()))
    }
}

fn is_unsigned(ty: ValueType) -> bool {
    matches!(ty, ValueType::Boolean | ValueType::Byte)
}

/// Bit width of a first-class type; `None` for pointers.
fn bit_width(ty: BasicTypeEnum<'_>) -> Option<u32> {
    match ty {
        BasicTypeEnum::IntType(t) => Some(t.get_bit_width()),
        BasicTypeEnum::PointerType(_) => None,
        // Doubles are the only float type emitted.
        BasicTypeEnum::FloatType(_) => Some(64),
        _ => Some(0),
    }
}
