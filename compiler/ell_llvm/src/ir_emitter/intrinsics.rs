//! Lowering of the math intrinsics on single elements.
//!
//! `Double` operands use the LLVM floating-point intrinsics, except `tanh`,
//! which has no LLVM intrinsic and calls the C library. Integer `abs`,
//! `maxnum`, and `minnum` are built from a compare and a select, with
//! unsigned compares for `Byte`.

use ell_value::{EmitError, EmitResult, Intrinsic, ValueType};
use inkwell::intrinsics::Intrinsic as LlvmIntrinsic;
use inkwell::values::{BasicMetadataValueEnum, FunctionValue};
use tracing::trace;

use super::{backend, IrEmitter};
use crate::operators::{ComparisonType, OperandClass, OperatorType};
use crate::value_id::ValueId;

impl<'ctx> IrEmitter<'ctx> {
    /// Apply `intrinsic` to one element of type `ty` (two for `maxnum`,
    /// `minnum`, and `pow`).
    pub fn intrinsic(
        &mut self,
        intrinsic: Intrinsic,
        ty: ValueType,
        args: &[ValueId],
    ) -> EmitResult<ValueId> {
        let arity = if intrinsic.is_unary() { 1 } else { 2 };
        if args.len() != arity {
            return Err(EmitError::invalid_argument(format!(
                "`{intrinsic}` takes {arity} operands, {} given",
                args.len()
            )));
        }
        let ty = ty.base();
        if ty.is_floating_point() {
            let callee = self.float_intrinsic(intrinsic)?;
            return self.call_raw(callee, args);
        }
        if !(ty.is_integral() && intrinsic.accepts_integral()) {
            return Err(EmitError::TypeMismatch {
                expected: ValueType::Double,
                found: ty,
            });
        }
        let unsigned = OperandClass::of(ty) == OperandClass::Unsigned;
        let (less, greater) = if unsigned {
            (ComparisonType::LtU, ComparisonType::GtU)
        } else {
            (ComparisonType::Lt, ComparisonType::Gt)
        };
        match intrinsic {
            // Unsigned values are their own magnitude.
            Intrinsic::Abs if unsigned => Ok(args[0]),
            Intrinsic::Abs => {
                let zero = self.zero(ty)?;
                let negative = self.cmp(less, args[0], zero)?;
                let negated = self.binary_op(OperatorType::Subtract, zero, args[0])?;
                self.select(negative, negated, args[0])
            }
            Intrinsic::MaxNum => {
                let is_greater = self.cmp(greater, args[0], args[1])?;
                self.select(is_greater, args[0], args[1])
            }
            Intrinsic::MinNum => {
                let is_less = self.cmp(less, args[0], args[1])?;
                self.select(is_less, args[0], args[1])
            }
            Intrinsic::Cos
            | Intrinsic::Exp
            | Intrinsic::Log
            | Intrinsic::Pow
            | Intrinsic::Sin
            | Intrinsic::Sqrt
            | Intrinsic::Tanh => Err(EmitError::TypeMismatch {
                expected: ValueType::Double,
                found: ty,
            }),
        }
    }

    fn float_intrinsic(&mut self, intrinsic: Intrinsic) -> EmitResult<FunctionValue<'ctx>> {
        let name = match intrinsic {
            Intrinsic::Tanh => {
                let id = self.declare_function("tanh", ValueType::Double, &[ValueType::Double])?;
                return Ok(self.arena.function(id));
            }
            Intrinsic::Abs => "llvm.fabs",
            Intrinsic::Cos => "llvm.cos",
            Intrinsic::Exp => "llvm.exp",
            Intrinsic::Log => "llvm.log",
            Intrinsic::MaxNum => "llvm.maxnum",
            Intrinsic::MinNum => "llvm.minnum",
            Intrinsic::Pow => "llvm.pow",
            Intrinsic::Sin => "llvm.sin",
            Intrinsic::Sqrt => "llvm.sqrt",
        };
        trace!(name, "float intrinsic");
        let f64_ty = self.context.f64_type();
        LlvmIntrinsic::find(name)
            .and_then(|i| i.get_declaration(&self.module, &[f64_ty.into()]))
            .ok_or_else(|| EmitError::Backend(format!("LLVM has no intrinsic `{name}`")))
    }

    fn call_raw(&mut self, callee: FunctionValue<'ctx>, args: &[ValueId]) -> EmitResult<ValueId> {
        let arg_vals: Vec<BasicMetadataValueEnum<'ctx>> =
            args.iter().map(|&id| self.arena.value(id).into()).collect();
        let call = self
            .builder
            .build_call(callee, &arg_vals, "intrinsic")
            .map_err(backend)?;
        call.try_as_basic_value()
            .basic()
            .map(|v| self.arena.push_value(v))
            .ok_or_else(|| EmitError::Backend("intrinsic call produced no value".to_string()))
    }
}
