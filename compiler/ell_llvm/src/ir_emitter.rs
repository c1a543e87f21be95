//! Id-based LLVM instruction emitter.
//!
//! `IrEmitter` wraps one inkwell `Builder` and one `Module`, stores every
//! LLVM object it creates in a `ValueArena`, and hands out only `Copy` ids.
//! The `'ctx` lifetime stays inside this struct.
//!
//! # Method Organization
//!
//! | Category | Methods |
//! |----------|---------|
//! | Types | `ty`, `basic_type`, `pointer_to` |
//! | Constants | `literal_bool`, `literal_i32`, `literal_f64`, `literal_str`, `global_string`, `zero` |
//! | Arithmetic | `binary_op`, `cmp`, `not`, `select` |
//! | Conversions | `cast`, `convert` |
//! | Control flow | `block`, `block_after`, `branch`, `branch_if`, `phi`, `return_value` |
//! | Functions | `declare_function`, `function_named`, `call`, `param` |
//! | Memory | `variable`, `entry_stack_alloc`, `load`, `store`, `gep`, `memcpy` |
//! | Intrinsics | `intrinsic` |
//!
//! Every builder failure surfaces as [`EmitError::Backend`]. Nothing already
//! emitted is rolled back.

mod arithmetic;
mod constants;
mod control_flow;
mod conversions;
mod functions;
mod intrinsics;
mod memory;

use std::fmt::Display;

use ell_value::{EmitError, EmitResult, ValueType};
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{AnyTypeEnum, BasicTypeEnum, PointerType};
use inkwell::values::BasicValueEnum;
use inkwell::AddressSpace;
use rustc_hash::FxHashMap;

use crate::value_id::{BlockId, FunctionId, ValueArena, ValueId};

pub use functions::{FunctionLinkage, Position};

/// Id-based LLVM IR emitter over one module.
pub struct IrEmitter<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    arena: ValueArena<'ctx>,
    /// Interned string literals, keyed by content.
    string_literals: FxHashMap<String, ValueId>,
    current_function: Option<FunctionId>,
    current_block: Option<BlockId>,
}

impl<'ctx> IrEmitter<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        Self {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            arena: ValueArena::new(),
            string_literals: FxHashMap::default(),
            current_function: None,
            current_block: None,
        }
    }

    #[inline]
    pub fn context(&self) -> &'ctx Context {
        self.context
    }

    #[inline]
    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    /// The LLVM type for a value type.
    ///
    /// `Void` is LLVM `void`; pointer variants are opaque pointers.
    pub fn ty(&self, ty: ValueType) -> AnyTypeEnum<'ctx> {
        match ty {
            ValueType::Void => self.context.void_type().into(),
            ValueType::Boolean => self.context.bool_type().into(),
            ValueType::Byte | ValueType::Char8 => self.context.i8_type().into(),
            ValueType::Short => self.context.i16_type().into(),
            ValueType::Int32 => self.context.i32_type().into(),
            ValueType::Int64 => self.context.i64_type().into(),
            ValueType::Double => self.context.f64_type().into(),
            ValueType::PVoid
            | ValueType::PBoolean
            | ValueType::PByte
            | ValueType::PChar8
            | ValueType::PShort
            | ValueType::PInt32
            | ValueType::PInt64
            | ValueType::PDouble => self.pointer_to(self.ty(ty.base())).into(),
        }
    }

    /// Pointer to `pointee`. Pointers are opaque, so every pointee yields
    /// the same type.
    pub fn pointer_to(&self, _pointee: AnyTypeEnum<'ctx>) -> PointerType<'ctx> {
        self.context.ptr_type(AddressSpace::default())
    }

    /// The LLVM type of a storable value type.
    pub fn basic_type(&self, ty: ValueType) -> EmitResult<BasicTypeEnum<'ctx>> {
        BasicTypeEnum::try_from(self.ty(ty))
            .map_err(|()| EmitError::InvalidValueType(format!("`{ty}` has no storable LLVM type")))
    }

    /// The function currently receiving instructions.
    #[inline]
    pub fn current_function(&self) -> Option<FunctionId> {
        self.current_function
    }

    #[inline]
    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block
    }

    /// The LLVM value behind an id.
    #[inline]
    pub fn raw_value(&self, id: ValueId) -> BasicValueEnum<'ctx> {
        self.arena.value(id)
    }

    /// Register an externally built LLVM value.
    #[inline]
    pub fn push_value(&mut self, value: BasicValueEnum<'ctx>) -> ValueId {
        self.arena.push_value(value)
    }

    /// Textual IR of the module.
    pub fn print_to_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Run the LLVM verifier over the module.
    pub fn verify(&self) -> EmitResult<()> {
        self.module.verify().map_err(backend)
    }
}

/// Wrap an inkwell failure.
pub(crate) fn backend(err: impl Display) -> EmitError {
    EmitError::Backend(err.to_string())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
