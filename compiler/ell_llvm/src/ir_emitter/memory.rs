//! Stack and module storage, loads, stores, and address arithmetic.

use ell_value::{ConstantData, EmitError, EmitResult, ValueType};
use inkwell::module::Linkage;
use inkwell::types::{BasicType, BasicTypeEnum};
use inkwell::values::{BasicValueEnum, IntValue, PointerValue};

use super::{backend, IrEmitter};
use crate::value_id::ValueId;

impl<'ctx> IrEmitter<'ctx> {
    /// Stack slot for one `ty` in the current function's entry block.
    pub fn variable(&mut self, ty: ValueType, name: &str) -> EmitResult<ValueId> {
        let llvm_ty = self.basic_type(ty)?;
        self.variable_of(llvm_ty, name)
    }

    /// [`IrEmitter::variable`] for an arbitrary LLVM type.
    pub fn variable_of(&mut self, ty: BasicTypeEnum<'ctx>, name: &str) -> EmitResult<ValueId> {
        let ptr = self.entry_stack_alloc(ty, None, name)?;
        Ok(self.arena.push_value(ptr.into()))
    }

    /// Stack array of `count` `ty` elements in the entry block.
    pub fn stack_alloc(&mut self, ty: ValueType, count: usize) -> EmitResult<ValueId> {
        let llvm_ty = self.basic_type(ty)?;
        let count = u64::try_from(count)
            .map_err(|_| EmitError::invalid_argument(format!("stack array of {count} elements")))?;
        let len = self.context.i64_type().const_int(count, false);
        let ptr = self.entry_stack_alloc(llvm_ty, Some(len), "array")?;
        Ok(self.arena.push_value(ptr.into()))
    }

    /// Alloca at the start of the current function's entry block.
    ///
    /// Entry-block allocas are promotable by `mem2reg` and are not
    /// re-executed inside loops. The insertion point is restored afterwards.
    pub fn entry_stack_alloc(
        &mut self,
        ty: BasicTypeEnum<'ctx>,
        count: Option<IntValue<'ctx>>,
        name: &str,
    ) -> EmitResult<PointerValue<'ctx>> {
        let function = self
            .current_function
            .ok_or_else(|| EmitError::illegal_state("stack allocation outside a function"))?;
        let entry = self
            .arena
            .function(function)
            .get_first_basic_block()
            .ok_or_else(|| EmitError::illegal_state("function has no entry block"))?;

        let saved_block = self.current_block;
        match entry.get_first_instruction() {
            Some(first) => self.builder.position_before(&first),
            None => self.builder.position_at_end(entry),
        }

        let ptr = match count {
            Some(len) => self.builder.build_array_alloca(ty, len, name),
            None => self.builder.build_alloca(ty, name),
        };

        if let Some(block) = saved_block {
            self.builder.position_at_end(self.arena.block(block));
        }
        ptr.map_err(backend)
    }

    /// Load one `ty` through `ptr`.
    pub fn load(&mut self, ty: ValueType, ptr: ValueId) -> EmitResult<ValueId> {
        let llvm_ty = self.basic_type(ty)?;
        let ptr = self.pointer(ptr, "load")?;
        let v = self.builder.build_load(llvm_ty, ptr, "load").map_err(backend)?;
        Ok(self.arena.push_value(v))
    }

    pub fn store(&mut self, value: ValueId, ptr: ValueId) -> EmitResult<()> {
        let v = self.arena.value(value);
        let ptr = self.pointer(ptr, "store")?;
        self.builder.build_store(ptr, v).map_err(backend)?;
        Ok(())
    }

    /// Address of element `index` in an array of `ty` at `ptr`.
    #[allow(
        unsafe_code,
        reason = "LLVM C API requires unsafe for build_in_bounds_gep"
    )]
    pub fn gep(&mut self, ty: ValueType, ptr: ValueId, index: ValueId) -> EmitResult<ValueId> {
        let llvm_ty = self.basic_type(ty)?;
        let base = self.pointer(ptr, "gep")?;
        let raw = self.arena.value(index);
        if !raw.is_int_value() {
            return Err(EmitError::invalid_argument("gep index must be an integer"));
        }
        // SAFETY: a single integer index on a typed element pointer. Indices
        // are checked against the value's layout before reaching here.
        let v = unsafe {
            self.builder
                .build_in_bounds_gep(llvm_ty, base, &[raw.into_int_value()], "gep")
        }
        .map_err(backend)?;
        Ok(self.arena.push_value(v.into()))
    }

    /// Copy `count` elements of `ty` from `source` to `destination`.
    pub fn memcpy(
        &mut self,
        ty: ValueType,
        source: ValueId,
        destination: ValueId,
        count: usize,
    ) -> EmitResult<()> {
        let bytes = count * ty.base().size_in_bytes();
        let bytes = u64::try_from(bytes)
            .map_err(|_| EmitError::invalid_argument(format!("copy of {bytes} bytes")))?;
        let src = self.pointer(source, "memcpy")?;
        let dst = self.pointer(destination, "memcpy")?;
        let size = self.context.i64_type().const_int(bytes, false);
        let align = alignment(ty);
        self.builder
            .build_memcpy(dst, align, src, align, size)
            .map_err(backend)?;
        Ok(())
    }

    /// Zero-initialized internal array of `count` `ty` elements.
    pub fn global_array(&mut self, name: &str, ty: ValueType, count: usize) -> EmitResult<ValueId> {
        let array_ty = self.array_type(ty, count)?;
        let global = self.module.add_global(array_ty, None, name);
        global.set_initializer(&array_ty.const_zero());
        global.set_linkage(Linkage::Internal);
        Ok(self.arena.push_value(global.as_pointer_value().into()))
    }

    /// Private constant array holding `data`.
    pub fn constant_array(&mut self, name: &str, data: &ConstantData) -> EmitResult<ValueId> {
        let initializer = self.const_elements(data);
        let global = self.module.add_global(initializer.get_type(), None, name);
        global.set_initializer(&initializer);
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);
        Ok(self.arena.push_value(global.as_pointer_value().into()))
    }

    /// Literal for element `index` of `data`.
    pub fn literal_element(&mut self, data: &ConstantData, index: usize) -> EmitResult<ValueId> {
        let out_of_range = || {
            EmitError::invalid_argument(format!(
                "element {index} of {}-element constant",
                data.len()
            ))
        };
        Ok(match data {
            ConstantData::Boolean(v) => self.literal_bool(*v.get(index).ok_or_else(out_of_range)?),
            ConstantData::Byte(v) => self.literal_u8(*v.get(index).ok_or_else(out_of_range)?),
            ConstantData::Char8(v) => self.literal_i8(*v.get(index).ok_or_else(out_of_range)?),
            ConstantData::Short(v) => self.literal_i16(*v.get(index).ok_or_else(out_of_range)?),
            ConstantData::Int32(v) => self.literal_i32(*v.get(index).ok_or_else(out_of_range)?),
            ConstantData::Int64(v) => self.literal_i64(*v.get(index).ok_or_else(out_of_range)?),
            ConstantData::Double(v) => self.literal_f64(*v.get(index).ok_or_else(out_of_range)?),
        })
    }

    fn array_type(&self, ty: ValueType, count: usize) -> EmitResult<inkwell::types::ArrayType<'ctx>> {
        let len = u32::try_from(count)
            .map_err(|_| EmitError::invalid_argument(format!("array of {count} elements")))?;
        Ok(self.basic_type(ty)?.array_type(len))
    }

    fn const_elements(&self, data: &ConstantData) -> BasicValueEnum<'ctx> {
        let c = self.context;
        let ints = |ty: inkwell::types::IntType<'ctx>, bits: Vec<(u64, bool)>| {
            let values: Vec<_> = bits.into_iter().map(|(b, s)| ty.const_int(b, s)).collect();
            ty.const_array(&values)
        };
        let array = match data {
            ConstantData::Boolean(v) => {
                ints(c.bool_type(), v.iter().map(|&b| (u64::from(b), false)).collect())
            }
            ConstantData::Byte(v) => ints(c.i8_type(), v.iter().map(|&b| (u64::from(b), false)).collect()),
            ConstantData::Char8(v) => ints(c.i8_type(), v.iter().map(|&b| (b as u64, b < 0)).collect()),
            ConstantData::Short(v) => ints(c.i16_type(), v.iter().map(|&b| (b as u64, b < 0)).collect()),
            ConstantData::Int32(v) => ints(c.i32_type(), v.iter().map(|&b| (b as u64, b < 0)).collect()),
            ConstantData::Int64(v) => ints(c.i64_type(), v.iter().map(|&b| (b as u64, b < 0)).collect()),
            ConstantData::Double(v) => {
                let f64_ty = c.f64_type();
                let values: Vec<_> = v.iter().map(|&x| f64_ty.const_float(x)).collect();
                f64_ty.const_array(&values)
            }
        };
        array.into()
    }

    fn pointer(&self, id: ValueId, what: &str) -> EmitResult<PointerValue<'ctx>> {
        match self.arena.value(id) {
            BasicValueEnum::PointerValue(p) => Ok(p),
            other => Err(EmitError::invalid_argument(format!(
                "{what} through non-pointer {:?}",
                other.get_type()
            ))),
        }
    }
}

/// Natural alignment of one element.
fn alignment(ty: ValueType) -> u32 {
    match ty.base().size_in_bytes() {
        0 => 1,
        n => u32::try_from(n).unwrap_or(8),
    }
}
