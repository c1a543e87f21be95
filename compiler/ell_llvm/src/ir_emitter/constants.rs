//! Literal and module-level constant construction.

use ell_value::{EmitError, EmitResult, ValueType};
use inkwell::module::Linkage;
use inkwell::types::BasicTypeEnum;
use inkwell::values::BasicValueEnum;
use tracing::trace;

use super::IrEmitter;
use crate::value_id::ValueId;

impl<'ctx> IrEmitter<'ctx> {
    #[inline]
    pub fn literal_bool(&mut self, value: bool) -> ValueId {
        let v = self.context.bool_type().const_int(u64::from(value), false);
        self.arena.push_value(v.into())
    }

    /// Unsigned 8-bit literal, for `Byte` data.
    #[inline]
    pub fn literal_u8(&mut self, value: u8) -> ValueId {
        let v = self.context.i8_type().const_int(u64::from(value), false);
        self.arena.push_value(v.into())
    }

    #[inline]
    pub fn literal_i8(&mut self, value: i8) -> ValueId {
        let v = self.context.i8_type().const_int(value as u64, value < 0);
        self.arena.push_value(v.into())
    }

    #[inline]
    pub fn literal_i16(&mut self, value: i16) -> ValueId {
        let v = self.context.i16_type().const_int(value as u64, value < 0);
        self.arena.push_value(v.into())
    }

    #[inline]
    pub fn literal_i32(&mut self, value: i32) -> ValueId {
        let v = self.context.i32_type().const_int(value as u64, value < 0);
        self.arena.push_value(v.into())
    }

    #[inline]
    pub fn literal_i64(&mut self, value: i64) -> ValueId {
        let v = self.context.i64_type().const_int(value as u64, value < 0);
        self.arena.push_value(v.into())
    }

    #[inline]
    pub fn literal_f64(&mut self, value: f64) -> ValueId {
        let v = self.context.f64_type().const_float(value);
        self.arena.push_value(v.into())
    }

    /// Pointer to a null-terminated private string constant.
    ///
    /// Literals are interned by content: the same string always yields the
    /// same id within one emitter.
    pub fn literal_str(&mut self, value: &str) -> ValueId {
        if let Some(&id) = self.string_literals.get(value) {
            return id;
        }
        let bytes = self.context.const_string(value.as_bytes(), true);
        let global = self.module.add_global(bytes.get_type(), None, ".str");
        global.set_initializer(&bytes);
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);
        trace!(len = value.len(), "interned string literal");

        let id = self.arena.push_value(global.as_pointer_value().into());
        self.string_literals.insert(value.to_string(), id);
        id
    }

    /// Pointer to a named, null-terminated internal string constant.
    pub fn global_string(&mut self, name: &str, value: &str) -> ValueId {
        let bytes = self.context.const_string(value.as_bytes(), true);
        let global = self.module.add_global(bytes.get_type(), None, name);
        global.set_initializer(&bytes);
        global.set_constant(true);
        global.set_linkage(Linkage::Internal);
        self.arena.push_value(global.as_pointer_value().into())
    }

    /// Zero of a storable value type.
    pub fn zero(&mut self, ty: ValueType) -> EmitResult<ValueId> {
        let v: BasicValueEnum<'ctx> = match self.basic_type(ty)? {
            BasicTypeEnum::IntType(t) => t.const_zero().into(),
            BasicTypeEnum::FloatType(t) => t.const_zero().into(),
            BasicTypeEnum::PointerType(t) => t.const_null().into(),
            other => {
                return Err(EmitError::InvalidValueType(format!(
                    "no zero constant for {other:?}"
                )))
            }
        };
        Ok(self.arena.push_value(v))
    }
}
