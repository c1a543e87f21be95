//! Function declaration, definition, and calls.

use ell_value::{EmitError, EmitResult, ValueType};
use inkwell::module::Linkage;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, FunctionType};
use inkwell::values::{BasicMetadataValueEnum, FunctionValue};
use tracing::debug;

use super::{backend, IrEmitter};
use crate::value_id::{BlockId, FunctionId, ValueId};

/// Visibility of an emitted function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FunctionLinkage {
    #[default]
    External,
    Internal,
}

impl From<FunctionLinkage> for Linkage {
    fn from(linkage: FunctionLinkage) -> Self {
        match linkage {
            FunctionLinkage::External => Linkage::External,
            FunctionLinkage::Internal => Linkage::Internal,
        }
    }
}

/// Saved insertion point, see [`IrEmitter::position`].
#[derive(Clone, Copy, Debug)]
pub struct Position {
    function: Option<FunctionId>,
    block: Option<BlockId>,
}

impl<'ctx> IrEmitter<'ctx> {
    /// Declare an external function with unnamed parameters.
    pub fn declare_function(
        &mut self,
        name: &str,
        return_type: ValueType,
        args: &[ValueType],
    ) -> EmitResult<FunctionId> {
        let f = self.get_or_declare(name, return_type, FunctionLinkage::External, args)?;
        Ok(self.arena.push_function(f))
    }

    /// Declare an external function, naming its parameters in order.
    pub fn declare_function_named(
        &mut self,
        name: &str,
        return_type: ValueType,
        args: &[(&str, ValueType)],
    ) -> EmitResult<FunctionId> {
        let types: Vec<ValueType> = args.iter().map(|&(_, ty)| ty).collect();
        let f = self.get_or_declare(name, return_type, FunctionLinkage::External, &types)?;
        bind_names(f, args);
        Ok(self.arena.push_function(f))
    }

    /// Begin the body of `name`: the function gets an entry block and becomes
    /// the insertion point.
    pub fn function(
        &mut self,
        name: &str,
        return_type: ValueType,
        linkage: FunctionLinkage,
        args: &[ValueType],
    ) -> EmitResult<FunctionId> {
        let f = self.get_or_declare(name, return_type, linkage, args)?;
        self.begin_body(name, f, linkage)
    }

    /// [`IrEmitter::function`] with named parameters.
    pub fn function_named(
        &mut self,
        name: &str,
        return_type: ValueType,
        linkage: FunctionLinkage,
        args: &[(&str, ValueType)],
    ) -> EmitResult<FunctionId> {
        let types: Vec<ValueType> = args.iter().map(|&(_, ty)| ty).collect();
        let f = self.get_or_declare(name, return_type, linkage, &types)?;
        bind_names(f, args);
        self.begin_body(name, f, linkage)
    }

    /// The function has a body.
    pub fn is_defined(&self, function: FunctionId) -> bool {
        self.arena.function(function).count_basic_blocks() > 0
    }

    /// Direct call. `None` for a void callee.
    pub fn call(&mut self, function: FunctionId, args: &[ValueId]) -> EmitResult<Option<ValueId>> {
        let f = self.arena.function(function);
        let expected = f.count_params() as usize;
        if expected != args.len() {
            return Err(EmitError::invalid_argument(format!(
                "`{}` takes {expected} arguments, {} given",
                f.get_name().to_string_lossy(),
                args.len()
            )));
        }
        let arg_vals: Vec<BasicMetadataValueEnum<'ctx>> =
            args.iter().map(|&id| self.arena.value(id).into()).collect();
        // Void results cannot be named.
        let name = if f.get_type().get_return_type().is_some() { "call" } else { "" };
        let call = self.builder.build_call(f, &arg_vals, name).map_err(backend)?;
        Ok(call
            .try_as_basic_value()
            .basic()
            .map(|v| self.arena.push_value(v)))
    }

    /// Formal parameter `index` of the current function.
    pub fn param(&mut self, index: u32) -> EmitResult<ValueId> {
        let function = self
            .current_function
            .ok_or_else(|| EmitError::illegal_state("no function is being emitted"))?;
        let p = self
            .arena
            .function(function)
            .get_nth_param(index)
            .ok_or_else(|| EmitError::invalid_argument(format!("no parameter {index}")))?;
        Ok(self.arena.push_value(p))
    }

    /// Names bound to the formal parameters, in order.
    pub fn param_names(&self, function: FunctionId) -> Vec<String> {
        self.arena
            .function(function)
            .get_param_iter()
            .map(|p| p.get_name().to_string_lossy().into_owned())
            .collect()
    }

    /// Make `function` the insertion point, at the end of its last block.
    pub fn set_current_function(&mut self, function: FunctionId) {
        self.current_function = Some(function);
        match self.arena.function(function).get_last_basic_block() {
            Some(bb) => {
                let id = self.arena.block_id(bb);
                self.set_current_block(id);
            }
            None => {
                self.builder.clear_insertion_position();
                self.current_block = None;
            }
        }
    }

    /// The current insertion point.
    pub fn position(&self) -> Position {
        Position {
            function: self.current_function,
            block: self.current_block,
        }
    }

    /// Return to a saved insertion point.
    pub fn restore_position(&mut self, position: Position) {
        self.current_function = position.function;
        match position.block {
            Some(block) => self.set_current_block(block),
            None => {
                self.builder.clear_insertion_position();
                self.current_block = None;
            }
        }
    }

    fn fn_type(&self, return_type: ValueType, args: &[ValueType]) -> EmitResult<FunctionType<'ctx>> {
        let params = args
            .iter()
            .map(|&ty| self.basic_type(ty).map(BasicMetadataTypeEnum::from))
            .collect::<EmitResult<Vec<_>>>()?;
        Ok(match return_type {
            ValueType::Void => self.context.void_type().fn_type(&params, false),
            ty => self.basic_type(ty)?.fn_type(&params, false),
        })
    }

    /// The module's function `name`, declaring it if absent. An existing
    /// function must have the same signature.
    fn get_or_declare(
        &mut self,
        name: &str,
        return_type: ValueType,
        linkage: FunctionLinkage,
        args: &[ValueType],
    ) -> EmitResult<FunctionValue<'ctx>> {
        let fn_type = self.fn_type(return_type, args)?;
        if let Some(existing) = self.module.get_function(name) {
            if existing.get_type() != fn_type {
                return Err(EmitError::InvalidFunction(format!(
                    "`{name}` redeclared with a different signature"
                )));
            }
            return Ok(existing);
        }
        Ok(self.module.add_function(name, fn_type, Some(linkage.into())))
    }

    fn begin_body(
        &mut self,
        name: &str,
        f: FunctionValue<'ctx>,
        linkage: FunctionLinkage,
    ) -> EmitResult<FunctionId> {
        if f.count_basic_blocks() > 0 {
            return Err(EmitError::InvalidFunction(format!("`{name}` is already defined")));
        }
        // A forward declaration may have been external.
        f.set_linkage(linkage.into());
        debug!(name, ?linkage, "begin function body");
        let id = self.arena.push_function(f);
        let entry = self.block(id, "entry");
        self.current_function = Some(id);
        self.set_current_block(entry);
        Ok(id)
    }
}

fn bind_names(f: FunctionValue<'_>, args: &[(&str, ValueType)]) {
    for (param, &(name, _)) in f.get_param_iter().zip(args) {
        param.set_name(name);
    }
}
