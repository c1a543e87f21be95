//! Blocks, branches, phis, and returns.

use ell_value::{EmitError, EmitResult, ValueType};
use inkwell::values::BasicValue;

use super::{backend, IrEmitter};
use crate::value_id::{BlockId, FunctionId, ValueId};

impl<'ctx> IrEmitter<'ctx> {
    /// Append a block to the end of `function`.
    pub fn block(&mut self, function: FunctionId, label: &str) -> BlockId {
        let f = self.arena.function(function);
        let bb = self.context.append_basic_block(f, label);
        self.arena.push_block(bb)
    }

    /// Insert a block directly after `previous`.
    pub fn block_after(&mut self, previous: BlockId, label: &str) -> BlockId {
        let prev = self.arena.block(previous);
        let bb = self.context.insert_basic_block_after(prev, label);
        self.arena.push_block(bb)
    }

    /// Move the insertion point to the end of `block`.
    pub fn set_current_block(&mut self, block: BlockId) {
        self.builder.position_at_end(self.arena.block(block));
        self.current_block = Some(block);
    }

    /// The insertion point's block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.current_block
            .and_then(|id| self.arena.block(id).get_terminator())
            .is_some()
    }

    pub fn branch(&mut self, destination: BlockId) -> EmitResult<()> {
        self.builder
            .build_unconditional_branch(self.arena.block(destination))
            .map_err(backend)?;
        Ok(())
    }

    /// Branch on an `i1`.
    pub fn branch_if(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) -> EmitResult<()> {
        let raw = self.arena.value(cond);
        if !raw.is_int_value() {
            return Err(EmitError::invalid_argument("branch condition must be an i1"));
        }
        self.builder
            .build_conditional_branch(
                raw.into_int_value(),
                self.arena.block(then_block),
                self.arena.block(else_block),
            )
            .map_err(backend)?;
        Ok(())
    }

    /// Two-way phi: `lhs` when arriving from `lhs_block`, `rhs` from
    /// `rhs_block`.
    pub fn phi(
        &mut self,
        ty: ValueType,
        lhs: ValueId,
        lhs_block: BlockId,
        rhs: ValueId,
        rhs_block: BlockId,
    ) -> EmitResult<ValueId> {
        let llvm_ty = self.basic_type(ty)?;
        let (l, r) = (self.arena.value(lhs), self.arena.value(rhs));
        if l.get_type() != llvm_ty || r.get_type() != llvm_ty {
            return Err(EmitError::invalid_argument(format!(
                "phi of {ty} given {:?} and {:?}",
                l.get_type(),
                r.get_type()
            )));
        }
        let phi = self.builder.build_phi(llvm_ty, "phi").map_err(backend)?;
        let incoming: [(&dyn BasicValue<'ctx>, _); 2] = [
            (&l, self.arena.block(lhs_block)),
            (&r, self.arena.block(rhs_block)),
        ];
        phi.add_incoming(&incoming);
        Ok(self.arena.push_value(phi.as_basic_value()))
    }

    pub fn return_void(&mut self) -> EmitResult<()> {
        self.builder.build_return(None).map_err(backend)?;
        Ok(())
    }

    pub fn return_value(&mut self, value: ValueId) -> EmitResult<()> {
        let v = self.arena.value(value);
        self.builder.build_return(Some(&v)).map_err(backend)?;
        Ok(())
    }
}
