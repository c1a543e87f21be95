//! Opaque handles for LLVM objects owned by an [`IrEmitter`].
//!
//! Values, blocks, and functions live in a [`ValueArena`] inside the
//! emitter and are referenced by `Copy` ids, so callers never carry the
//! inkwell `'ctx` lifetime.
//!
//! [`IrEmitter`]: crate::IrEmitter

use inkwell::basic_block::BasicBlock;
use inkwell::values::{BasicValueEnum, FunctionValue};

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $name(u32);

            impl $name {
                /// The raw index.
                #[inline]
                pub fn raw(self) -> u32 {
                    self.0
                }

                #[inline]
                fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

arena_id! {
    /// Handle to an LLVM value.
    ValueId,
    /// Handle to an LLVM basic block.
    BlockId,
    /// Handle to an LLVM function.
    FunctionId,
}

/// Next id for an arena vector of `len` entries.
#[allow(
    clippy::cast_possible_truncation,
    reason = "an arena never approaches u32::MAX entries within one module"
)]
fn next_id(len: usize) -> u32 {
    len as u32
}

/// Storage behind the emitter's ids.
pub(crate) struct ValueArena<'ctx> {
    values: Vec<BasicValueEnum<'ctx>>,
    blocks: Vec<BasicBlock<'ctx>>,
    functions: Vec<FunctionValue<'ctx>>,
}

impl<'ctx> ValueArena<'ctx> {
    pub(crate) fn new() -> Self {
        Self {
            values: Vec::new(),
            blocks: Vec::new(),
            functions: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn push_value(&mut self, value: BasicValueEnum<'ctx>) -> ValueId {
        let id = ValueId(next_id(self.values.len()));
        self.values.push(value);
        id
    }

    #[inline]
    pub(crate) fn value(&self, id: ValueId) -> BasicValueEnum<'ctx> {
        self.values[id.index()]
    }

    #[inline]
    pub(crate) fn push_block(&mut self, block: BasicBlock<'ctx>) -> BlockId {
        let id = BlockId(next_id(self.blocks.len()));
        self.blocks.push(block);
        id
    }

    #[inline]
    pub(crate) fn block(&self, id: BlockId) -> BasicBlock<'ctx> {
        self.blocks[id.index()]
    }

    /// Id of an already-registered block, registering it if needed.
    pub(crate) fn block_id(&mut self, block: BasicBlock<'ctx>) -> BlockId {
        match self.blocks.iter().rposition(|b| *b == block) {
            Some(index) => BlockId(next_id(index)),
            None => self.push_block(block),
        }
    }

    pub(crate) fn push_function(&mut self, function: FunctionValue<'ctx>) -> FunctionId {
        if let Some(index) = self.functions.iter().position(|f| *f == function) {
            return FunctionId(next_id(index));
        }
        let id = FunctionId(next_id(self.functions.len()));
        self.functions.push(function);
        id
    }

    #[inline]
    pub(crate) fn function(&self, id: FunctionId) -> FunctionValue<'ctx> {
        self.functions[id.index()]
    }
}
