//! The active emitter context.
//!
//! Each thread has a stack of active contexts. [`ContextGuard`] is the only
//! way to push one, and it pops on every exit path, so nested guards
//! restore the previous context when they end. The free functions here
//! dispatch to the innermost active context and fail with
//! [`EmitError::IllegalState`] when there is none.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{debug, error};

use crate::context::{EmitterContext, IfContext};
use crate::error::{EmitError, EmitResult};
use crate::function::{FunctionBody, FunctionDeclaration};
use crate::layout::MemoryLayout;
use crate::scalar::Scalar;
use crate::value::{ConstantData, Value};
use crate::value_type::ValueType;

thread_local! {
    static ACTIVE: RefCell<Vec<Rc<dyn EmitterContext>>> = const { RefCell::new(Vec::new()) };
}

/// Activates a context for the guard's lifetime.
///
/// Not `Send`: a guard must end on the thread that created it.
#[must_use = "the context is deactivated as soon as the guard is dropped"]
pub struct ContextGuard {
    context: Rc<dyn EmitterContext>,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    pub fn new(context: Rc<dyn EmitterContext>) -> Self {
        ACTIVE.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(Rc::clone(&context));
            debug!(depth = stack.len(), "context activated");
        });
        Self {
            context,
            _not_send: PhantomData,
        }
    }

    pub fn context(&self) -> &Rc<dyn EmitterContext> {
        &self.context
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            let mut stack = stack.borrow_mut();
            // Guards normally end in reverse order; tolerate a guard moved
            // out of its scope by removing its own entry.
            match stack.iter().rposition(|c| Rc::ptr_eq(c, &self.context)) {
                Some(index) => {
                    stack.remove(index);
                    debug!(depth = stack.len(), "context deactivated");
                }
                None => error!("context guard dropped with no matching active context"),
            }
        });
    }
}

/// The innermost active context.
pub fn get_context() -> EmitResult<Rc<dyn EmitterContext>> {
    ACTIVE
        .with(|stack| stack.borrow().last().cloned())
        .ok_or_else(|| EmitError::illegal_state("no emitter context is active"))
}

/// True when some context is active on this thread.
pub fn has_context() -> bool {
    ACTIVE.with(|stack| !stack.borrow().is_empty())
}

/// Run `f` against the innermost active context.
pub fn with_context<R>(f: impl FnOnce(&dyn EmitterContext) -> EmitResult<R>) -> EmitResult<R> {
    let ctx = get_context()?;
    f(ctx.as_ref())
}

pub fn allocate(ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
    with_context(|ctx| ctx.allocate(ty, layout))
}

pub fn allocate_n(ty: ValueType, len: usize) -> EmitResult<Value> {
    with_context(|ctx| ctx.allocate_n(ty, len))
}

pub fn static_allocate(name: &str, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
    with_context(|ctx| ctx.static_allocate(name, ty, layout))
}

pub fn global_allocate(name: &str, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
    with_context(|ctx| ctx.global_allocate(name, ty, layout))
}

pub fn store_constant_data(data: ConstantData) -> EmitResult<Value> {
    with_context(|ctx| ctx.store_constant_data(data))
}

pub fn for_each(
    layout: &MemoryLayout,
    mut body: impl FnMut(&[Scalar]) -> EmitResult<()>,
) -> EmitResult<()> {
    with_context(|ctx| ctx.for_each(layout, &mut body))
}

pub fn move_data(source: &mut Value, destination: &mut Value) -> EmitResult<()> {
    with_context(|ctx| ctx.move_data(source, destination))
}

pub fn copy_data(source: &Value, destination: &mut Value) -> EmitResult<()> {
    with_context(|ctx| ctx.copy_data(source, destination))
}

pub fn offset(begin: &Value, index: &Scalar) -> EmitResult<Value> {
    with_context(|ctx| ctx.offset(begin, index))
}

pub fn offset_coordinates(begin: &Value, coordinates: &[Scalar]) -> EmitResult<Value> {
    with_context(|ctx| ctx.offset_coordinates(begin, coordinates))
}

pub fn cast(value: &Value, ty: ValueType) -> EmitResult<Value> {
    with_context(|ctx| ctx.cast(value, ty))
}

pub fn if_then<'a>(
    test: &Scalar,
    body: impl FnOnce() -> EmitResult<()> + 'a,
) -> EmitResult<IfContext> {
    with_context(|ctx| ctx.if_then(test, Box::new(body)))
}

pub fn call(declaration: &FunctionDeclaration, args: &[Value]) -> EmitResult<Option<Value>> {
    with_context(|ctx| ctx.call(declaration, args))
}

pub fn create_function(
    declaration: &FunctionDeclaration,
    body: FunctionBody,
) -> EmitResult<FunctionDeclaration> {
    with_context(|ctx| ctx.create_function(declaration, body))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
