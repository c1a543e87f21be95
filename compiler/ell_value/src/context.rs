//! The backend-neutral emitter context.
//!
//! [`EmitterContext`] is the single operation vocabulary used by graph
//! compilation. Its provided methods validate arguments and then forward to
//! the `*_impl` hooks each backend supplies. Validation failures never reach
//! the backend, so a rejected request emits nothing.
//!
//! All methods take `&self`. Bodies passed to [`EmitterContext::for_each`],
//! [`EmitterContext::if_then`], and [`EmitterContext::create_function`] run
//! synchronously and may call back into the same context, so backends keep
//! their state behind interior mutability and release borrows before invoking
//! a body.

use std::fmt;

use tracing::trace;

use crate::error::{EmitError, EmitResult};
use crate::function::{FunctionBody, FunctionDeclaration};
use crate::intrinsics::{check_intrinsic_call, Intrinsic};
use crate::layout::{calculate_offset, MemoryLayout};
use crate::scalar::Scalar;
use crate::value::{ConstantData, Emittable, Value};
use crate::value_type::ValueType;

/// Where a named allocation lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlobalAllocationScope {
    /// Private to the enclosing function, persistent across calls.
    Function,
    /// Module-wide.
    Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueUnaryOperation {
    LogicalNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueBinaryOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueLogicalOperation {
    Equality,
    Inequality,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl fmt::Display for ValueUnaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueUnaryOperation::LogicalNot => f.write_str("!"),
        }
    }
}

impl fmt::Display for ValueBinaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ValueBinaryOperation::Add => "+",
            ValueBinaryOperation::Subtract => "-",
            ValueBinaryOperation::Multiply => "*",
            ValueBinaryOperation::Divide => "/",
            ValueBinaryOperation::Modulus => "%",
        };
        f.write_str(op)
    }
}

impl fmt::Display for ValueLogicalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ValueLogicalOperation::Equality => "==",
            ValueLogicalOperation::Inequality => "!=",
            ValueLogicalOperation::LessThan => "<",
            ValueLogicalOperation::LessThanOrEqual => "<=",
            ValueLogicalOperation::GreaterThan => ">",
            ValueLogicalOperation::GreaterThanOrEqual => ">=",
        };
        f.write_str(op)
    }
}

/// A conditional body, run at most once.
pub type IfBody<'a> = Box<dyn FnOnce() -> EmitResult<()> + 'a>;

/// Backend half of an [`IfContext`].
///
/// Implementations finish any open control flow in `finish`, and also on
/// drop when `finish` was never reached.
pub trait IfContextImpl {
    fn else_if(&mut self, test: &Scalar, body: IfBody<'_>) -> EmitResult<()>;

    fn otherwise(&mut self, body: IfBody<'_>) -> EmitResult<()>;

    fn finish(&mut self) -> EmitResult<()>;
}

/// Handle returned by [`EmitterContext::if_then`] for chaining
/// `else_if`/`otherwise` branches.
pub struct IfContext {
    inner: Box<dyn IfContextImpl>,
}

impl IfContext {
    pub fn new(inner: Box<dyn IfContextImpl>) -> Self {
        Self { inner }
    }

    /// Add a branch taken when no earlier test held and `test` does.
    pub fn else_if<'a>(
        mut self,
        test: &Scalar,
        body: impl FnOnce() -> EmitResult<()> + 'a,
    ) -> EmitResult<Self> {
        check_boolean(test)?;
        self.inner.else_if(test, Box::new(body))?;
        Ok(self)
    }

    /// Add the fallback branch and close the conditional.
    pub fn otherwise<'a>(mut self, body: impl FnOnce() -> EmitResult<()> + 'a) -> EmitResult<()> {
        self.inner.otherwise(Box::new(body))?;
        self.inner.finish()
    }

    /// Close the conditional with no fallback branch.
    pub fn end(mut self) -> EmitResult<()> {
        self.inner.finish()
    }
}

impl fmt::Debug for IfContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfContext").finish_non_exhaustive()
    }
}

fn check_boolean(test: &Scalar) -> EmitResult<()> {
    if test.ty() != ValueType::Boolean {
        return Err(EmitError::TypeMismatch {
            expected: ValueType::Boolean,
            found: test.ty(),
        });
    }
    test.value().ensure_defined()
}

/// One backend of the emission layer.
pub trait EmitterContext {
    // Backend hooks. Arguments have already been validated.

    /// Fresh storage for `layout.memory_size()` elements of `ty`.
    fn allocate_impl(&self, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value>;

    /// Existing named storage, if any.
    fn global_value(&self, scope: GlobalAllocationScope, name: &str) -> EmitResult<Option<Value>>;

    /// Fresh zero-initialized named storage.
    fn global_allocate_impl(
        &self,
        scope: GlobalAllocationScope,
        name: &str,
        ty: ValueType,
        layout: &MemoryLayout,
    ) -> EmitResult<Value>;

    /// The backend's type for a handle. Storage reports a pointer variant.
    fn type_of_impl(&self, emittable: Emittable) -> EmitResult<ValueType>;

    fn create_function_impl(
        &self,
        declaration: &FunctionDeclaration,
        body: FunctionBody,
    ) -> EmitResult<FunctionDeclaration>;

    fn store_constant_data_impl(&self, data: ConstantData) -> EmitResult<Value>;

    /// Run `body` once per logical coordinate of a non-empty layout.
    fn for_impl(
        &self,
        layout: &MemoryLayout,
        body: &mut dyn FnMut(&[Scalar]) -> EmitResult<()>,
    ) -> EmitResult<()>;

    /// Copy `source.layout().memory_size()` elements into `destination`.
    fn copy_data_impl(&self, source: &Value, destination: &mut Value) -> EmitResult<()>;

    /// Rank-0 view of the element `index` elements past `begin`'s start.
    fn offset_impl(&self, begin: &Value, index: &Scalar) -> EmitResult<Value>;

    fn unary_operation_impl(&self, op: ValueUnaryOperation, value: &Value) -> EmitResult<Value>;

    fn binary_operation_impl(
        &self,
        op: ValueBinaryOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value>;

    fn logical_operation_impl(
        &self,
        op: ValueLogicalOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value>;

    fn cast_impl(&self, value: &Value, ty: ValueType) -> EmitResult<Value>;

    fn if_impl(&self, test: &Scalar, body: IfBody<'_>) -> EmitResult<IfContext>;

    fn call_impl(
        &self,
        declaration: &FunctionDeclaration,
        args: &[Value],
    ) -> EmitResult<Option<Value>>;

    /// `destination` takes over `source`'s storage; `source` is left
    /// undefined.
    fn move_data_impl(&self, source: &mut Value, destination: &mut Value) -> EmitResult<()> {
        *destination = source.clone();
        source.reset();
        Ok(())
    }

    // Validating front end.

    fn allocate(&self, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
        if ty == ValueType::Void {
            return Err(EmitError::invalid_argument("cannot allocate void storage"));
        }
        trace!(%ty, size = ?layout.size(), "allocate");
        self.allocate_impl(ty, layout)
    }

    /// One-dimensional allocation of `len` elements.
    fn allocate_n(&self, ty: ValueType, len: usize) -> EmitResult<Value> {
        self.allocate(ty, &MemoryLayout::new([len])?)
    }

    /// Named storage private to the current function.
    fn static_allocate(&self, name: &str, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
        named_allocate(self, GlobalAllocationScope::Function, name, ty, layout)
    }

    /// Named module-wide storage.
    fn global_allocate(&self, name: &str, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
        named_allocate(self, GlobalAllocationScope::Global, name, ty, layout)
    }

    fn type_of(&self, emittable: Emittable) -> EmitResult<ValueType> {
        self.type_of_impl(emittable)
    }

    /// Register `body` as the definition of `declaration`.
    fn create_function(
        &self,
        declaration: &FunctionDeclaration,
        body: FunctionBody,
    ) -> EmitResult<FunctionDeclaration> {
        if declaration.is_intrinsic() {
            return Err(EmitError::InvalidFunction(declaration.name().to_string()));
        }
        trace!(name = declaration.name(), "create function");
        self.create_function_impl(declaration, body)
    }

    fn store_constant_data(&self, data: ConstantData) -> EmitResult<Value> {
        self.store_constant_data_impl(data)
    }

    /// Invoke `body` once per logical coordinate of `layout`. No-op for an
    /// empty layout.
    fn for_each(
        &self,
        layout: &MemoryLayout,
        body: &mut dyn FnMut(&[Scalar]) -> EmitResult<()>,
    ) -> EmitResult<()> {
        if layout.num_elements() == 0 {
            return Ok(());
        }
        self.for_impl(layout, body)
    }

    fn move_data(&self, source: &mut Value, destination: &mut Value) -> EmitResult<()> {
        source.ensure_defined()?;
        self.move_data_impl(source, destination)
    }

    fn copy_data(&self, source: &Value, destination: &mut Value) -> EmitResult<()> {
        source.ensure_defined()?;
        destination.ensure_defined()?;
        if source.base_type() != destination.base_type() {
            return Err(EmitError::TypeMismatch {
                expected: destination.base_type(),
                found: source.base_type(),
            });
        }
        let requested = source.layout()?.memory_size();
        let capacity = destination.layout()?.memory_size();
        if requested > capacity {
            return Err(EmitError::InvalidSize {
                requested,
                capacity,
            });
        }
        self.copy_data_impl(source, destination)
    }

    /// Rank-0 view of the element at flat `index`.
    fn offset(&self, begin: &Value, index: &Scalar) -> EmitResult<Value> {
        begin.ensure_defined()?;
        index.value().ensure_defined()?;
        if !index.ty().is_integral() {
            return Err(EmitError::TypeMismatch {
                expected: ValueType::Int32,
                found: index.ty(),
            });
        }
        self.offset_impl(begin, index)
    }

    /// Rank-0 view of the element at logical `coordinates`.
    fn offset_coordinates(&self, begin: &Value, coordinates: &[Scalar]) -> EmitResult<Value> {
        begin.ensure_defined()?;
        let flat = calculate_offset(self, begin.layout()?, coordinates)?;
        self.offset(begin, &flat)
    }

    fn unary_operation(&self, op: ValueUnaryOperation, value: &Value) -> EmitResult<Value> {
        value.ensure_defined()?;
        value.layout()?;
        match op {
            ValueUnaryOperation::LogicalNot if value.base_type() != ValueType::Boolean => {
                Err(EmitError::TypeMismatch {
                    expected: ValueType::Boolean,
                    found: value.base_type(),
                })
            }
            ValueUnaryOperation::LogicalNot => self.unary_operation_impl(op, value),
        }
    }

    /// Elementwise arithmetic into a fresh value shaped like `lhs`. A rank-0
    /// `rhs` is broadcast.
    fn binary_operation(
        &self,
        op: ValueBinaryOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value> {
        lhs.ensure_defined()?;
        rhs.ensure_defined()?;
        if lhs.base_type() != rhs.base_type() {
            return Err(EmitError::TypeMismatch {
                expected: lhs.base_type(),
                found: rhs.base_type(),
            });
        }
        if !(lhs.base_type().is_integral() || lhs.base_type().is_floating_point()) {
            return Err(EmitError::InvalidOperatorType(format!(
                "`{op}` is not defined for {}",
                lhs.base_type()
            )));
        }
        check_shapes(lhs, rhs)?;
        self.binary_operation_impl(op, lhs, rhs)
    }

    /// Elementwise comparison into a fresh `Boolean` value.
    fn logical_operation(
        &self,
        op: ValueLogicalOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value> {
        if !lhs.is_defined() || !rhs.is_defined() {
            return Err(EmitError::invalid_argument(format!(
                "`{op}` requires defined operands"
            )));
        }
        if lhs.base_type() != rhs.base_type() {
            return Err(EmitError::invalid_argument(format!(
                "`{op}` operands differ in type: {} and {}",
                lhs.base_type(),
                rhs.base_type()
            )));
        }
        check_shapes(lhs, rhs)?;
        self.logical_operation_impl(op, lhs, rhs)
    }

    /// Elementwise numeric conversion to `ty`.
    fn cast(&self, value: &Value, ty: ValueType) -> EmitResult<Value> {
        if !value.is_constrained() {
            return Err(EmitError::invalid_argument("cannot cast an unconstrained value"));
        }
        value.ensure_defined()?;
        if ty == ValueType::Void || ty.is_pointer() {
            return Err(EmitError::InvalidValueType(format!("cannot cast to {ty}")));
        }
        self.cast_impl(value, ty)
    }

    /// Begin a conditional. `body` runs when `test` holds.
    fn if_then(&self, test: &Scalar, body: IfBody<'_>) -> EmitResult<IfContext> {
        check_boolean(test)?;
        self.if_impl(test, body)
    }

    /// Call a user function or an intrinsic. `None` for a `Void` return.
    fn call(&self, declaration: &FunctionDeclaration, args: &[Value]) -> EmitResult<Option<Value>> {
        for arg in args {
            arg.ensure_defined()?;
        }
        if let Some(intrinsic) = declaration.intrinsic() {
            check_intrinsic_call(intrinsic, args)?;
            return self.call_impl(declaration, args);
        }
        let params = declaration.parameters();
        if params.len() != args.len() {
            return Err(EmitError::invalid_argument(format!(
                "`{}` takes {} arguments, {} given",
                declaration.name(),
                params.len(),
                args.len()
            )));
        }
        for (param, arg) in params.iter().zip(args) {
            if param.ty.base() != arg.base_type() {
                return Err(EmitError::TypeMismatch {
                    expected: param.ty.base(),
                    found: arg.base_type(),
                });
            }
        }
        self.call_impl(declaration, args)
    }

    /// The ten always-available intrinsic declarations.
    fn intrinsics(&self) -> Vec<FunctionDeclaration> {
        Intrinsic::ALL.iter().map(|i| i.declaration()).collect()
    }
}

fn named_allocate<C: EmitterContext + ?Sized>(
    ctx: &C,
    scope: GlobalAllocationScope,
    name: &str,
    ty: ValueType,
    layout: &MemoryLayout,
) -> EmitResult<Value> {
    if ty == ValueType::Void {
        return Err(EmitError::invalid_argument("cannot allocate void storage"));
    }
    let Some(mut existing) = ctx.global_value(scope, name)? else {
        trace!(name, ?scope, %ty, "named allocate");
        return ctx.global_allocate_impl(scope, name, ty, layout);
    };
    if existing.ty() != ty {
        return Err(EmitError::TypeMismatch {
            expected: existing.ty(),
            found: ty,
        });
    }
    let capacity = existing.layout()?.memory_size();
    let requested = layout.memory_size();
    if requested > capacity {
        return Err(EmitError::InvalidSize {
            requested,
            capacity,
        });
    }
    existing.set_layout(layout.clone());
    Ok(existing)
}

/// Operands agree in logical shape, or `rhs` is rank 0.
fn check_shapes(lhs: &Value, rhs: &Value) -> EmitResult<()> {
    let lhs_layout = lhs.layout()?;
    let rhs_layout = rhs.layout()?;
    if rhs_layout.is_scalar() || lhs_layout.logical_size() == rhs_layout.logical_size() {
        Ok(())
    } else {
        Err(EmitError::invalid_argument(format!(
            "operand shapes differ: {:?} and {:?}",
            lhs_layout.logical_size(),
            rhs_layout.logical_size()
        )))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
