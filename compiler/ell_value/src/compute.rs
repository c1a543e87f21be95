//! Interpreting backend.
//!
//! [`ComputeContext`] executes every operation immediately on host buffers
//! instead of emitting code. It gives the dispatcher a backend to run
//! against without a code generator: conditionals evaluate their test on
//! the spot, loops run their body once per coordinate, and user functions
//! run their definition body.
//!
//! Storage is a list of [`ConstantData`] buffers. An [`Emittable`] names a
//! slot, a `(buffer, start)` pair, so offsets into an allocation are views
//! sharing the allocation's buffer.

mod datum;

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace};

use crate::context::{
    EmitterContext, GlobalAllocationScope, IfBody, IfContext, IfContextImpl, ValueBinaryOperation,
    ValueLogicalOperation, ValueUnaryOperation,
};
use crate::error::{EmitError, EmitResult};
use crate::function::{FunctionBody, FunctionDeclaration};
use crate::intrinsics::{check_intrinsic_call, Intrinsic};
use crate::layout::MemoryLayout;
use crate::scalar::Scalar;
use crate::value::{ConstantData, Emittable, Value};
use crate::value_type::ValueType;

use self::datum::Datum;

#[derive(Clone, Copy, Debug)]
struct Slot {
    buffer: usize,
    start: usize,
}

#[derive(Default)]
struct ComputeState {
    buffers: RefCell<Vec<ConstantData>>,
    slots: RefCell<Vec<Slot>>,
    globals: RefCell<FxHashMap<(GlobalAllocationScope, String), Value>>,
    functions: RefCell<FxHashMap<String, FunctionDeclaration>>,
    /// Names of the user functions currently executing, innermost last.
    call_stack: RefCell<Vec<String>>,
}

/// Host-executing [`EmitterContext`].
pub struct ComputeContext {
    name: String,
    state: Rc<ComputeState>,
}

impl ComputeContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Rc::new(ComputeState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active elements of `value` in logical order.
    pub fn read(&self, value: &Value) -> EmitResult<ConstantData> {
        self.state.read(value)
    }

    /// Copy of the whole buffer behind `value`, padding included.
    pub fn buffer(&self, value: &Value) -> EmitResult<ConstantData> {
        let slot = self.state.slot(value.emittable()?)?;
        Ok(self.state.buffers.borrow()[slot.buffer].clone())
    }

    /// Number of host buffers created so far.
    pub fn buffer_count(&self) -> usize {
        self.state.buffers.borrow().len()
    }
}

impl ComputeState {
    fn slot(&self, emittable: Emittable) -> EmitResult<Slot> {
        self.slots
            .borrow()
            .get(emittable.index())
            .copied()
            .ok_or_else(|| EmitError::invalid_argument(format!("unknown handle {}", emittable.raw())))
    }

    fn new_slot(&self, slot: Slot) -> EmitResult<Emittable> {
        let mut slots = self.slots.borrow_mut();
        let raw = u32::try_from(slots.len())
            .map_err(|_| EmitError::Backend("handle space exhausted".to_string()))?;
        slots.push(slot);
        Ok(Emittable::new(raw))
    }

    fn new_buffer(&self, data: ConstantData, layout: MemoryLayout) -> EmitResult<Value> {
        let ty = data.value_type();
        let buffer = {
            let mut buffers = self.buffers.borrow_mut();
            buffers.push(data);
            buffers.len() - 1
        };
        let emittable = self.new_slot(Slot { buffer, start: 0 })?;
        Ok(Value::from_emittable(emittable, ty, layout))
    }

    fn allocate(&self, ty: ValueType, layout: MemoryLayout) -> EmitResult<Value> {
        let data = ConstantData::zeroed(ty, layout.memory_size())?;
        self.new_buffer(data, layout)
    }

    fn index_of(&self, value: &Value, coordinates: &[usize]) -> EmitResult<(Slot, usize)> {
        let slot = self.slot(value.emittable()?)?;
        let offset = value.layout()?.entry_offset(coordinates)?;
        Ok((slot, slot.start + offset))
    }

    fn get(&self, value: &Value, coordinates: &[usize]) -> EmitResult<Datum> {
        let (slot, index) = self.index_of(value, coordinates)?;
        Datum::load(&self.buffers.borrow()[slot.buffer], index)
    }

    fn set(&self, value: &Value, coordinates: &[usize], datum: Datum) -> EmitResult<()> {
        let (slot, index) = self.index_of(value, coordinates)?;
        datum.store(&mut self.buffers.borrow_mut()[slot.buffer], index)
    }

    fn scalar(&self, scalar: &Scalar) -> EmitResult<Datum> {
        self.get(scalar.value(), &[])
    }

    fn read(&self, value: &Value) -> EmitResult<ConstantData> {
        let layout = value.layout()?;
        let mut out = ConstantData::zeroed(value.base_type(), layout.num_elements())?;
        for (i, coordinates) in layout.logical_coordinates().enumerate() {
            self.get(value, &coordinates)?.store(&mut out, i)?;
        }
        Ok(out)
    }

    /// Fresh value shaped like `shape`, filled by `f` per coordinate.
    fn map(
        &self,
        ty: ValueType,
        shape: &MemoryLayout,
        mut f: impl FnMut(&[usize]) -> EmitResult<Datum>,
    ) -> EmitResult<Value> {
        let result = self.allocate(ty, MemoryLayout::new(shape.logical_size())?)?;
        for coordinates in shape.logical_coordinates() {
            let datum = f(&coordinates)?;
            self.set(&result, &coordinates, datum)?;
        }
        Ok(result)
    }

    /// Operand element for `coordinates`, broadcasting rank-0 operands.
    fn operand(&self, value: &Value, coordinates: &[usize]) -> EmitResult<Datum> {
        if value.layout()?.is_scalar() {
            self.get(value, &[])
        } else {
            self.get(value, coordinates)
        }
    }

    fn current_function(&self) -> Option<String> {
        self.call_stack.borrow().last().cloned()
    }

    fn global_key(&self, scope: GlobalAllocationScope, name: &str) -> (GlobalAllocationScope, String) {
        match scope {
            GlobalAllocationScope::Global => (scope, name.to_string()),
            GlobalAllocationScope::Function => {
                let function = self.current_function().unwrap_or_default();
                (scope, format!("{function}.{name}"))
            }
        }
    }

    fn evaluate_intrinsic(&self, intrinsic: Intrinsic, args: &[Value]) -> EmitResult<Value> {
        let result = check_intrinsic_call(intrinsic, args)?;
        let ty = result.ty();
        let shape = result.layout()?.clone();
        match intrinsic {
            Intrinsic::MaxNum | Intrinsic::MinNum if args.len() == 1 => {
                let data = self.read(&args[0])?;
                let mut folded = Datum::load(&data, 0)?;
                for i in 1..data.len() {
                    let next = Datum::load(&data, i)?;
                    folded = if intrinsic == Intrinsic::MaxNum {
                        folded.max(next)
                    } else {
                        folded.min(next)
                    };
                }
                self.map(ty, &shape, |_| Ok(folded))
            }
            Intrinsic::MaxNum | Intrinsic::MinNum => {
                let (a, b) = (self.get(&args[0], &[])?, self.get(&args[1], &[])?);
                let folded = if intrinsic == Intrinsic::MaxNum { a.max(b) } else { a.min(b) };
                self.map(ty, &shape, |_| Ok(folded))
            }
            Intrinsic::Pow => {
                let exponent = self.get(&args[1], &[])?;
                self.map(ty, args[0].layout()?, |c| Ok(self.get(&args[0], c)?.pow(exponent)))
            }
            Intrinsic::Abs
            | Intrinsic::Cos
            | Intrinsic::Exp
            | Intrinsic::Log
            | Intrinsic::Sin
            | Intrinsic::Sqrt
            | Intrinsic::Tanh => {
                self.map(ty, args[0].layout()?, |c| Ok(self.get(&args[0], c)?.unary(intrinsic)))
            }
        }
    }
}

impl EmitterContext for ComputeContext {
    fn allocate_impl(&self, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
        self.state.allocate(ty, layout.clone())
    }

    fn global_value(&self, scope: GlobalAllocationScope, name: &str) -> EmitResult<Option<Value>> {
        let key = self.state.global_key(scope, name);
        Ok(self.state.globals.borrow().get(&key).cloned())
    }

    fn global_allocate_impl(
        &self,
        scope: GlobalAllocationScope,
        name: &str,
        ty: ValueType,
        layout: &MemoryLayout,
    ) -> EmitResult<Value> {
        let key = self.state.global_key(scope, name);
        debug!(name = %key.1, ?scope, %ty, "global allocation");
        let value = self.state.allocate(ty, layout.clone())?;
        self.state.globals.borrow_mut().insert(key, value.clone());
        Ok(value)
    }

    fn type_of_impl(&self, emittable: Emittable) -> EmitResult<ValueType> {
        let slot = self.state.slot(emittable)?;
        let ty = self.state.buffers.borrow()[slot.buffer].value_type();
        ty.pointer_to()
            .ok_or_else(|| EmitError::InvalidValueType(format!("no pointer type for {ty}")))
    }

    fn create_function_impl(
        &self,
        declaration: &FunctionDeclaration,
        body: FunctionBody,
    ) -> EmitResult<FunctionDeclaration> {
        let mut functions = self.state.functions.borrow_mut();
        if functions.contains_key(declaration.name()) {
            return Err(EmitError::InvalidFunction(declaration.name().to_string()));
        }
        let defined = declaration.clone().with_definition(body);
        functions.insert(declaration.name().to_string(), defined.clone());
        Ok(defined)
    }

    fn store_constant_data_impl(&self, data: ConstantData) -> EmitResult<Value> {
        let layout = MemoryLayout::new([data.len()])?;
        self.state.new_buffer(data, layout)
    }

    fn for_impl(
        &self,
        layout: &MemoryLayout,
        body: &mut dyn FnMut(&[Scalar]) -> EmitResult<()>,
    ) -> EmitResult<()> {
        for coordinates in layout.logical_coordinates() {
            let mut indices = Vec::with_capacity(coordinates.len());
            for c in coordinates {
                let c = i32::try_from(c)
                    .map_err(|_| EmitError::invalid_argument(format!("index {c} exceeds int32")))?;
                let value = self
                    .state
                    .new_buffer(ConstantData::Int32(vec![c]), MemoryLayout::scalar())?;
                indices.push(Scalar::new(value)?);
            }
            body(&indices)?;
        }
        Ok(())
    }

    fn copy_data_impl(&self, source: &Value, destination: &mut Value) -> EmitResult<()> {
        let from = self.state.slot(source.emittable()?)?;
        let to = self.state.slot(destination.emittable()?)?;
        let count = source.layout()?.memory_size();
        trace!(count, "copy data");
        for i in 0..count {
            let datum = Datum::load(&self.state.buffers.borrow()[from.buffer], from.start + i)?;
            datum.store(&mut self.state.buffers.borrow_mut()[to.buffer], to.start + i)?;
        }
        Ok(())
    }

    fn offset_impl(&self, begin: &Value, index: &Scalar) -> EmitResult<Value> {
        let slot = self.state.slot(begin.emittable()?)?;
        let index = self.state.scalar(index)?.as_index()?;
        let start = slot.start + index;
        let len = self.state.buffers.borrow()[slot.buffer].len();
        if start >= len {
            return Err(EmitError::invalid_argument(format!(
                "offset {index} is outside storage of {len} elements"
            )));
        }
        let emittable = self.state.new_slot(Slot {
            buffer: slot.buffer,
            start,
        })?;
        Ok(Value::from_emittable(emittable, begin.ty(), MemoryLayout::scalar()))
    }

    fn unary_operation_impl(&self, op: ValueUnaryOperation, value: &Value) -> EmitResult<Value> {
        match op {
            ValueUnaryOperation::LogicalNot => self.state.map(ValueType::Boolean, value.layout()?, |c| {
                Ok(Datum::Boolean(!self.state.get(value, c)?.as_bool()))
            }),
        }
    }

    fn binary_operation_impl(
        &self,
        op: ValueBinaryOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value> {
        self.state.map(lhs.base_type(), lhs.layout()?, |c| {
            self.state
                .operand(lhs, c)?
                .binary(op, self.state.operand(rhs, c)?)
        })
    }

    fn logical_operation_impl(
        &self,
        op: ValueLogicalOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value> {
        self.state.map(ValueType::Boolean, lhs.layout()?, |c| {
            let (a, b) = (self.state.operand(lhs, c)?, self.state.operand(rhs, c)?);
            Ok(Datum::Boolean(a.compare(op, b)))
        })
    }

    fn cast_impl(&self, value: &Value, ty: ValueType) -> EmitResult<Value> {
        self.state
            .map(ty, value.layout()?, |c| Ok(self.state.get(value, c)?.convert(ty)))
    }

    fn if_impl(&self, test: &Scalar, body: IfBody<'_>) -> EmitResult<IfContext> {
        let taken = self.state.scalar(test)?.as_bool();
        if taken {
            body()?;
        }
        Ok(IfContext::new(Box::new(ComputeIf {
            state: Rc::clone(&self.state),
            taken,
        })))
    }

    #[instrument(skip(self, declaration, args), fields(name = declaration.name()), level = "debug")]
    fn call_impl(
        &self,
        declaration: &FunctionDeclaration,
        args: &[Value],
    ) -> EmitResult<Option<Value>> {
        if let Some(intrinsic) = declaration.intrinsic() {
            return self.state.evaluate_intrinsic(intrinsic, args).map(Some);
        }

        let function = self
            .state
            .functions
            .borrow()
            .get(declaration.name())
            .cloned()
            .ok_or_else(|| EmitError::InvalidFunction(declaration.name().to_string()))?;
        let body = function
            .definition()
            .cloned()
            .ok_or_else(|| EmitError::InvalidFunction(declaration.name().to_string()))?;

        // Scalars are passed by value, everything else by reference.
        let mut params = Vec::with_capacity(args.len());
        for (param, arg) in function.parameters().iter().zip(args) {
            if param.is_scalar() {
                let mut local = self.state.allocate(arg.base_type(), MemoryLayout::scalar())?;
                self.copy_data(arg, &mut local)?;
                params.push(local);
            } else {
                params.push(arg.clone());
            }
        }

        self.state
            .call_stack
            .borrow_mut()
            .push(function.name().to_string());
        let result = body(&params);
        self.state.call_stack.borrow_mut().pop();

        let result = result?;
        if function.returns_void() {
            return Ok(None);
        }
        let value = result.ok_or_else(|| {
            EmitError::invalid_argument(format!("`{}` returned no value", function.name()))
        })?;
        if value.base_type() != function.return_type().base() {
            return Err(EmitError::TypeMismatch {
                expected: function.return_type().base(),
                found: value.base_type(),
            });
        }
        Ok(Some(value))
    }
}

struct ComputeIf {
    state: Rc<ComputeState>,
    taken: bool,
}

impl IfContextImpl for ComputeIf {
    fn else_if(&mut self, test: &Scalar, body: IfBody<'_>) -> EmitResult<()> {
        if !self.taken && self.state.scalar(test)?.as_bool() {
            self.taken = true;
            body()?;
        }
        Ok(())
    }

    fn otherwise(&mut self, body: IfBody<'_>) -> EmitResult<()> {
        if !self.taken {
            self.taken = true;
            body()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> EmitResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
