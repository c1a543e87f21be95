//! [`EmitterContext`] backed by LLVM IR.
//!
//! Every defined [`Value`] is a pointer to storage: stack slots for
//! allocations and temporaries, module globals for named and constant data.
//! Elementwise operations load, compute, and store one element at a time
//! inside counted loops.
//!
//! Emitters live in the thread-local active-context stack, which requires
//! `'static` contexts. Each thread leaks one inkwell `Context` on first use
//! and every emitter context on that thread builds its module in it.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use ell_value::{
    check_intrinsic_call, ConstantData, EmitError, EmitResult, EmitterContext, Emittable,
    FunctionBody, FunctionDeclaration, GlobalAllocationScope, IfBody, IfContext, IfContextImpl,
    Intrinsic, MemoryLayout, Scalar, Value, ValueBinaryOperation, ValueLogicalOperation,
    ValueType, ValueUnaryOperation,
};
use inkwell::context::Context;
use rustc_hash::FxHashMap;
use tracing::{debug, error, instrument, trace};

use crate::ir_emitter::{FunctionLinkage, IrEmitter};
use crate::operators::{ComparisonType, OperatorType};
use crate::value_id::{BlockId, FunctionId, ValueId};

/// Settings for an [`LlvmEmitterContext`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlvmEmitterConfig {
    pub module_name: String,
    /// Print the module IR to stderr from [`LlvmEmitterContext::finish`].
    pub debug_ir: bool,
}

impl LlvmEmitterConfig {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            debug_ir: false,
        }
    }

    /// `debug_ir` is enabled by a non-empty `ELL_DEBUG_LLVM`.
    pub fn from_env(module_name: impl Into<String>) -> Self {
        Self {
            debug_ir: std::env::var("ELL_DEBUG_LLVM").is_ok_and(|v| !v.is_empty()),
            ..Self::new(module_name)
        }
    }
}

/// Storage behind one emittable.
#[derive(Clone, Copy)]
struct Handle {
    ptr: ValueId,
    /// Element type of the storage.
    ty: ValueType,
}

struct FunctionEntry {
    declaration: FunctionDeclaration,
    id: FunctionId,
}

struct LlvmState {
    emitter: RefCell<IrEmitter<'static>>,
    handles: RefCell<Vec<Handle>>,
    globals: RefCell<FxHashMap<(GlobalAllocationScope, String), Value>>,
    functions: RefCell<FxHashMap<String, FunctionEntry>>,
    /// Functions whose bodies are being emitted, innermost last.
    function_stack: RefCell<Vec<String>>,
    config: LlvmEmitterConfig,
}

thread_local! {
    static THREAD_CONTEXT: &'static Context = Box::leak(Box::new(Context::create()));
}

/// The inkwell context shared by every emitter created on this thread.
fn thread_context() -> &'static Context {
    THREAD_CONTEXT.with(|context| *context)
}

/// LLVM-emitting [`EmitterContext`].
pub struct LlvmEmitterContext {
    state: Rc<LlvmState>,
}

impl LlvmEmitterContext {
    pub fn new(config: LlvmEmitterConfig) -> Self {
        let context = thread_context();
        debug!(module = %config.module_name, "creating LLVM emitter context");
        Self {
            state: Rc::new(LlvmState {
                emitter: RefCell::new(IrEmitter::new(context, &config.module_name)),
                handles: RefCell::new(Vec::new()),
                globals: RefCell::new(FxHashMap::default()),
                functions: RefCell::new(FxHashMap::default()),
                function_stack: RefCell::new(Vec::new()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &LlvmEmitterConfig {
        &self.state.config
    }

    /// Verify the module and return its IR.
    pub fn finish(&self) -> EmitResult<String> {
        let emitter = self.state.emitter();
        if let Err(err) = emitter.verify() {
            error!(module = %self.state.config.module_name, %err, "module failed verification");
            return Err(err);
        }
        let ir = emitter.print_to_string();
        if self.state.config.debug_ir {
            eprintln!("=== LLVM IR: {} ===\n{ir}", self.state.config.module_name);
        }
        Ok(ir)
    }

    /// Current IR of the module, verified or not.
    pub fn ir(&self) -> String {
        self.state.emitter().print_to_string()
    }

    /// Direct access to the low-level emitter.
    ///
    /// `f` must not call back into this context.
    pub fn with_emitter<R>(&self, f: impl FnOnce(&mut IrEmitter<'static>) -> R) -> R {
        f(&mut *self.state.emitter())
    }
}

impl LlvmState {
    fn emitter(&self) -> RefMut<'_, IrEmitter<'static>> {
        self.emitter.borrow_mut()
    }

    fn handle(&self, value: &Value) -> EmitResult<Handle> {
        let emittable = value.emittable()?;
        self.handles
            .borrow()
            .get(emittable.index())
            .copied()
            .ok_or_else(|| EmitError::invalid_argument(format!("unknown handle {}", emittable.raw())))
    }

    fn pointer(&self, value: &Value) -> EmitResult<ValueId> {
        Ok(self.handle(value)?.ptr)
    }

    fn bind(&self, ptr: ValueId, ty: ValueType, layout: MemoryLayout) -> EmitResult<Value> {
        let ty = ty.base();
        let mut handles = self.handles.borrow_mut();
        let raw = u32::try_from(handles.len())
            .map_err(|_| EmitError::Backend("handle space exhausted".to_string()))?;
        handles.push(Handle { ptr, ty });
        Ok(Value::from_emittable(Emittable::new(raw), ty, layout))
    }

    fn require_function(&self, what: &str) -> EmitResult<FunctionId> {
        self.emitter()
            .current_function()
            .ok_or_else(|| EmitError::illegal_state(format!("{what} outside a function")))
    }

    fn require_block(&self, what: &str) -> EmitResult<BlockId> {
        self.require_function(what)?;
        self.emitter()
            .current_block()
            .ok_or_else(|| EmitError::illegal_state(format!("{what} without an insertion point")))
    }

    fn global_name(&self, scope: GlobalAllocationScope, name: &str) -> String {
        match scope {
            GlobalAllocationScope::Global => name.to_string(),
            GlobalAllocationScope::Function => {
                let function = self.function_stack.borrow().last().cloned().unwrap_or_default();
                format!("{function}.{name}")
            }
        }
    }

    /// Load a rank-0 value's element.
    fn load_scalar(&self, scalar: &Scalar) -> EmitResult<ValueId> {
        let ptr = self.pointer(scalar.value())?;
        self.emitter().load(scalar.ty(), ptr)
    }
}

impl LlvmEmitterContext {
    /// Pointer to the element of `value` at `coordinates`. Rank-0 values
    /// are broadcast.
    fn element_ptr(&self, value: &Value, coordinates: &[Scalar]) -> EmitResult<ValueId> {
        if value.layout()?.is_scalar() {
            return self.state.pointer(value);
        }
        let element = self.offset_coordinates(value, coordinates)?;
        self.state.pointer(&element)
    }

    /// Fill `result` elementwise, loading one element of every operand per
    /// coordinate and storing what `f` computes from them.
    fn elementwise(
        &self,
        result: &Value,
        operands: &[&Value],
        mut f: impl FnMut(&mut IrEmitter<'static>, &[ValueId]) -> EmitResult<ValueId>,
    ) -> EmitResult<()> {
        let shape = result.layout()?.clone();
        self.for_each(&shape, &mut |coordinates| {
            let mut pointers = Vec::with_capacity(operands.len());
            for operand in operands {
                pointers.push((operand.base_type(), self.element_ptr(operand, coordinates)?));
            }
            let out = self.element_ptr(result, coordinates)?;
            let mut emitter = self.state.emitter();
            let mut loaded = Vec::with_capacity(pointers.len());
            for (ty, ptr) in pointers {
                loaded.push(emitter.load(ty, ptr)?);
            }
            let computed = f(&mut *emitter, &loaded)?;
            emitter.store(computed, out)
        })
    }

    /// Fresh unpadded storage shaped like `like`.
    fn allocate_like(&self, ty: ValueType, like: &Value) -> EmitResult<Value> {
        self.allocate(ty, &MemoryLayout::new(like.layout()?.logical_size())?)
    }

    fn emit_loops(
        &self,
        sizes: &[usize],
        indices: &mut Vec<Scalar>,
        body: &mut dyn FnMut(&[Scalar]) -> EmitResult<()>,
    ) -> EmitResult<()> {
        let Some((&extent, rest)) = sizes.split_first() else {
            return body(indices);
        };
        let frame = self.begin_loop(extent)?;
        indices.push(frame.index.clone());
        let result = self.emit_loops(rest, indices, body);
        indices.pop();
        result?;
        self.end_loop(&frame)
    }

    fn begin_loop(&self, extent: usize) -> EmitResult<LoopFrame> {
        let extent = i32::try_from(extent)
            .map_err(|_| EmitError::invalid_argument(format!("loop extent {extent} exceeds int32")))?;
        let current = self.state.require_block("loop")?;
        let (counter, cond, exit) = {
            let mut e = self.state.emitter();
            let counter = e.variable(ValueType::Int32, "i")?;
            let zero = e.literal_i32(0);
            e.store(zero, counter)?;

            let cond = e.block_after(current, "loop.cond");
            let body = e.block_after(cond, "loop.body");
            let exit = e.block_after(body, "loop.exit");
            e.branch(cond)?;

            e.set_current_block(cond);
            let i = e.load(ValueType::Int32, counter)?;
            let n = e.literal_i32(extent);
            let more = e.cmp(ComparisonType::Lt, i, n)?;
            e.branch_if(more, body, exit)?;
            e.set_current_block(body);
            (counter, cond, exit)
        };
        let index = Scalar::new(self.state.bind(counter, ValueType::Int32, MemoryLayout::scalar())?)?;
        Ok(LoopFrame {
            counter,
            cond,
            exit,
            index,
        })
    }

    fn end_loop(&self, frame: &LoopFrame) -> EmitResult<()> {
        let mut e = self.state.emitter();
        if !e.is_terminated() {
            let i = e.load(ValueType::Int32, frame.counter)?;
            let one = e.literal_i32(1);
            let next = e.binary_op(OperatorType::Add, i, one)?;
            e.store(next, frame.counter)?;
            e.branch(frame.cond)?;
        }
        e.set_current_block(frame.exit);
        Ok(())
    }

    fn reduce(&self, intrinsic: Intrinsic, vector: &Value, result: &Value) -> EmitResult<()> {
        let ty = vector.base_type();
        let mut first = self.store_constant_data(ConstantData::Int32(vec![0]))?;
        first.set_layout(MemoryLayout::scalar());
        let start = self.element_ptr(vector, &[Scalar::new(first)?])?;
        let accumulator = self.state.pointer(result)?;
        {
            let mut e = self.state.emitter();
            let v = e.load(ty, start)?;
            e.store(v, accumulator)?;
        }
        let shape = vector.layout()?.clone();
        self.for_each(&shape, &mut |coordinates| {
            let element = self.element_ptr(vector, coordinates)?;
            let mut e = self.state.emitter();
            let acc = e.load(ty, accumulator)?;
            let next = e.load(ty, element)?;
            let folded = e.intrinsic(intrinsic, ty, &[acc, next])?;
            e.store(folded, accumulator)
        })
    }

    fn call_intrinsic(&self, intrinsic: Intrinsic, args: &[Value]) -> EmitResult<Value> {
        let template = check_intrinsic_call(intrinsic, args)?;
        let result = self.allocate(template.ty(), template.layout()?)?;
        let ty = template.ty();
        if matches!(intrinsic, Intrinsic::MaxNum | Intrinsic::MinNum) && args.len() == 1 {
            self.reduce(intrinsic, &args[0], &result)?;
        } else {
            let operands: Vec<&Value> = args.iter().collect();
            self.elementwise(&result, &operands, |e, v| e.intrinsic(intrinsic, ty, v))?;
        }
        Ok(result)
    }

    /// The LLVM function for `declaration`: already known, materialized from
    /// its definition, or declared external.
    fn function_id(&self, declaration: &FunctionDeclaration) -> EmitResult<FunctionId> {
        if let Some(entry) = self.state.functions.borrow().get(declaration.name()) {
            return Ok(entry.id);
        }
        if let Some(body) = declaration.definition() {
            self.create_function_impl(declaration, Rc::clone(body))?;
            return self
                .state
                .functions
                .borrow()
                .get(declaration.name())
                .map(|entry| entry.id)
                .ok_or_else(|| EmitError::InvalidFunction(declaration.name().to_string()));
        }
        let params = parameter_types(declaration)?;
        let id = self
            .state
            .emitter()
            .declare_function(declaration.name(), declaration.return_type(), &params)?;
        debug!(name = declaration.name(), "declared external function");
        self.state.functions.borrow_mut().insert(
            declaration.name().to_string(),
            FunctionEntry {
                declaration: declaration.clone(),
                id,
            },
        );
        Ok(id)
    }

    /// Emit the body of a function whose signature is already open.
    fn emit_body(&self, declaration: &FunctionDeclaration, body: &FunctionBody) -> EmitResult<()> {
        let mut params = Vec::with_capacity(declaration.parameters().len());
        for (index, param) in (0u32..).zip(declaration.parameters()) {
            let mut e = self.state.emitter();
            let raw = e.param(index)?;
            let value = if param.is_scalar() {
                let slot = e.variable(param.ty, &param.name)?;
                e.store(raw, slot)?;
                drop(e);
                self.state.bind(slot, param.ty, MemoryLayout::scalar())?
            } else {
                drop(e);
                self.state.bind(raw, param.ty, param.layout.clone())?
            };
            params.push(value);
        }

        let returned = body(&params)?;
        if declaration.returns_void() {
            let mut e = self.state.emitter();
            if !e.is_terminated() {
                e.return_void()?;
            }
            return Ok(());
        }
        let value = returned.ok_or_else(|| {
            EmitError::invalid_argument(format!("`{}` returned no value", declaration.name()))
        })?;
        let expected = declaration.return_type().base();
        if value.base_type() != expected {
            return Err(EmitError::TypeMismatch {
                expected,
                found: value.base_type(),
            });
        }
        let ptr = self.state.pointer(&value)?;
        let mut e = self.state.emitter();
        let v = e.load(expected, ptr)?;
        e.return_value(v)
    }
}

struct LoopFrame {
    counter: ValueId,
    cond: BlockId,
    exit: BlockId,
    index: Scalar,
}

/// LLVM parameter types: scalars by value, everything else by pointer.
fn parameter_types(declaration: &FunctionDeclaration) -> EmitResult<Vec<ValueType>> {
    declaration
        .parameters()
        .iter()
        .map(|p| {
            if p.is_scalar() {
                Ok(p.ty.base())
            } else {
                p.ty.base().pointer_to().ok_or_else(|| {
                    EmitError::InvalidValueType(format!("no pointer type for {}", p.ty))
                })
            }
        })
        .collect()
}

impl EmitterContext for LlvmEmitterContext {
    fn allocate_impl(&self, ty: ValueType, layout: &MemoryLayout) -> EmitResult<Value> {
        self.state.require_function("allocation")?;
        let ptr = {
            let mut e = self.state.emitter();
            match layout.memory_size() {
                1 => e.variable(ty, "var")?,
                n => e.stack_alloc(ty, n)?,
            }
        };
        self.state.bind(ptr, ty, layout.clone())
    }

    fn global_value(&self, scope: GlobalAllocationScope, name: &str) -> EmitResult<Option<Value>> {
        let key = (scope, self.state.global_name(scope, name));
        Ok(self.state.globals.borrow().get(&key).cloned())
    }

    fn global_allocate_impl(
        &self,
        scope: GlobalAllocationScope,
        name: &str,
        ty: ValueType,
        layout: &MemoryLayout,
    ) -> EmitResult<Value> {
        let mangled = self.state.global_name(scope, name);
        debug!(name = %mangled, ?scope, %ty, "global allocation");
        let ptr = self
            .state
            .emitter()
            .global_array(&mangled, ty, layout.memory_size())?;
        let value = self.state.bind(ptr, ty, layout.clone())?;
        self.state
            .globals
            .borrow_mut()
            .insert((scope, mangled), value.clone());
        Ok(value)
    }

    fn type_of_impl(&self, emittable: Emittable) -> EmitResult<ValueType> {
        let handle = self
            .state
            .handles
            .borrow()
            .get(emittable.index())
            .copied()
            .ok_or_else(|| EmitError::invalid_argument(format!("unknown handle {}", emittable.raw())))?;
        handle
            .ty
            .pointer_to()
            .ok_or_else(|| EmitError::InvalidValueType(format!("no pointer type for {}", handle.ty)))
    }

    #[instrument(skip(self, declaration, body), fields(name = declaration.name()), level = "debug")]
    fn create_function_impl(
        &self,
        declaration: &FunctionDeclaration,
        body: FunctionBody,
    ) -> EmitResult<FunctionDeclaration> {
        let name = declaration.name();
        if let Some(entry) = self.state.functions.borrow().get(name) {
            if entry.declaration.is_defined() {
                return Err(EmitError::InvalidFunction(name.to_string()));
            }
        }
        if declaration.return_type().is_pointer() {
            return Err(EmitError::invalid_argument(format!(
                "`{name}` cannot return {}",
                declaration.return_type()
            )));
        }
        let params = parameter_types(declaration)?;
        let named: Vec<(&str, ValueType)> = declaration
            .parameters()
            .iter()
            .zip(&params)
            .map(|(p, &ty)| (p.name.as_str(), ty))
            .collect();

        let defined = declaration.clone().with_definition(Rc::clone(&body));
        let saved = self.state.emitter().position();
        let opened = self.state.emitter().function_named(
            name,
            declaration.return_type(),
            FunctionLinkage::External,
            &named,
        );
        let id = match opened {
            Ok(id) => id,
            Err(err) => {
                self.state.emitter().restore_position(saved);
                return Err(err);
            }
        };
        // Registered before the body so it can call itself.
        self.state.functions.borrow_mut().insert(
            name.to_string(),
            FunctionEntry {
                declaration: defined.clone(),
                id,
            },
        );

        self.state.function_stack.borrow_mut().push(name.to_string());
        let result = self.emit_body(declaration, &body);
        self.state.function_stack.borrow_mut().pop();
        self.state.emitter().restore_position(saved);
        result?;
        Ok(defined)
    }

    fn store_constant_data_impl(&self, data: ConstantData) -> EmitResult<Value> {
        let ty = data.value_type();
        let layout = MemoryLayout::new([data.len()])?;
        let in_function = self.state.emitter().current_function().is_some();
        let ptr = {
            let mut e = self.state.emitter();
            if in_function && data.len() == 1 {
                let slot = e.variable(ty, "const")?;
                let literal = e.literal_element(&data, 0)?;
                e.store(literal, slot)?;
                slot
            } else {
                e.constant_array(".const", &data)?
            }
        };
        trace!(%ty, len = data.len(), "constant data");
        self.state.bind(ptr, ty, layout)
    }

    fn for_impl(
        &self,
        layout: &MemoryLayout,
        body: &mut dyn FnMut(&[Scalar]) -> EmitResult<()>,
    ) -> EmitResult<()> {
        if layout.is_scalar() {
            return body(&[]);
        }
        self.state.require_function("loop")?;
        let sizes = layout.logical_size();
        let mut indices = Vec::with_capacity(sizes.len());
        self.emit_loops(&sizes, &mut indices, body)
    }

    fn copy_data_impl(&self, source: &Value, destination: &mut Value) -> EmitResult<()> {
        self.state.require_function("copy")?;
        let (from, to) = (self.state.pointer(source)?, self.state.pointer(destination)?);
        let count = source.layout()?.memory_size();
        trace!(count, "copy data");
        self.state
            .emitter()
            .memcpy(source.base_type(), from, to, count)
    }

    fn offset_impl(&self, begin: &Value, index: &Scalar) -> EmitResult<Value> {
        self.state.require_function("offset")?;
        let base = self.state.pointer(begin)?;
        let index = self.state.load_scalar(index)?;
        let element = self.state.emitter().gep(begin.base_type(), base, index)?;
        self.state.bind(element, begin.ty(), MemoryLayout::scalar())
    }

    fn unary_operation_impl(&self, op: ValueUnaryOperation, value: &Value) -> EmitResult<Value> {
        let result = self.allocate_like(ValueType::Boolean, value)?;
        match op {
            ValueUnaryOperation::LogicalNot => {
                self.elementwise(&result, &[value], |e, v| e.not(v[0]))?;
            }
        }
        Ok(result)
    }

    fn binary_operation_impl(
        &self,
        op: ValueBinaryOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value> {
        let operator = OperatorType::for_operation(op, lhs.base_type());
        let result = self.allocate_like(lhs.base_type(), lhs)?;
        self.elementwise(&result, &[lhs, rhs], |e, v| e.binary_op(operator, v[0], v[1]))?;
        Ok(result)
    }

    fn logical_operation_impl(
        &self,
        op: ValueLogicalOperation,
        lhs: &Value,
        rhs: &Value,
    ) -> EmitResult<Value> {
        let comparison = ComparisonType::for_operation(op, lhs.base_type());
        let result = self.allocate_like(ValueType::Boolean, lhs)?;
        self.elementwise(&result, &[lhs, rhs], |e, v| e.cmp(comparison, v[0], v[1]))?;
        Ok(result)
    }

    fn cast_impl(&self, value: &Value, ty: ValueType) -> EmitResult<Value> {
        let from = value.base_type();
        let result = self.allocate_like(ty, value)?;
        self.elementwise(&result, &[value], |e, v| e.convert(v[0], from, ty))?;
        Ok(result)
    }

    fn if_impl(&self, test: &Scalar, body: IfBody<'_>) -> EmitResult<IfContext> {
        let current = self.state.require_block("conditional")?;
        let cond = self.state.load_scalar(test)?;
        let (next, merge) = {
            let mut e = self.state.emitter();
            let then_block = e.block_after(current, "if.then");
            let next = e.block_after(then_block, "if.next");
            let merge = e.block_after(next, "if.end");
            e.branch_if(cond, then_block, next)?;
            e.set_current_block(then_block);
            (next, merge)
        };
        body()?;
        {
            let mut e = self.state.emitter();
            if !e.is_terminated() {
                e.branch(merge)?;
            }
            e.set_current_block(next);
        }
        Ok(IfContext::new(Box::new(LlvmIf {
            state: Rc::clone(&self.state),
            merge,
            finished: false,
        })))
    }

    #[instrument(skip(self, declaration, args), fields(name = declaration.name()), level = "debug")]
    fn call_impl(
        &self,
        declaration: &FunctionDeclaration,
        args: &[Value],
    ) -> EmitResult<Option<Value>> {
        if let Some(intrinsic) = declaration.intrinsic() {
            return self.call_intrinsic(intrinsic, args).map(Some);
        }
        self.state.require_function("call")?;
        let id = self.function_id(declaration)?;

        let mut arg_ids = Vec::with_capacity(args.len());
        for (param, arg) in declaration.parameters().iter().zip(args) {
            let ptr = self.state.pointer(arg)?;
            if param.is_scalar() {
                arg_ids.push(self.state.emitter().load(arg.base_type(), ptr)?);
            } else {
                arg_ids.push(ptr);
            }
        }

        let returned = self.state.emitter().call(id, &arg_ids)?;
        let Some(returned) = returned else {
            return Ok(None);
        };
        let ty = declaration.return_type();
        let slot = {
            let mut e = self.state.emitter();
            let slot = e.variable(ty, "ret")?;
            e.store(returned, slot)?;
            slot
        };
        self.state.bind(slot, ty, MemoryLayout::scalar()).map(Some)
    }
}

/// Open conditional. The insertion point sits in the block reached when
/// every test so far was false.
struct LlvmIf {
    state: Rc<LlvmState>,
    merge: BlockId,
    finished: bool,
}

impl IfContextImpl for LlvmIf {
    fn else_if(&mut self, test: &Scalar, body: IfBody<'_>) -> EmitResult<()> {
        let current = self.state.require_block("conditional")?;
        let cond = self.state.load_scalar(test)?;
        let next = {
            let mut e = self.state.emitter();
            let then_block = e.block_after(current, "if.then");
            let next = e.block_after(then_block, "if.next");
            e.branch_if(cond, then_block, next)?;
            e.set_current_block(then_block);
            next
        };
        body()?;
        let mut e = self.state.emitter();
        if !e.is_terminated() {
            e.branch(self.merge)?;
        }
        e.set_current_block(next);
        Ok(())
    }

    fn otherwise(&mut self, body: IfBody<'_>) -> EmitResult<()> {
        body()
    }

    fn finish(&mut self) -> EmitResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let mut e = self.state.emitter();
        if !e.is_terminated() {
            e.branch(self.merge)?;
        }
        e.set_current_block(self.merge);
        Ok(())
    }
}

impl Drop for LlvmIf {
    fn drop(&mut self) {
        // An `IfContext` dropped without `end` still closes its blocks.
        if let Err(err) = self.finish() {
            error!(%err, "failed to close conditional");
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
