use super::*;
use ell_value::{active, ComputeContext, ContextGuard, Element, Elementwise, Vector};
use inkwell::targets::{InitializationConfig, Target};
use inkwell::OptimizationLevel;
use pretty_assertions::assert_eq;

fn activate(name: &str) -> (Rc<LlvmEmitterContext>, ContextGuard) {
    crate::init_tracing();
    let ctx = Rc::new(LlvmEmitterContext::new(LlvmEmitterConfig::new(name)));
    let guard = ContextGuard::new(ctx.clone());
    (ctx, guard)
}

fn store_int(value: i32, destination: &Value) -> EmitResult<()> {
    let constant = active::store_constant_data(ConstantData::Int32(vec![value]))?;
    active::copy_data(&constant, &mut destination.clone())
}

#[test]
fn contexts_on_one_thread_share_the_llvm_context() {
    let first = LlvmEmitterContext::new(LlvmEmitterConfig::new("first"));
    let second = LlvmEmitterContext::new(LlvmEmitterConfig::new("second"));
    let a = first.with_emitter(|e| std::ptr::from_ref(e.context()));
    let b = second.with_emitter(|e| std::ptr::from_ref(e.context()));
    assert_eq!(a, b);
    // Modules stay separate.
    assert!(first.ir().contains("first"));
    assert!(!second.ir().contains("first"));
}

#[test]
fn config_defaults_to_quiet() {
    let config = LlvmEmitterConfig::new("quiet");
    assert_eq!(config.module_name, "quiet");
    assert!(!config.debug_ir);
}

// -- Functions --

#[test]
fn scalar_function_verifies() {
    let (ctx, _guard) = activate("scale");
    let decl = FunctionDeclaration::new("scale_add")
        .returns(ValueType::Double)
        .scalar_parameter("x", ValueType::Double)
        .scalar_parameter("y", ValueType::Double)
        .define(|args| {
            let x = Scalar::new(args[0].clone())?;
            let y = Scalar::new(args[1].clone())?;
            let two = Scalar::constant(2.0)?;
            Ok(Some(x.multiply(&two)?.add(&y)?.into_value()))
        })
        .unwrap();
    assert!(decl.is_defined());

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("define double @scale_add(double %x, double %y)"));
    assert!(ir.contains("fmul double"));
}

#[test]
fn calls_between_defined_functions() {
    let (ctx, _guard) = activate("calls");
    let square = FunctionDeclaration::new("square")
        .returns(ValueType::Double)
        .scalar_parameter("x", ValueType::Double)
        .define(|args| {
            let x = Scalar::new(args[0].clone())?;
            Ok(Some(x.multiply(&x)?.into_value()))
        })
        .unwrap();
    FunctionDeclaration::new("fourth")
        .returns(ValueType::Double)
        .scalar_parameter("x", ValueType::Double)
        .define(move |args| {
            let squared = square.call(args)?;
            let squared = squared.ok_or_else(|| EmitError::illegal_state("no result"))?;
            square.call(&[squared])
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert_eq!(ir.matches("call double @square").count(), 2);
}

#[test]
fn undefined_callee_is_declared_external() {
    let (ctx, _guard) = activate("external");
    let ext = FunctionDeclaration::new("ext")
        .returns(ValueType::Int32)
        .scalar_parameter("n", ValueType::Int32);
    FunctionDeclaration::new("caller")
        .returns(ValueType::Int32)
        .scalar_parameter("n", ValueType::Int32)
        .define(move |args| ext.call(args))
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("declare i32 @ext(i32)"));
    assert!(ir.contains("call i32 @ext"));
}

#[test]
fn pointer_returns_are_rejected() {
    let (_ctx, _guard) = activate("pointer_return");
    let result = FunctionDeclaration::new("p")
        .returns(ValueType::PInt32)
        .define(|_| Ok(None));
    assert!(matches!(result, Err(EmitError::InvalidArgument(_))));
}

#[test]
fn missing_return_value_is_rejected() {
    let (_ctx, _guard) = activate("no_value");
    let result = FunctionDeclaration::new("f")
        .returns(ValueType::Int32)
        .define(|_| Ok(None));
    assert!(matches!(result, Err(EmitError::InvalidArgument(_))));
}

#[test]
fn redefinition_is_invalid_function() {
    let (_ctx, _guard) = activate("twice");
    let decl = FunctionDeclaration::new("g");
    decl.define(|_| Ok(None)).unwrap();
    assert_eq!(
        decl.define(|_| Ok(None)).unwrap_err(),
        EmitError::InvalidFunction("g".to_string())
    );
}

// -- Storage --

#[test]
fn allocation_needs_a_function() {
    let ctx = LlvmEmitterContext::new(LlvmEmitterConfig::new("top_level"));
    assert!(matches!(
        ctx.allocate_n(ValueType::Int32, 3),
        Err(EmitError::IllegalState(_))
    ));
}

#[test]
fn globals_are_reused_by_name() {
    let ctx = LlvmEmitterContext::new(LlvmEmitterConfig::new("globals"));
    let first = ctx
        .global_allocate("table", ValueType::Int32, &MemoryLayout::new([4]).unwrap())
        .unwrap();
    let again = ctx
        .global_allocate("table", ValueType::Int32, &MemoryLayout::new([2]).unwrap())
        .unwrap();
    assert_eq!(first.emittable(), again.emittable());
    assert_eq!(again.layout().unwrap().size(), &[2]);
    assert_eq!(
        ctx.type_of(first.emittable().unwrap()),
        Ok(ValueType::PInt32)
    );

    assert_eq!(
        ctx.global_allocate("table", ValueType::Int32, &MemoryLayout::new([5]).unwrap()),
        Err(EmitError::InvalidSize {
            requested: 5,
            capacity: 4
        })
    );
    assert_eq!(
        ctx.global_allocate("table", ValueType::Double, &MemoryLayout::new([1]).unwrap()),
        Err(EmitError::TypeMismatch {
            expected: ValueType::Int32,
            found: ValueType::Double
        })
    );
    assert!(ctx.ir().contains("@table = internal global [4 x i32] zeroinitializer"));
}

#[test]
fn static_storage_is_private_to_its_function() {
    let (ctx, _guard) = activate("statics");
    FunctionDeclaration::new("counter")
        .define(|_| {
            let count = active::static_allocate("count", ValueType::Int32, &MemoryLayout::scalar())?;
            store_int(1, &count)?;
            Ok(None)
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("@counter.count"));
}

#[test]
fn offsets_address_single_elements() {
    let (ctx, _guard) = activate("offsets");
    FunctionDeclaration::new("third")
        .returns(ValueType::Int32)
        .parameter("v", ValueType::Int32, MemoryLayout::new([4]).unwrap())
        .define(|args| {
            let two = Scalar::constant(2i32)?;
            let element = active::offset_coordinates(&args[0], &[two])?;
            assert_eq!(element.rank(), Some(0));
            Ok(Some(element))
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("define i32 @third(ptr %v)"));
    assert!(ir.contains("getelementptr inbounds i32"));
}

// -- Control flow --

#[test]
fn loops_nest_per_dimension() {
    let (ctx, _guard) = activate("loops");
    FunctionDeclaration::new("visit")
        .define(|_| {
            let mut visits = 0;
            active::for_each(&MemoryLayout::new([2, 3]).unwrap(), |coordinates| {
                assert_eq!(coordinates.len(), 2);
                visits += 1;
                Ok(())
            })?;
            // Emitted once, executed per coordinate.
            assert_eq!(visits, 1);
            Ok(None)
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.matches("loop.cond").count() >= 2);
    assert!(ir.contains("icmp slt i32"));
}

#[test]
fn conditional_chain_verifies() {
    let (ctx, _guard) = activate("classify");
    FunctionDeclaration::new("classify")
        .returns(ValueType::Int32)
        .scalar_parameter("x", ValueType::Int32)
        .define(|args| {
            let x = Scalar::new(args[0].clone())?;
            let zero = Scalar::constant(0i32)?;
            let negative = x.less_than(&zero)?;
            let is_zero = x.equal(&zero)?;
            let result = active::allocate(ValueType::Int32, &MemoryLayout::scalar())?;

            let (r1, r2, r3) = (result.clone(), result.clone(), result.clone());
            active::if_then(&negative, move || store_int(-1, &r1))?
                .else_if(&is_zero, move || store_int(0, &r2))?
                .otherwise(move || store_int(1, &r3))?;
            Ok(Some(result))
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("if.then"));
    assert!(ir.contains("if.end"));
}

#[test]
fn conditional_without_fallback_verifies() {
    let (ctx, _guard) = activate("clamp");
    FunctionDeclaration::new("clamp")
        .returns(ValueType::Int32)
        .scalar_parameter("x", ValueType::Int32)
        .define(|args| {
            let x = Scalar::new(args[0].clone())?;
            let zero = Scalar::constant(0i32)?;
            let negative = x.less_than(&zero)?;
            let target = x.value().clone();
            active::if_then(&negative, move || store_int(0, &target))?.end()?;
            Ok(Some(x.into_value()))
        })
        .unwrap();
    ctx.finish().unwrap();
}

// -- Elementwise --

#[test]
fn vector_intrinsics_loop_over_elements() {
    let (ctx, _guard) = activate("roots");
    FunctionDeclaration::new("roots")
        .parameter("v", ValueType::Double, MemoryLayout::new([4]).unwrap())
        .define(|args| {
            let v = Vector::new(args[0].clone())?;
            let roots = ell_value::sqrt(&v)?;
            active::copy_data(roots.value(), &mut args[0].clone())?;
            Ok(None)
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("llvm.sqrt.f64"));
    assert!(ir.contains("llvm.memcpy"));
}

#[test]
fn reductions_fold_every_element() {
    let (ctx, _guard) = activate("reduce");
    FunctionDeclaration::new("largest")
        .returns(ValueType::Double)
        .parameter("v", ValueType::Double, MemoryLayout::new([3]).unwrap())
        .define(|args| {
            let v = Vector::new(args[0].clone())?;
            Ok(Some(ell_value::max_element(&v)?.into_value()))
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("llvm.maxnum.f64"));
}

#[test]
fn casts_convert_each_element() {
    let (ctx, _guard) = activate("casts");
    FunctionDeclaration::new("widen")
        .returns(ValueType::Double)
        .scalar_parameter("b", ValueType::Byte)
        .define(|args| {
            let b = Scalar::new(args[0].clone())?;
            Ok(Some(b.cast(ValueType::Double)?.into_value()))
        })
        .unwrap();

    let ir = ctx.finish().unwrap();
    assert!(ir.contains("uitofp i8"));
}

#[test]
fn rejected_comparison_emits_nothing() {
    let ctx = LlvmEmitterContext::new(LlvmEmitterConfig::new("reject"));
    let lhs = ctx.store_constant_data(ConstantData::Int32(vec![1, 2])).unwrap();
    let rhs = ctx.store_constant_data(ConstantData::Double(vec![1.0, 2.0])).unwrap();
    let before = ctx.ir();
    assert!(matches!(
        ctx.logical_operation(ValueLogicalOperation::Equality, &lhs, &rhs),
        Err(EmitError::InvalidArgument(_))
    ));
    assert_eq!(ctx.ir(), before);
}

// -- Agreement with ComputeContext --

type Body = fn(&Scalar, &Scalar) -> EmitResult<Scalar>;

/// `body` with its result converted to `Int32`, so both backends report
/// through the same host type.
fn widened(body: Body, a: &Scalar, b: &Scalar) -> EmitResult<Scalar> {
    body(a, b)?.cast(ValueType::Int32)
}

fn on_compute<A: Element>(body: Body, a: A, b: A) -> i32 {
    let ctx = Rc::new(ComputeContext::new("reference"));
    let _guard = ContextGuard::new(ctx.clone());
    let (a, b) = (Scalar::constant(a).unwrap(), Scalar::constant(b).unwrap());
    let result = widened(body, &a, &b).unwrap();
    match ctx.read(result.value()).unwrap() {
        ConstantData::Int32(values) => values[0],
        other => panic!("expected int32 data, got {other:?}"),
    }
}

fn on_llvm<A: Element>(name: &str, body: Body, a: A, b: A) -> i32 {
    let (ctx, _guard) = activate(name);
    FunctionDeclaration::new(name)
        .returns(ValueType::Int32)
        .scalar_parameter("a", A::VALUE_TYPE)
        .scalar_parameter("b", A::VALUE_TYPE)
        .define(move |args| {
            let a = Scalar::new(args[0].clone())?;
            let b = Scalar::new(args[1].clone())?;
            Ok(Some(widened(body, &a, &b)?.into_value()))
        })
        .unwrap();
    ctx.finish().unwrap();
    jit_call(&ctx, name, a, b)
}

#[allow(unsafe_code, reason = "calls JIT-compiled code")]
fn jit_call<A>(ctx: &LlvmEmitterContext, name: &str, a: A, b: A) -> i32 {
    Target::initialize_native(&InitializationConfig::default()).unwrap();
    ctx.with_emitter(|e| {
        let ee = e
            .module()
            .create_jit_execution_engine(OptimizationLevel::None)
            .unwrap();
        // SAFETY: `name` was verified with two `A` parameters and an i32 result.
        unsafe {
            let f = ee
                .get_function::<unsafe extern "C" fn(A, A) -> i32>(name)
                .unwrap();
            f.call(a, b)
        }
    })
}

fn agree<A: Element>(name: &str, body: Body, a: A, b: A) -> i32 {
    let expected = on_compute(body, a, b);
    assert_eq!(on_llvm(name, body, a, b), expected, "{name}");
    expected
}

#[test]
fn bytes_order_and_divide_unsigned_on_both_backends() {
    assert_eq!(agree("byte_lt", |a, b| a.less_than(b), 200u8, 100u8), 0);
    assert_eq!(agree("byte_ge", |a, b| a.greater_equal(b), 200u8, 100u8), 1);
    assert_eq!(agree("byte_div", |a, b| a.divide(b), 200u8, 7u8), 28);
    assert_eq!(agree("byte_mod", |a, b| a.modulo(b), 200u8, 7u8), 4);
}

#[test]
fn byte_intrinsics_agree_across_backends() {
    assert_eq!(agree("byte_max", |a, b| ell_value::max(a, b), 200u8, 100u8), 200);
    assert_eq!(agree("byte_min", |a, b| ell_value::min(a, b), 200u8, 100u8), 100);
    assert_eq!(agree("byte_abs", |a, _| ell_value::abs(a), 200u8, 0u8), 200);
}

#[test]
fn booleans_order_false_before_true() {
    assert_eq!(agree("bool_lt", |a, b| a.less_than(b), true, false), 0);
    assert_eq!(agree("bool_gt", |a, b| a.greater_than(b), true, false), 1);
}

#[test]
fn nan_inequality_agrees_across_backends() {
    assert_eq!(agree("nan_ne", |a, b| a.not_equal(b), f64::NAN, f64::NAN), 1);
    assert_eq!(agree("nan_eq", |a, b| a.equal(b), f64::NAN, f64::NAN), 0);
    assert_eq!(agree("nan_lt", |a, b| a.less_than(b), f64::NAN, 1.0), 0);
}

#[test]
fn signed_kinds_stay_signed() {
    assert_eq!(agree("char_lt", |a, b| a.less_than(b), -3i8, 2i8), 1);
    assert_eq!(agree("char_abs", |a, _| ell_value::abs(a), -3i8, 0i8), 3);
    assert_eq!(agree("short_div", |a, b| a.divide(b), -7i16, 2i16), -3);
}
