use super::*;
use crate::operators::{ComparisonType, OperatorType};
use ell_value::{ConstantData, Intrinsic};
use pretty_assertions::assert_eq;

/// Helper: begin `test_fn() -> i32` and position at its entry block.
fn setup_emitter(irb: &mut IrEmitter<'_>) -> FunctionId {
    irb.function("test_fn", ValueType::Int32, FunctionLinkage::External, &[])
        .unwrap()
}

// -- Types --

#[test]
fn pointer_variants_are_pointers_to_their_base() {
    let ctx = Context::create();
    let irb = IrEmitter::new(&ctx, "types");
    for base in ValueType::BASE {
        let pointer = base.pointer_to().unwrap();
        assert_eq!(irb.ty(pointer), AnyTypeEnum::from(irb.pointer_to(irb.ty(base))));
    }
}

#[test]
fn void_has_no_storable_type() {
    let ctx = Context::create();
    let irb = IrEmitter::new(&ctx, "types");
    assert!(matches!(
        irb.basic_type(ValueType::Void),
        Err(EmitError::InvalidValueType(_))
    ));
    assert!(irb.basic_type(ValueType::Char8).unwrap().is_int_type());
    assert!(irb.basic_type(ValueType::Double).unwrap().is_float_type());
}

// -- Constants --

#[test]
fn string_literals_are_interned() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "strings");
    let hello = irb.literal_str("hello");
    let again = irb.literal_str("hello");
    let world = irb.literal_str("world");
    assert_eq!(hello, again);
    assert_ne!(hello, world);
    assert!(irb.raw_value(hello).is_pointer_value());
    drop(irb);
}

#[test]
fn negative_literals_sign_extend() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "literals");
    let id = irb.literal_i16(-2);
    let v = irb.raw_value(id).into_int_value();
    assert_eq!(v.get_sign_extended_constant(), Some(-2));
    assert_eq!(v.get_type().get_bit_width(), 16);
    drop(irb);
}

// -- Functions --

#[test]
fn named_parameters_are_bound_in_order() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "named");
    let f = irb
        .declare_function_named(
            "f",
            ValueType::Double,
            &[("x", ValueType::Int32), ("y", ValueType::Double)],
        )
        .unwrap();
    assert_eq!(irb.param_names(f), vec!["x".to_string(), "y".to_string()]);
    drop(irb);
}

#[test]
fn redeclaring_with_another_signature_fails() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "redeclare");
    irb.declare_function("g", ValueType::Void, &[ValueType::Int32])
        .unwrap();
    assert!(irb
        .declare_function("g", ValueType::Void, &[ValueType::Int32])
        .is_ok());
    assert!(matches!(
        irb.declare_function("g", ValueType::Int64, &[]),
        Err(EmitError::InvalidFunction(_))
    ));
    drop(irb);
}

#[test]
fn defining_twice_fails() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "twice");
    irb.function("h", ValueType::Void, FunctionLinkage::Internal, &[])
        .unwrap();
    irb.return_void().unwrap();
    assert!(matches!(
        irb.function("h", ValueType::Void, FunctionLinkage::Internal, &[]),
        Err(EmitError::InvalidFunction(_))
    ));
    drop(irb);
}

#[test]
fn call_checks_arity() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "calls");
    let callee = irb
        .declare_function("two", ValueType::Int32, &[ValueType::Int32, ValueType::Int32])
        .unwrap();
    setup_emitter(&mut irb);
    let one = irb.literal_i32(1);
    assert!(matches!(
        irb.call(callee, &[one]),
        Err(EmitError::InvalidArgument(_))
    ));
    let result = irb.call(callee, &[one, one]).unwrap().unwrap();
    irb.return_value(result).unwrap();
    irb.verify().unwrap();
    drop(irb);
}

// -- Arithmetic and control flow --

#[test]
fn arithmetic_function_verifies() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "arith");
    irb.function_named(
        "mul_add",
        ValueType::Int32,
        FunctionLinkage::External,
        &[("a", ValueType::Int32), ("b", ValueType::Int32)],
    )
    .unwrap();
    let a = irb.param(0).unwrap();
    let b = irb.param(1).unwrap();
    let product = irb.binary_op(OperatorType::Multiply, a, b).unwrap();
    let sum = irb.binary_op(OperatorType::Add, product, a).unwrap();
    irb.return_value(sum).unwrap();
    irb.verify().unwrap();
    assert!(irb.print_to_string().contains("mul i32"));
    drop(irb);
}

#[test]
fn mixed_operand_classes_are_rejected() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "mixed");
    setup_emitter(&mut irb);
    let i = irb.literal_i32(1);
    let d = irb.literal_f64(1.0);
    assert!(matches!(
        irb.binary_op(OperatorType::AddF, i, d),
        Err(EmitError::InvalidArgument(_))
    ));
    assert!(matches!(
        irb.cmp(ComparisonType::Eq, i, d),
        Err(EmitError::InvalidArgument(_))
    ));
    let wide = irb.literal_i64(1);
    assert!(matches!(
        irb.binary_op(OperatorType::Add, i, wide),
        Err(EmitError::InvalidArgument(_))
    ));
    drop(irb);
}

#[test]
fn diamond_with_phi_verifies() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "diamond");
    let f = irb
        .function_named(
            "pick",
            ValueType::Double,
            FunctionLinkage::External,
            &[("x", ValueType::Double)],
        )
        .unwrap();
    let x = irb.param(0).unwrap();
    let zero = irb.literal_f64(0.0);
    let negative = irb.cmp(ComparisonType::LtF, x, zero).unwrap();

    let then_block = irb.block(f, "then");
    let else_block = irb.block(f, "else");
    let merge = irb.block(f, "merge");
    irb.branch_if(negative, then_block, else_block).unwrap();

    irb.set_current_block(then_block);
    let flipped = irb.binary_op(OperatorType::SubtractF, zero, x).unwrap();
    irb.branch(merge).unwrap();

    irb.set_current_block(else_block);
    irb.branch(merge).unwrap();

    irb.set_current_block(merge);
    let result = irb
        .phi(ValueType::Double, flipped, then_block, x, else_block)
        .unwrap();
    irb.return_value(result).unwrap();
    assert!(irb.is_terminated());
    irb.verify().unwrap();
    drop(irb);
}

#[test]
fn bitcast_requires_equal_widths() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "casts");
    setup_emitter(&mut irb);
    let wide = irb.literal_i64(7);
    let as_double = irb.cast(wide, ValueType::Double).unwrap();
    assert!(irb.raw_value(as_double).is_float_value());

    let narrow = irb.literal_i32(7);
    assert!(matches!(
        irb.cast(narrow, ValueType::Double),
        Err(EmitError::InvalidArgument(_))
    ));
    drop(irb);
}

#[test]
fn numeric_conversion_changes_width() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "convert");
    setup_emitter(&mut irb);
    let byte = irb.literal_u8(200);
    let widened = irb.convert(byte, ValueType::Byte, ValueType::Int32).unwrap();
    assert_eq!(
        irb.raw_value(widened).into_int_value().get_type().get_bit_width(),
        32
    );
    let d = irb.literal_f64(2.5);
    let truth = irb.convert(d, ValueType::Double, ValueType::Boolean).unwrap();
    assert_eq!(
        irb.raw_value(truth).into_int_value().get_type().get_bit_width(),
        1
    );
    drop(irb);
}

// -- Memory --

#[test]
fn entry_allocas_and_memcpy_verify() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "memory");
    let f = irb
        .function("copy", ValueType::Void, FunctionLinkage::External, &[])
        .unwrap();
    let body = irb.block(f, "body");
    irb.branch(body).unwrap();
    irb.set_current_block(body);

    let table = irb
        .constant_array("table", &ConstantData::Int32(vec![1, 2, 3]))
        .unwrap();
    let local = irb.stack_alloc(ValueType::Int32, 3).unwrap();
    irb.memcpy(ValueType::Int32, table, local, 3).unwrap();

    let index = irb.literal_i32(2);
    let cell = irb.gep(ValueType::Int32, local, index).unwrap();
    let loaded = irb.load(ValueType::Int32, cell).unwrap();
    let counter = irb.global_array("counter", ValueType::Int32, 1).unwrap();
    irb.store(loaded, counter).unwrap();
    irb.return_void().unwrap();

    irb.verify().unwrap();
    let ir = irb.print_to_string();
    assert!(ir.contains("llvm.memcpy"));
    assert_eq!(irb.current_block(), Some(body));
    drop(irb);
}

#[test]
fn variables_of_resolved_types_live_in_the_entry_block() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "variables");
    let f = setup_emitter(&mut irb);
    let body = irb.block(f, "body");
    irb.branch(body).unwrap();
    irb.set_current_block(body);

    let pair = ctx.i64_type().array_type(2);
    let slot = irb.variable_of(pair.into(), "pair").unwrap();
    assert!(irb.raw_value(slot).is_pointer_value());
    assert_eq!(irb.current_block(), Some(body));
    let zero = irb.literal_i32(0);
    irb.return_value(zero).unwrap();

    irb.verify().unwrap();
    let ir = irb.print_to_string();
    let entry = ir.find("%pair = alloca [2 x i64]").unwrap();
    let body_label = ir.find("body:").unwrap();
    assert!(entry < body_label);
    drop(irb);
}

#[test]
fn stack_allocation_needs_a_function() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "no_function");
    assert!(matches!(
        irb.variable(ValueType::Int32, "x"),
        Err(EmitError::IllegalState(_))
    ));
    drop(irb);
}

#[test]
fn every_operator_tag_lowers_for_its_operand_class() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "operators");
    setup_emitter(&mut irb);
    let int_slot = irb.variable(ValueType::Int32, "i").unwrap();
    let float_slot = irb.variable(ValueType::Double, "d").unwrap();
    let i = irb.load(ValueType::Int32, int_slot).unwrap();
    let d = irb.load(ValueType::Double, float_slot).unwrap();

    let mut tag = 0u8;
    while let Ok(op) = OperatorType::try_from(tag) {
        let (same, other) = if op.is_float() { (d, i) } else { (i, d) };
        irb.binary_op(op, same, same).unwrap();
        assert!(matches!(
            irb.binary_op(op, other, other),
            Err(EmitError::InvalidArgument(_))
        ));
        tag += 1;
    }
    assert_eq!(tag, 12);

    let zero = irb.literal_i32(0);
    irb.return_value(zero).unwrap();
    irb.verify().unwrap();
    drop(irb);
}

#[test]
fn named_string_globals_verify() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "named_strings");
    let banner = irb.global_string("banner", "ell");
    let other = irb.global_string("motto", "ell");
    assert_ne!(banner, other);
    assert!(irb.raw_value(banner).is_pointer_value());

    irb.verify().unwrap();
    let ir = irb.print_to_string();
    assert!(ir.contains("@banner = internal constant [4 x i8] c\"ell\\00\""));
    assert!(ir.contains("@motto = internal constant"));
    drop(irb);
}

#[test]
fn unsigned_operators_lower_to_unsigned_instructions() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "unsigned");
    setup_emitter(&mut irb);
    // Loaded operands, so the builder cannot fold the arithmetic away.
    let slot = irb.variable(ValueType::Byte, "a").unwrap();
    let init = irb.literal_u8(200);
    irb.store(init, slot).unwrap();
    let a = irb.load(ValueType::Byte, slot).unwrap();
    let b = irb.load(ValueType::Byte, slot).unwrap();
    let quotient = irb.binary_op(OperatorType::DivideU, a, b).unwrap();
    let remainder = irb.binary_op(OperatorType::ModU, quotient, b).unwrap();
    let below = irb.cmp(ComparisonType::LtU, remainder, a).unwrap();
    let widened = irb.convert(below, ValueType::Boolean, ValueType::Int32).unwrap();
    irb.return_value(widened).unwrap();

    irb.verify().unwrap();
    let ir = irb.print_to_string();
    assert!(ir.contains("udiv i8"));
    assert!(ir.contains("urem i8"));
    assert!(ir.contains("icmp ult i8"));
    assert!(!ir.contains("sdiv"));
    drop(irb);
}

// -- Intrinsics --

#[test]
fn float_intrinsics_lower_to_llvm_intrinsics() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "intrinsics");
    irb.function("math", ValueType::Double, FunctionLinkage::External, &[])
        .unwrap();
    let x = irb.literal_f64(4.0);
    let root = irb.intrinsic(Intrinsic::Sqrt, ValueType::Double, &[x]).unwrap();
    let damped = irb.intrinsic(Intrinsic::Tanh, ValueType::Double, &[root]).unwrap();
    irb.return_value(damped).unwrap();
    irb.verify().unwrap();

    let ir = irb.print_to_string();
    assert!(ir.contains("llvm.sqrt.f64"));
    assert!(ir.contains("@tanh"));
    drop(irb);
}

#[test]
fn integer_intrinsics_use_select() {
    let ctx = Context::create();
    let mut irb = IrEmitter::new(&ctx, "int_intrinsics");
    setup_emitter(&mut irb);
    let a = irb.literal_i32(-3);
    let b = irb.literal_i32(2);
    let magnitude = irb.intrinsic(Intrinsic::Abs, ValueType::Int32, &[a]).unwrap();
    let larger = irb
        .intrinsic(Intrinsic::MaxNum, ValueType::Int32, &[magnitude, b])
        .unwrap();
    irb.return_value(larger).unwrap();
    irb.verify().unwrap();

    assert!(matches!(
        irb.intrinsic(Intrinsic::Cos, ValueType::Int32, &[a]),
        Err(EmitError::TypeMismatch { .. })
    ));
    drop(irb);
}
