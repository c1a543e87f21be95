use super::*;
use crate::active::{self, ContextGuard};
use crate::scalar::Elementwise;
use pretty_assertions::assert_eq;

fn activate() -> (Rc<ComputeContext>, ContextGuard) {
    let ctx = Rc::new(ComputeContext::new("compute"));
    let guard = ContextGuard::new(ctx.clone());
    (ctx, guard)
}

#[test]
fn storage_reports_pointer_types() {
    let ctx = ComputeContext::new("types");
    let v = ctx.allocate_n(ValueType::Double, 2).unwrap();
    assert_eq!(ctx.type_of(v.emittable().unwrap()), Ok(ValueType::PDouble));
    assert!(matches!(
        ctx.type_of(Emittable::new(99)),
        Err(EmitError::InvalidArgument(_))
    ));
}

#[test]
fn defined_function_runs_its_body() {
    let (ctx, _guard) = activate();
    let square = FunctionDeclaration::new("square")
        .returns(ValueType::Double)
        .scalar_parameter("x", ValueType::Double)
        .define(|args| {
            let x = Scalar::new(args[0].clone())?;
            Ok(Some(x.multiply(&x)?.into_value()))
        })
        .unwrap();
    assert!(square.is_defined());

    let three = Scalar::constant(3.0).unwrap();
    let result = square.call(&[three.into_value()]).unwrap().unwrap();
    assert_eq!(ctx.read(&result), Ok(ConstantData::Double(vec![9.0])));
}

#[test]
fn redefinition_is_invalid_function() {
    let (_ctx, _guard) = activate();
    let decl = FunctionDeclaration::new("f");
    decl.define(|_| Ok(None)).unwrap();
    assert_eq!(
        decl.define(|_| Ok(None)).unwrap_err(),
        EmitError::InvalidFunction("f".to_string())
    );
}

#[test]
fn scalars_are_passed_by_value() {
    let (ctx, _guard) = activate();
    let bump = FunctionDeclaration::new("bump")
        .scalar_parameter("x", ValueType::Int32)
        .define(|args| {
            let one = active::store_constant_data(ConstantData::Int32(vec![1]))?;
            let mut x = args[0].clone();
            active::copy_data(&one, &mut x)?;
            Ok(None)
        })
        .unwrap();

    let x = active::allocate(ValueType::Int32, &MemoryLayout::scalar()).unwrap();
    assert_eq!(bump.call(&[x.clone()]), Ok(None));
    assert_eq!(ctx.read(&x), Ok(ConstantData::Int32(vec![0])));
}

#[test]
fn arrays_are_passed_by_reference() {
    let (ctx, _guard) = activate();
    let fill = FunctionDeclaration::new("fill")
        .parameter("out", ValueType::Byte, MemoryLayout::new([3]).unwrap())
        .define(|args| {
            let out = args[0].clone();
            active::for_each(out.layout()?, |indices| {
                let mut cell = active::offset_coordinates(&out, indices)?;
                let nine = active::store_constant_data(ConstantData::Byte(vec![9]))?;
                active::copy_data(&nine, &mut cell)
            })?;
            Ok(None)
        })
        .unwrap();

    let out = active::allocate_n(ValueType::Byte, 3).unwrap();
    fill.call(&[out.clone()]).unwrap();
    assert_eq!(ctx.read(&out), Ok(ConstantData::Byte(vec![9, 9, 9])));
}

#[test]
fn function_statics_are_keyed_per_function() {
    let (_ctx, _guard) = activate();
    let handle_in = |name: &'static str| {
        FunctionDeclaration::new(name)
            .returns(ValueType::Int32)
            .define(|_| {
                let layout = MemoryLayout::scalar();
                let counter = active::static_allocate("counter", ValueType::Int32, &layout)?;
                Ok(Some(counter))
            })
            .unwrap()
    };
    let a = handle_in("a");
    let b = handle_in("b");

    let first = a.call(&[]).unwrap().unwrap();
    let again = a.call(&[]).unwrap().unwrap();
    let other = b.call(&[]).unwrap().unwrap();

    assert_eq!(first.emittable(), again.emittable());
    assert_ne!(first.emittable(), other.emittable());
}

#[test]
fn missing_return_value_is_rejected() {
    let (_ctx, _guard) = activate();
    let f = FunctionDeclaration::new("nothing")
        .returns(ValueType::Double)
        .define(|_| Ok(None))
        .unwrap();
    assert!(matches!(f.call(&[]), Err(EmitError::InvalidArgument(_))));
}

#[test]
fn copy_includes_padding() {
    let ctx = ComputeContext::new("padding");
    let padded = MemoryLayout::with_padding([2], [1]).unwrap();
    let mut source = ctx.store_constant_data(ConstantData::from(vec![0i16, 5, 6, 0])).unwrap();
    source.set_layout(padded.clone());
    let mut destination = ctx.allocate(ValueType::Short, &padded).unwrap();

    ctx.copy_data(&source, &mut destination).unwrap();
    assert_eq!(ctx.read(&destination), Ok(ConstantData::Short(vec![5, 6])));
    assert_eq!(ctx.buffer(&destination), Ok(ConstantData::Short(vec![0, 5, 6, 0])));
}

#[test]
fn offset_past_the_end_is_invalid_argument() {
    let ctx = ComputeContext::new("bounds");
    let array = ctx.allocate_n(ValueType::Int32, 2).unwrap();
    let mut index = ctx.store_constant_data(ConstantData::Int32(vec![2])).unwrap();
    index.set_layout(MemoryLayout::scalar());
    let err = ctx.offset(&array, &Scalar::new(index).unwrap()).unwrap_err();
    assert!(matches!(err, EmitError::InvalidArgument(_)));
}

#[test]
fn integer_division_by_zero_surfaces_as_an_error() {
    let (_ctx, _guard) = activate();
    let a = Scalar::constant(1i32).unwrap();
    let zero = Scalar::constant(0i32).unwrap();
    assert!(matches!(a.divide(&zero), Err(EmitError::InvalidArgument(_))));
}
