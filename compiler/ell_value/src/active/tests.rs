use std::rc::Rc;

use super::*;
use crate::compute::ComputeContext;
use pretty_assertions::assert_eq;

fn compute(name: &str) -> Rc<ComputeContext> {
    Rc::new(ComputeContext::new(name))
}

#[test]
fn dispatch_without_context_is_illegal_state() {
    assert!(!has_context());
    assert!(matches!(
        allocate_n(ValueType::Int32, 4),
        Err(EmitError::IllegalState(_))
    ));
    assert!(matches!(get_context(), Err(EmitError::IllegalState(_))));
}

#[test]
fn guard_activates_for_its_scope_only() {
    let ctx = compute("scoped");
    {
        let _guard = ContextGuard::new(ctx.clone());
        let array = allocate_n(ValueType::Int32, 4).unwrap();
        assert_eq!(ctx.read(&array), Ok(ConstantData::Int32(vec![0; 4])));
    }
    assert!(matches!(
        allocate_n(ValueType::Int32, 4),
        Err(EmitError::IllegalState(_))
    ));
}

#[test]
fn guard_is_released_when_its_scope_fails() {
    fn emit(ctx: Rc<ComputeContext>) -> EmitResult<Value> {
        let _guard = ContextGuard::new(ctx);
        allocate_n(ValueType::Void, 1)?;
        allocate_n(ValueType::Int32, 1)
    }

    assert!(emit(compute("failing")).is_err());
    assert!(!has_context());
    assert!(matches!(
        store_constant_data(ConstantData::from(vec![1.0])),
        Err(EmitError::IllegalState(_))
    ));
}

#[test]
fn guard_is_released_on_panic() {
    let result = std::panic::catch_unwind(|| {
        let _guard = ContextGuard::new(compute("panicking"));
        panic!("emission aborted");
    });
    assert!(result.is_err());
    assert!(!has_context());
}

#[test]
fn nested_guards_restore_the_outer_context() {
    let outer = compute("outer");
    let inner = compute("inner");
    let _outer_guard = ContextGuard::new(outer.clone());
    {
        let _inner_guard = ContextGuard::new(inner.clone());
        allocate_n(ValueType::Byte, 1).unwrap();
    }
    allocate_n(ValueType::Byte, 1).unwrap();
    allocate_n(ValueType::Byte, 1).unwrap();

    assert_eq!(inner.buffer_count(), 1);
    assert_eq!(outer.buffer_count(), 2);
}

#[test]
fn guards_dropped_out_of_order_remove_their_own_entry() {
    let first = compute("first");
    let second = compute("second");
    let a = ContextGuard::new(first.clone());
    let b = ContextGuard::new(second.clone());
    drop(a);

    allocate_n(ValueType::Short, 1).unwrap();
    assert_eq!(second.buffer_count(), 1);
    assert_eq!(first.buffer_count(), 0);

    drop(b);
    assert!(!has_context());
}

#[test]
fn free_if_then_dispatches_to_the_active_context() {
    let ctx = compute("if");
    let _guard = ContextGuard::new(ctx.clone());
    let flag = global_allocate("flag", ValueType::Int32, &MemoryLayout::new([1]).unwrap()).unwrap();
    let yes = Scalar::constant(true).unwrap();

    if_then(&yes, || {
        let one = store_constant_data(ConstantData::Int32(vec![1]))?;
        let mut flag = flag.clone();
        copy_data(&one, &mut flag)
    })
    .unwrap()
    .end()
    .unwrap();

    assert_eq!(ctx.read(&flag), Ok(ConstantData::Int32(vec![1])));
}

#[test]
fn for_each_free_function_reenters_the_context() {
    let ctx = compute("loop");
    let _guard = ContextGuard::new(ctx.clone());
    let layout = MemoryLayout::new([2, 2]).unwrap();
    let grid = allocate(ValueType::Int32, &layout).unwrap();

    for_each(&layout, |indices| {
        let cell = offset_coordinates(&grid, indices)?;
        let sum = {
            let ctx = get_context()?;
            ctx.binary_operation(
                crate::context::ValueBinaryOperation::Add,
                indices[0].value(),
                indices[1].value(),
            )?
        };
        let mut cell = cell;
        copy_data(&sum, &mut cell)
    })
    .unwrap();

    assert_eq!(ctx.read(&grid), Ok(ConstantData::Int32(vec![0, 1, 1, 2])));
}
