use super::*;
use pretty_assertions::assert_eq;

#[test]
fn new_value_is_unconstrained_and_undefined() {
    let v = Value::new(ValueType::Double);
    assert!(!v.is_constrained());
    assert!(!v.is_defined());
    assert!(matches!(v.layout(), Err(EmitError::InvalidArgument(_))));
    assert!(matches!(v.emittable(), Err(EmitError::InvalidArgument(_))));
}

#[test]
fn reset_keeps_type_and_layout() {
    let mut v = Value::from_emittable(Emittable::new(3), ValueType::PInt32, MemoryLayout::new([4]).unwrap());
    assert_eq!(v.base_type(), ValueType::Int32);
    assert_eq!(v.emittable(), Ok(Emittable::new(3)));

    v.reset();
    assert!(!v.is_defined());
    assert_eq!(v.rank(), Some(1));
    assert_eq!(v.ty(), ValueType::PInt32);
}

#[test]
fn constant_data_reports_its_element_type() {
    assert_eq!(ConstantData::from(vec![1.0, 2.0]).value_type(), ValueType::Double);
    assert_eq!(ConstantData::from(vec![true]).value_type(), ValueType::Boolean);
    assert_eq!(ConstantData::from(vec![1i16, 2, 3]).len(), 3);
    assert!(ConstantData::Int64(Vec::new()).is_empty());
}

#[test]
fn zeroed_rejects_non_storable_types() {
    assert_eq!(ConstantData::zeroed(ValueType::Short, 2), Ok(ConstantData::Short(vec![0, 0])));
    assert!(matches!(
        ConstantData::zeroed(ValueType::Void, 1),
        Err(EmitError::InvalidValueType(_))
    ));
    assert!(matches!(
        ConstantData::zeroed(ValueType::PDouble, 1),
        Err(EmitError::InvalidValueType(_))
    ));
}

#[test]
fn element_types_map_to_value_types() {
    assert_eq!(<u8 as Element>::VALUE_TYPE, ValueType::Byte);
    assert_eq!(<i8 as Element>::VALUE_TYPE, ValueType::Char8);
    assert_eq!(i64::into_constant_data(vec![5]), ConstantData::Int64(vec![5]));
}
