use surrogate::{
    ArgValues, BinaryOp, ClassBuilder, ExcType, Value, get_original, ops, proxiee, proxy,
    types::{Function, Property, native},
};

fn point() -> Value {
    let class = ClassBuilder::new("Point")
        .method("norm1", |this, args| {
            args.check_zero_args("norm1")?;
            let x = ops::getattr(this, "x")?;
            let y = ops::getattr(this, "y")?;
            ops::add(&x, &y)
        })
        .build()
        .unwrap();
    let point = ops::call(&class.to_value().unwrap(), ArgValues::Empty).unwrap();
    ops::setattr(&point, "x", Value::int(3)).unwrap();
    ops::setattr(&point, "y", Value::int(4)).unwrap();
    point
}

fn double() -> Value {
    Function::new_value(
        "double".to_owned(),
        native(|args| {
            let value = args.get_one_arg("double")?;
            ops::mul(&value, &Value::int(2))
        }),
    )
}

// === Identity and type ===

#[test]
fn proxy_is_a_different_object_of_a_different_type() {
    let original = Value::int(5);
    let wrapped = proxy(original.clone());
    assert!(!wrapped.is(&original));
    assert!(!ops::type_of(&wrapped).is(&ops::type_of(&original)));
    assert!(get_original(&wrapped).unwrap().is(&original));
    assert!(proxiee(&wrapped).unwrap().is(&original));
}

#[test]
fn isinstance_follows_the_wrapped_object() {
    let wrapped = proxy(Value::bool(true));
    let bool_type = ops::type_of(&Value::bool(false));
    let int_type = ops::type_of(&Value::int(0));
    let str_type = ops::type_of(&Value::str(""));
    assert!(ops::isinstance(&wrapped, &bool_type).unwrap());
    assert!(ops::isinstance(&wrapped, &int_type).unwrap());
    assert!(!ops::isinstance(&wrapped, &str_type).unwrap());
    assert!(ops::issubclass(&ops::type_of(&wrapped), &int_type).unwrap());
}

#[test]
fn class_attribute_reports_the_wrapped_class() {
    let original = point();
    let wrapped = proxy(original.clone());
    let class = ops::getattr(&wrapped, "__class__").unwrap();
    assert!(class.is(&ops::type_of(&original)));
}

// === Attributes ===

#[test]
fn attribute_reads_writes_and_deletes_reach_the_wrapped_object() {
    let original = point();
    let wrapped = proxy(original.clone());
    assert_eq!(ops::getattr(&wrapped, "x").unwrap().as_int(), Some(3));

    ops::setattr(&wrapped, "z", Value::int(5)).unwrap();
    assert_eq!(ops::getattr(&original, "z").unwrap().as_int(), Some(5));

    ops::delattr(&wrapped, "z").unwrap();
    assert!(!ops::hasattr(&original, "z").unwrap());

    let err = ops::getattr(&wrapped, "z").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::AttributeError);
    assert_eq!(err.arg(), Some("'Point' object has no attribute 'z'"));
}

#[test]
fn bound_methods_run_against_the_wrapped_object() {
    let wrapped = proxy(point());
    let total = ops::call_method(&wrapped, "norm1", ArgValues::Empty).unwrap();
    assert_eq!(total.as_int(), Some(7));
}

#[test]
fn dir_lists_the_wrapped_object() {
    let original = point();
    let wrapped = proxy(original.clone());
    assert_eq!(ops::dir(&wrapped).unwrap(), ops::dir(&original).unwrap());
}

#[test]
fn setting_an_attribute_on_an_int_fails_the_same_way() {
    let direct = ops::setattr(&Value::int(1), "foo", Value::bool(true)).unwrap_err();
    let proxied = ops::setattr(&proxy(Value::int(1)), "foo", Value::bool(true)).unwrap_err();
    assert_eq!(direct, proxied);
    assert_eq!(direct.exc_type(), ExcType::AttributeError);
}

// === Calls and descriptors ===

#[test]
fn calls_are_forwarded() {
    let wrapped = proxy(double());
    assert!(ops::callable(&wrapped));
    assert!(!ops::callable(&proxy(Value::int(1))));
    let result = ops::call(&wrapped, ArgValues::One(Value::int(21))).unwrap();
    assert_eq!(result.as_int(), Some(42));

    let err = ops::call(&proxy(Value::int(1)), ArgValues::Empty).unwrap_err();
    assert_eq!(err, ops::call(&Value::int(1), ArgValues::Empty).unwrap_err());
}

#[test]
fn proxied_property_still_acts_as_a_descriptor() {
    let getter = Function::new_value(
        "area".to_owned(),
        native(|args| {
            let this = args.get_one_arg("area")?;
            ops::mul(&ops::getattr(&this, "w")?, &ops::getattr(&this, "h")?)
        }),
    );
    let class = ClassBuilder::new("Rect")
        .attr("area", proxy(Value::new(Property::getter(getter))))
        .build()
        .unwrap();
    let rect = ops::call(&class.to_value().unwrap(), ArgValues::Empty).unwrap();
    ops::setattr(&rect, "w", Value::int(2)).unwrap();
    ops::setattr(&rect, "h", Value::int(5)).unwrap();
    assert_eq!(ops::getattr(&rect, "area").unwrap().as_int(), Some(10));
}

// === Containers and iteration ===

#[test]
fn container_operations_mutate_the_wrapped_list() {
    let original = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
    let wrapped = proxy(original.clone());

    ops::setitem(&wrapped, Value::int(0), Value::int(10)).unwrap();
    assert_eq!(ops::getitem(&original, &Value::int(0)).unwrap().as_int(), Some(10));

    ops::delitem(&wrapped, &Value::int(0)).unwrap();
    assert_eq!(ops::len(&original).unwrap(), 2);
    assert!(ops::contains(&wrapped, &Value::int(3)).unwrap());

    let items: Vec<i64> = ops::collect(&wrapped).unwrap().iter().filter_map(Value::as_int).collect();
    assert_eq!(items, vec![2, 3]);

    let err = ops::getitem(&wrapped, &Value::int(9)).unwrap_err();
    assert_eq!(err, ops::getitem(&original, &Value::int(9)).unwrap_err());
}

#[test]
fn proxied_iterator_advances_the_wrapped_iterator() {
    let original = ops::iter(&Value::list(vec![Value::int(1), Value::int(2)])).unwrap();
    let wrapped = proxy(original.clone());
    assert_eq!(ops::next(&wrapped).unwrap().and_then(|v| v.as_int()), Some(1));
    assert_eq!(ops::next(&original).unwrap().and_then(|v| v.as_int()), Some(2));
    assert!(ops::next(&wrapped).unwrap().is_none());
}

#[test]
fn dict_lookups_are_forwarded() {
    let original = Value::str_dict([("a", Value::int(1))]);
    let wrapped = proxy(original.clone());
    assert_eq!(ops::getitem(&wrapped, &Value::str("a")).unwrap().as_int(), Some(1));
    let missing = ops::getitem(&wrapped, &Value::str("b")).unwrap_err();
    assert_eq!(missing.exc_type(), ExcType::KeyError);
    let keys = ops::call_method(&wrapped, "keys", ArgValues::Empty).unwrap();
    assert_eq!(ops::len(&keys).unwrap(), 1);
}

#[test]
fn oversized_repetition_raises_instead_of_allocating() {
    let huge = Value::int(i64::MAX);
    let err = ops::mul(&proxy(Value::str("ab")), &huge).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MemoryError);
    assert_eq!(err.arg(), Some("repeated string is too long"));

    let err = ops::mul(&proxy(Value::str("abc")), &huge).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::OverflowError);
    assert_eq!(err.arg(), Some("repeated string is too long"));

    let err = ops::mul(&proxy(Value::bytes(b"xy".to_vec())), &huge).unwrap_err();
    assert_eq!(err.arg(), Some("repeated bytes is too long"));
    let err = ops::mul(&proxy(Value::tuple([Value::int(1)])), &Value::int(1 << 40)).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MemoryError);
    assert_eq!(err.arg(), Some("repeated tuple is too long"));
}

#[test]
fn oversized_list_repetition_leaves_the_list_alone() {
    let original = Value::list(vec![Value::int(1), Value::int(2)]);
    let wrapped = proxy(original.clone());
    let err = ops::inplace(&wrapped, BinaryOp::Mul, &Value::int(i64::MAX)).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MemoryError);
    assert_eq!(ops::len(&original).unwrap(), 2);

    let tripled = ops::mul(&wrapped, &Value::int(3)).unwrap();
    assert_eq!(ops::len(&tripled).unwrap(), 6);
    assert_eq!(ops::repr(&tripled).unwrap(), "[1, 2, 1, 2, 1, 2]");
}

// === Numbers ===

#[test]
fn numeric_protocols() {
    let wrapped = proxy(Value::float(2.6));
    assert_eq!(ops::int(&wrapped).unwrap(), 2);
    assert_eq!(ops::round(&wrapped, None).unwrap().as_int(), Some(3));
    assert!(ops::index(&wrapped).is_err());
    assert_eq!(ops::index(&proxy(Value::int(4))).unwrap(), 4);
    assert_eq!(ops::hash(&proxy(Value::int(4))).unwrap(), ops::hash(&Value::int(4)).unwrap());
}
