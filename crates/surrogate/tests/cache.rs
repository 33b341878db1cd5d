use std::{sync::Arc, thread};

use surrogate::{ClassBuilder, ExcType, Specialization, Value, ops, proxy, proxy::base};

// === Bound type reuse ===

#[test]
fn proxies_of_one_type_share_a_bound_type() {
    let a = proxy(Value::int(1));
    let b = proxy(Value::int(2));
    assert!(ops::type_of(&a).is(&ops::type_of(&b)));
    assert!(!ops::type_of(&a).is(&ops::type_of(&proxy(Value::str("1")))));
}

#[test]
fn bound_types_are_named_after_both_types() {
    let wrapped = proxy(Value::str("x"));
    let ty = ops::type_of(&wrapped);
    assert_eq!(ops::getattr(&ty, "__name__").unwrap().as_str(), Some("proxy[str]"));
}

#[test]
fn each_specialization_has_its_own_bound_types() {
    let tagged = Specialization::builder("tagged").build();
    let int_type = ops::type_of(&Value::int(0));
    let plain = base().bound_type(&int_type).unwrap();
    let special = tagged.bound_type(&int_type).unwrap();
    assert!(!Arc::ptr_eq(&plain, &special));
    assert!(special.is_subclass_of(tagged.py_type()));
    assert!(special.is_subclass_of(base().py_type()));
}

#[test]
fn ahead_of_time_specialization_matches_later_binds() {
    let class = ClassBuilder::new("Widget").build().unwrap();
    let class_value = class.to_value().unwrap();
    let prepared = base().bound_type(&class_value).unwrap();

    let widget = ops::call(&class_value, surrogate::ArgValues::Empty).unwrap();
    let wrapped = proxy(widget);
    assert!(ops::type_of(&wrapped).is(&prepared.to_value().unwrap()));
}

#[test]
fn bound_types_follow_later_class_changes() {
    let class = ClassBuilder::new("Late").build().unwrap();
    let class_value = class.to_value().unwrap();
    let instance = ops::call(&class_value, surrogate::ArgValues::Empty).unwrap();
    let wrapped = proxy(instance.clone());
    assert!(!ops::callable(&instance));
    assert!(!ops::callable(&wrapped));

    let donor = ClassBuilder::new("Donor")
        .method("__call__", |_, _| Ok(Value::str("called")))
        .build()
        .unwrap();
    let call = ops::getattr(&donor.to_value().unwrap(), "__call__").unwrap();
    class.set_attr("__call__", call).unwrap();

    assert!(ops::callable(&instance));
    assert!(ops::callable(&wrapped));
    let result = ops::call(&wrapped, surrogate::ArgValues::Empty).unwrap();
    assert_eq!(result.as_str(), Some("called"));
    assert!(ops::hasattr(&ops::type_of(&wrapped), "__call__").unwrap());

    class.del_attr("__call__").unwrap();
    assert!(!ops::callable(&wrapped));
}

#[test]
fn only_types_can_be_specialized_for() {
    let err = base().bound_type(&Value::str("int")).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::InvalidWrappedType);
    assert!(err.is_instance_of(ExcType::TypeError));
    assert_eq!(err.arg(), Some("expected a type to specialize for, got 'str' object"));
}

// === Concurrency ===

#[test]
fn concurrent_first_use_yields_one_bound_type() {
    let class = ClassBuilder::new("Fresh").build().unwrap();
    let class_value = class.to_value().unwrap();
    let types: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| base().bound_type(&class_value).unwrap()))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });
    assert!(types.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn proxies_can_cross_threads() {
    let wrapped = proxy(Value::list(vec![Value::int(1)]));
    let moved = wrapped.clone();
    thread::spawn(move || ops::call_method(&moved, "append", surrogate::ArgValues::One(Value::int(2))).unwrap())
        .join()
        .unwrap();
    assert_eq!(ops::len(&wrapped).unwrap(), 2);
}
