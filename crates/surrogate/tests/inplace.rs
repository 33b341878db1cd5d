use surrogate::{
    ArgValues, BinaryOp, ExcType, Specialization, Value, get_original, get_state, is_proxy, ops, proxy,
};

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::int).collect())
}

// === Immutable wrapped values ===

#[test]
fn augmented_add_on_an_int_makes_a_new_proxy() {
    // a = b = proxy(5); b += 2
    let a = proxy(Value::int(5));
    let b = ops::inplace(&a, BinaryOp::Add, &Value::int(2)).unwrap();
    assert!(ops::eq(&a, &Value::int(5)).unwrap());
    assert!(ops::eq(&b, &Value::int(7)).unwrap());
    assert!(!a.is(&b));
    assert!(is_proxy(&b));
    assert!(ops::type_of(&a).is(&ops::type_of(&b)));
}

#[test]
fn rebinding_to_another_type_uses_that_type() {
    let a = proxy(Value::int(5));
    let b = ops::inplace(&a, BinaryOp::TrueDiv, &Value::int(2)).unwrap();
    assert_eq!(get_original(&b).unwrap().as_float(), Some(2.5));
    assert!(ops::isinstance(&b, &ops::type_of(&Value::float(0.0))).unwrap());
    assert!(!ops::type_of(&a).is(&ops::type_of(&b)));
}

#[test]
fn unsupported_augmented_assignment_fails_like_the_wrapped_value() {
    let direct = ops::inplace(&Value::int(5), BinaryOp::Add, &Value::str("a")).unwrap_err();
    let proxied = ops::inplace(&proxy(Value::int(5)), BinaryOp::Add, &Value::str("a")).unwrap_err();
    assert_eq!(direct, proxied);
    assert_eq!(direct.arg(), Some("unsupported operand type(s) for +=: 'int' and 'str'"));
}

// === Mutable wrapped values ===

#[test]
fn augmented_add_on_a_list_keeps_the_proxy() {
    // a = b = proxy([1]); b += [2]
    let a = proxy(ints(&[1]));
    let b = ops::inplace(&a, BinaryOp::Add, &ints(&[2])).unwrap();
    assert!(a.is(&b));
    assert!(ops::eq(&a, &ints(&[1, 2])).unwrap());
    assert!(ops::eq(&b, &ints(&[1, 2])).unwrap());
}

#[test]
fn augmented_multiply_on_a_list_keeps_the_proxy() {
    let a = proxy(ints(&[1, 2]));
    let b = ops::inplace(&a, BinaryOp::Mul, &Value::int(2)).unwrap();
    assert!(a.is(&b));
    assert_eq!(ops::len(&get_original(&a).unwrap()).unwrap(), 4);
}

// === In-place method lookup ===

#[test]
fn inplace_method_exists_only_when_the_wrapped_object_has_it() {
    assert!(!ops::hasattr(&proxy(Value::int(5)), "__iadd__").unwrap());
    let err = ops::getattr(&proxy(Value::int(5)), "__iadd__").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::AttributeError);
    assert_eq!(err, ops::getattr(&Value::int(5), "__iadd__").unwrap_err());
    assert!(ops::hasattr(&proxy(ints(&[])), "__iadd__").unwrap());
}

#[test]
fn calling_the_inplace_method_returns_the_proxy() {
    let wrapped = proxy(ints(&[1]));
    let iadd = ops::getattr(&wrapped, "__iadd__").unwrap();
    let result = ops::call(&iadd, ArgValues::One(ints(&[2, 3]))).unwrap();
    assert!(result.is(&wrapped));
    assert_eq!(ops::len(&wrapped).unwrap(), 3);
}

// === Specializations and state ===

#[test]
fn rebinding_keeps_the_specialization_and_copies_the_state() {
    let stars = Specialization::builder("stars")
        .direct_method("__str__", |receiver, args| {
            let plain = ops::str(&receiver.super_call("__str__", args)?)?;
            Ok(Value::str("*".repeat(plain.chars().count())))
        })
        .build();
    let a = stars.bind(Value::str("ab"), ArgValues::Empty).unwrap();
    ops::setattr(&get_state(&a).unwrap(), "tag", Value::str("x")).unwrap();

    let b = ops::inplace(&a, BinaryOp::Add, &Value::str("c")).unwrap();
    assert!(!a.is(&b));
    assert_eq!(ops::str(&b).unwrap(), "***");
    assert_eq!(ops::str(&a).unwrap(), "**");

    let state_b = get_state(&b).unwrap();
    assert_eq!(ops::getattr(&state_b, "tag").unwrap().as_str(), Some("x"));
    ops::setattr(&state_b, "tag", Value::str("y")).unwrap();
    let state_a = get_state(&a).unwrap();
    assert_eq!(ops::getattr(&state_a, "tag").unwrap().as_str(), Some("x"));
}

#[test]
fn declared_inplace_operator_takes_over() {
    let counting = Specialization::builder("counting")
        .method("__iadd__", |receiver, args| {
            let seen = receiver.state().get("adds").and_then(|v| v.as_int()).unwrap_or(0);
            receiver.state().set("adds", seen + 1);
            receiver.super_call("__iadd__", args)
        })
        .build();
    let a = counting.bind(Value::int(1), ArgValues::Empty).unwrap();
    let b = ops::inplace(&a, BinaryOp::Add, &Value::int(1)).unwrap();
    let c = ops::inplace(&b, BinaryOp::Add, &Value::int(1)).unwrap();
    assert!(ops::eq(&c, &Value::int(3)).unwrap());
    let adds = ops::getattr(&get_state(&c).unwrap(), "adds").unwrap();
    assert_eq!(adds.as_int(), Some(2));
}
