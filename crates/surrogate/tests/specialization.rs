use std::sync::Arc;

use surrogate::{
    ArgValues, Declaration, ExcType, Specialization, Value, get_original, make_specialization, mark_direct, ops,
    proxy::base, unproxied,
};

fn stars() -> Arc<Specialization> {
    Specialization::builder("stars")
        .direct_method("__str__", |receiver, args| {
            let plain = ops::str(&receiver.super_call("__str__", args)?)?;
            Ok(Value::str("*".repeat(plain.chars().count())))
        })
        .build()
}

// === Overriding special methods ===

#[test]
fn direct_str_override_masks_the_string_form() {
    let secret = stars().bind(Value::str("freedom"), ArgValues::Empty).unwrap();
    assert_eq!(ops::str(&secret).unwrap(), "*******");
    assert_eq!(ops::repr(&secret).unwrap(), "'freedom'");
    assert_eq!(ops::len(&secret).unwrap(), 7);
    assert!(ops::eq(&secret, &Value::str("freedom")).unwrap());
}

#[test]
fn truthiness_accepts_the_legacy_spelling() {
    let never = Specialization::builder("never")
        .method("__nonzero__", |_, _| Ok(Value::bool(false)))
        .build();
    let wrapped = never.bind(Value::int(1), ArgValues::Empty).unwrap();
    assert!(!ops::truthy(&wrapped).unwrap());

    let both = Specialization::builder("both")
        .method("__nonzero__", |_, _| Ok(Value::bool(false)))
        .method("__bool__", |_, _| Ok(Value::bool(true)))
        .build();
    assert!(ops::truthy(&both.bind(Value::int(0), ArgValues::Empty).unwrap()).unwrap());
}

#[test]
fn declared_getattr_is_a_fallback() {
    let defaults = Specialization::builder("defaults")
        .method("__getattr__", |_, args| {
            let name = args.get_one_arg("__getattr__")?;
            Ok(Value::str(format!("default {}", ops::str(&name)?)))
        })
        .build();
    let wrapped = defaults.bind(Value::str("abc"), ArgValues::Empty).unwrap();
    let upper = ops::call_method(&wrapped, "upper", ArgValues::Empty).unwrap();
    assert_eq!(upper.as_str(), Some("ABC"));
    assert_eq!(ops::getattr(&wrapped, "colour").unwrap().as_str(), Some("default colour"));
}

// === Direct names ===

#[test]
fn direct_methods_are_found_on_the_proxy() {
    let loud = Specialization::builder("loud")
        .direct_method("upper", |receiver, args| {
            let upper = receiver.super_call("upper", args)?;
            Ok(Value::str(format!("{}!", ops::str(&upper)?)))
        })
        .build();
    let wrapped = loud.bind(Value::str("hi"), ArgValues::Empty).unwrap();
    let result = ops::call_method(&wrapped, "upper", ArgValues::Empty).unwrap();
    assert_eq!(result.as_str(), Some("HI!"));

    let method = ops::getattr(&wrapped, "upper").unwrap();
    assert_eq!(ops::repr(&method).unwrap(), "<bound method loud.upper of 'hi'>");
    assert!(ops::getattr(&method, "__self__").unwrap().is(&wrapped));
}

#[test]
fn methods_not_marked_direct_are_not_looked_up_by_name() {
    let quiet = Specialization::builder("quiet")
        .method("upper", |_, _| Ok(Value::str("never")))
        .build();
    let wrapped = quiet.bind(Value::str("hi"), ArgValues::Empty).unwrap();
    let result = ops::call_method(&wrapped, "upper", ArgValues::Empty).unwrap();
    assert_eq!(result.as_str(), Some("HI"));
}

#[test]
fn direct_property_with_and_without_setter() {
    let spec = Specialization::builder("sized")
        .direct_property("size", |receiver| Ok(Value::int(i64::try_from(ops::len(receiver.original())?).unwrap_or(-1))))
        .declare(mark_direct(
            Declaration::property("label", |receiver| Ok(receiver.state().get("label").unwrap_or_else(Value::none)))
                .with_setter(|receiver, value| {
                    receiver.state().set("label", value);
                    Ok(())
                }),
        ))
        .build();
    let wrapped = spec.bind(Value::str("four"), ArgValues::Empty).unwrap();
    assert_eq!(ops::getattr(&wrapped, "size").unwrap().as_int(), Some(4));

    let err = ops::setattr(&wrapped, "size", Value::int(1)).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::AttributeError);
    assert_eq!(err.arg(), Some("property 'size' of 'sized[str]' object has no setter"));

    ops::setattr(&wrapped, "label", Value::str("x")).unwrap();
    assert_eq!(ops::getattr(&wrapped, "label").unwrap().as_str(), Some("x"));
}

#[test]
fn direct_attributes_live_in_the_proxy() {
    let spec = make_specialization("limited", base(), [unproxied(Declaration::attr("limit", 10_i64))]);
    let wrapped = spec.bind(Value::int(3), ArgValues::Empty).unwrap();
    assert_eq!(ops::getattr(&wrapped, "limit").unwrap().as_int(), Some(10));

    // an int cannot hold attributes, the proxy can
    ops::setattr(&wrapped, "limit", Value::int(20)).unwrap();
    assert_eq!(ops::getattr(&wrapped, "limit").unwrap().as_int(), Some(20));
    assert!(!ops::hasattr(&get_original(&wrapped).unwrap(), "limit").unwrap());

    ops::delattr(&wrapped, "limit").unwrap();
    assert_eq!(ops::getattr(&wrapped, "limit").unwrap().as_int(), Some(10));
    assert!(ops::delattr(&wrapped, "limit").is_err());
}

// === Inheritance ===

#[test]
fn child_specializations_extend_the_parent() {
    let parent = Specialization::builder("parent")
        .direct_method("greet", |_, _| Ok(Value::str("parent")))
        .build();
    let child = Specialization::builder("child")
        .extends(&parent)
        .direct_method("greet", |receiver, args| {
            let inherited = receiver.super_call("greet", args)?;
            Ok(Value::str(format!("{} child", ops::str(&inherited)?)))
        })
        .direct_method("wave", |_, _| Ok(Value::str("wave")))
        .build();
    assert_eq!(child.direct_names(), vec!["greet", "wave"]);

    let wrapped = child.bind(Value::none(), ArgValues::Empty).unwrap();
    let greeting = ops::call_method(&wrapped, "greet", ArgValues::Empty).unwrap();
    assert_eq!(greeting.as_str(), Some("parent child"));

    let parent_type = parent.py_type().to_value().unwrap();
    assert!(ops::isinstance(&wrapped, &parent_type).unwrap());
    assert!(ops::isinstance(&wrapped, &ops::type_of(&Value::none())).unwrap());
}

// === Construction ===

#[test]
fn calling_the_specialization_type_binds() {
    let spec_type = stars().py_type().to_value().unwrap();
    let secret = ops::call(&spec_type, ArgValues::One(Value::str("abc"))).unwrap();
    assert_eq!(ops::str(&secret).unwrap(), "***");

    let again = ops::call(&ops::type_of(&secret), ArgValues::One(Value::str("de"))).unwrap();
    assert_eq!(ops::str(&again).unwrap(), "**");
}

#[test]
fn extra_arguments_need_a_construction_hook() {
    let err = stars()
        .bind(Value::int(1), ArgValues::One(Value::int(2)))
        .unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
    assert_eq!(err.arg(), Some("stars() takes exactly one argument (2 given)"));

    let tagged = Specialization::builder("tagged")
        .on_bind(|receiver, args| {
            let tag = args.get_one_arg("tagged")?;
            receiver.state().set("tag", tag);
            Ok(())
        })
        .direct_property("tag", |receiver| Ok(receiver.state().get("tag").unwrap_or_else(Value::none)))
        .build();
    let wrapped = tagged.bind(Value::int(1), ArgValues::One(Value::str("t"))).unwrap();
    assert_eq!(ops::getattr(&wrapped, "tag").unwrap().as_str(), Some("t"));
    assert!(tagged.bind(Value::int(1), ArgValues::Empty).is_err());
}

#[test]
fn mark_direct_and_unproxied_agree() {
    let a = make_specialization("a", base(), [mark_direct(Declaration::attr("x", 1_i64))]);
    let b = make_specialization("b", base(), [unproxied(Declaration::attr("x", 1_i64))]);
    assert_eq!(a.direct_names(), b.direct_names());
    assert!(a.is_direct("x"));
    assert!(!base().is_direct("x"));
}
