use surrogate::{
    ArgValues, ClassBuilder, ExcType, MaskingDict, Value, get_original, get_state, is_proxy, masking_proxy,
    masking_specialization, ops,
};

fn user() -> Value {
    let class = ClassBuilder::new("User")
        .method("greet", |this, _| {
            let name = ops::getattr(this, "name")?;
            Ok(Value::str(format!("hi {}", ops::str(&name)?)))
        })
        .build()
        .unwrap();
    let user = ops::call(&class.to_value().unwrap(), ArgValues::Empty).unwrap();
    ops::setattr(&user, "name", Value::str("Bob")).unwrap();
    ops::setattr(&user, "password", Value::str("secret")).unwrap();
    user
}

// === Attributes ===

#[test]
fn masked_attributes_cannot_be_read_written_or_deleted() {
    let original = user();
    let masked = masking_proxy(original.clone(), ["password"]).unwrap();

    let err = ops::getattr(&masked, "password").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MaskedAttributeError);
    assert!(err.is_instance_of(ExcType::AttributeError));
    assert_eq!(err.arg(), Some("password"));

    let err = ops::setattr(&masked, "password", Value::str("guess")).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MaskedAttributeError);
    let err = ops::delattr(&masked, "password").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MaskedAttributeError);

    assert_eq!(ops::getattr(&original, "password").unwrap().as_str(), Some("secret"));
}

#[test]
fn unmasked_attributes_are_forwarded() {
    let original = user();
    let masked = masking_proxy(original.clone(), ["password"]).unwrap();
    assert_eq!(ops::getattr(&masked, "name").unwrap().as_str(), Some("Bob"));

    ops::setattr(&masked, "name", Value::str("Alice")).unwrap();
    assert_eq!(ops::getattr(&original, "name").unwrap().as_str(), Some("Alice"));

    let greeting = ops::call_method(&masked, "greet", ArgValues::Empty).unwrap();
    assert_eq!(greeting.as_str(), Some("hi Alice"));
}

#[test]
fn masked_names_are_hidden_from_introspection() {
    let original = user();
    let masked = masking_proxy(original.clone(), ["password", "greet"]).unwrap();
    assert!(!ops::hasattr(&masked, "password").unwrap());
    assert!(!ops::hasattr(&masked, "greet").unwrap());
    assert!(ops::hasattr(&masked, "name").unwrap());

    let names = ops::dir(&masked).unwrap();
    assert!(names.contains(&"name".to_owned()));
    assert!(!names.contains(&"password".to_owned()));
    assert!(!names.contains(&"greet".to_owned()));
    assert!(ops::dir(&original).unwrap().contains(&"password".to_owned()));
}

#[test]
fn masking_an_immutable_value() {
    let masked = masking_proxy(Value::str("abc"), ["upper"]).unwrap();
    assert!(ops::getattr(&masked, "upper").is_err());
    let lower = ops::call_method(&masked, "lower", ArgValues::Empty).unwrap();
    assert_eq!(lower.as_str(), Some("abc"));
    assert_eq!(ops::len(&masked).unwrap(), 3);
    assert!(ops::eq(&masked, &Value::str("abc")).unwrap());
}

// === The attribute store ===

#[test]
fn dict_is_a_live_masking_view() {
    let original = user();
    let masked = masking_proxy(original.clone(), ["password"]).unwrap();
    let view = ops::getattr(&masked, "__dict__").unwrap();
    assert!(view.downcast_ref::<MaskingDict>().is_some());
    assert_eq!(ops::repr(&view).unwrap(), "{'name': 'Bob'}");

    let err = ops::getitem(&view, &Value::str("password")).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MaskedKeyError);
    assert!(err.is_instance_of(ExcType::KeyError));

    ops::setattr(&original, "email", Value::str("bob@example.com")).unwrap();
    assert_eq!(ops::len(&view).unwrap(), 2);
    assert!(ops::contains(&view, &Value::str("email")).unwrap());

    ops::setitem(&view, Value::str("name"), Value::str("Carol")).unwrap();
    assert_eq!(ops::getattr(&original, "name").unwrap().as_str(), Some("Carol"));

    let keys: Vec<String> = ops::collect(&view)
        .unwrap()
        .iter()
        .filter_map(|key| key.as_str().map(str::to_owned))
        .collect();
    assert_eq!(keys, vec!["name", "email"]);
}

#[test]
fn view_compares_by_visible_entries() {
    let original = user();
    let masked = masking_proxy(original, ["password"]).unwrap();
    let view = ops::getattr(&masked, "__dict__").unwrap();
    let expected = Value::str_dict([("name", Value::str("Bob"))]);
    assert!(ops::eq(&view, &expected).unwrap());
}

// === Proxy plumbing ===

#[test]
fn masking_proxies_are_proxies() {
    let original = user();
    let masked = masking_proxy(original.clone(), ["password"]).unwrap();
    assert!(is_proxy(&masked));
    assert!(get_original(&masked).unwrap().is(&original));
    assert!(get_state(&masked).is_ok());
    let spec_type = masking_specialization().py_type().to_value().unwrap();
    assert!(ops::isinstance(&masked, &spec_type).unwrap());
    assert!(ops::isinstance(&masked, &ops::type_of(&original)).unwrap());
}

#[test]
fn masking_type_can_be_called_with_names() {
    let spec_type = masking_specialization().py_type().to_value().unwrap();
    let names = Value::list(vec![Value::str("password")]);
    let masked = ops::call(&spec_type, ArgValues::Two(user(), names)).unwrap();
    assert!(!ops::hasattr(&masked, "password").unwrap());

    let unmasked = ops::call(&spec_type, ArgValues::One(user())).unwrap();
    assert!(ops::hasattr(&unmasked, "password").unwrap());
}
