use surrogate::{ArgValues, ExcType, ProxyState, Specialization, Value, get_state, ops, proxy};

// === Per-proxy storage ===

#[test]
fn state_accepts_attributes_the_wrapped_int_rejects() {
    let wrapped = proxy(Value::int(42));
    let state = get_state(&wrapped).unwrap();
    ops::setattr(&state, "foo", Value::bool(true)).unwrap();
    assert_eq!(ops::getattr(&state, "foo").unwrap().as_bool(), Some(true));

    let err = ops::setattr(&wrapped, "foo", Value::bool(true)).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::AttributeError);
    assert_eq!(err.arg(), Some("'int' object has no attribute 'foo'"));
    assert!(!ops::hasattr(&wrapped, "foo").unwrap());
}

#[test]
fn each_proxy_has_its_own_state() {
    let shared = Value::int(1);
    let a = proxy(shared.clone());
    let b = proxy(shared);
    ops::setattr(&get_state(&a).unwrap(), "tag", Value::str("a")).unwrap();
    assert!(!ops::hasattr(&get_state(&b).unwrap(), "tag").unwrap());
    assert!(get_state(&a).unwrap().is(&get_state(&a).unwrap()));
}

#[test]
fn state_dict_lists_its_attributes() {
    let state = get_state(&proxy(Value::none())).unwrap();
    ops::setattr(&state, "x", Value::int(1)).unwrap();
    let store = ops::getattr(&state, "__dict__").unwrap();
    assert_eq!(ops::repr(&store).unwrap(), "{'x': 1}");
    assert!(ops::dir(&state).unwrap().contains(&"x".to_owned()));
}

#[test]
fn state_is_only_for_proxies() {
    let err = get_state(&Value::int(1)).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
    assert_eq!(err.arg(), Some("get_state() expects a proxy, got 'int' object"));
}

// === Specializations using state ===

struct Hits(std::sync::atomic::AtomicUsize);

#[test]
fn bodies_share_the_state_with_callers() {
    let counted = Specialization::builder("counted")
        .on_bind(|receiver, _| {
            receiver
                .state()
                .insert_extension(Hits(std::sync::atomic::AtomicUsize::new(0)));
            Ok(())
        })
        .method("__len__", |receiver, args| {
            if let Some(hits) = receiver.state().extension::<Hits>() {
                hits.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            receiver.state().set("last", "len");
            receiver.super_call("__len__", args)
        })
        .build();
    let wrapped = counted.bind(Value::str("abcd"), ArgValues::Empty).unwrap();
    assert_eq!(ops::len(&wrapped).unwrap(), 4);
    assert_eq!(ops::len(&wrapped).unwrap(), 4);

    let state = get_state(&wrapped).unwrap();
    assert_eq!(ops::getattr(&state, "last").unwrap().as_str(), Some("len"));
    let hits = state.downcast_ref::<ProxyState>().and_then(ProxyState::extension::<Hits>).unwrap();
    assert_eq!(hits.0.load(std::sync::atomic::Ordering::Relaxed), 2);
}
