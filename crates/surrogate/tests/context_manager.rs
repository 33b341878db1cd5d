use surrogate::{ArgValues, ClassBuilder, ExcType, Exception, Value, ops, ops::ExitArgs, proxy};

fn resource(suppress: bool) -> Value {
    let class = ClassBuilder::new("Resource")
        .attr("suppress", suppress)
        .method("__enter__", |this, _| {
            ops::setattr(this, "opened", Value::bool(true))?;
            Ok(this.clone())
        })
        .method("__exit__", |this, args| {
            let (_, exc_value, _) = args.get_three_args("__exit__")?;
            ops::setattr(this, "closed", Value::bool(true))?;
            ops::setattr(this, "failed", Value::bool(!exc_value.is_none()))?;
            ops::getattr(this, "suppress")
        })
        .build()
        .unwrap();
    ops::call(&class.to_value().unwrap(), ArgValues::Empty).unwrap()
}

fn flag(value: &Value, name: &str) -> Option<bool> {
    ops::getattr(value, name).ok().and_then(|flag| flag.as_bool())
}

// === with-blocks ===

#[test]
fn enter_and_exit_reach_the_wrapped_manager() {
    let original = resource(false);
    let wrapped = proxy(original.clone());
    let result = ops::with_context(&wrapped, |entered| {
        // __enter__ returned the wrapped object itself, not the proxy
        assert!(entered.is(&original));
        Ok(1)
    })
    .unwrap();
    assert_eq!(result, Some(1));
    assert_eq!(flag(&original, "opened"), Some(true));
    assert_eq!(flag(&original, "closed"), Some(true));
    assert_eq!(flag(&original, "failed"), Some(false));
}

#[test]
fn exit_sees_the_exception_and_may_suppress_it() {
    let original = resource(true);
    let wrapped = proxy(original.clone());
    let result = ops::with_context(&wrapped, |_| -> Result<(), Exception> {
        Err(Exception::new_msg(ExcType::ValueError, "boom"))
    })
    .unwrap();
    assert_eq!(result, None);
    assert_eq!(flag(&original, "failed"), Some(true));
}

#[test]
fn unsuppressed_exceptions_propagate() {
    let wrapped = proxy(resource(false));
    let err = ops::with_context(&wrapped, |_| -> Result<(), Exception> {
        Err(Exception::new_msg(ExcType::ValueError, "boom"))
    })
    .unwrap_err();
    assert_eq!(err.exc_type(), ExcType::ValueError);
    assert_eq!(err.arg(), Some("boom"));
}

#[test]
fn explicit_exit_calls() {
    let original = resource(false);
    let wrapped = proxy(original.clone());
    ops::enter(&wrapped).unwrap();
    let suppressed = ops::exit(&wrapped, &ExitArgs::none()).unwrap();
    assert_eq!(suppressed.as_bool(), Some(false));
    assert_eq!(flag(&original, "closed"), Some(true));
}

#[test]
fn non_managers_fail_the_same_way() {
    let direct = ops::enter(&Value::int(1)).unwrap_err();
    let proxied = ops::enter(&proxy(Value::int(1))).unwrap_err();
    assert_eq!(direct, proxied);
}
