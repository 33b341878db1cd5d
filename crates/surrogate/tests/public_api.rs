use std::collections::BTreeSet;

use surrogate::{
    ArgValues, ClassBuilder, ExcType, Value, get_api, get_private_api, get_public_api, get_public_proxy, ops,
};

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|name| (*name).to_owned()).collect()
}

fn account() -> Value {
    let class = ClassBuilder::new("Account")
        .attr("__attributes__", Value::list(vec![Value::str("owner")]))
        .method("deposit", |_, _| Ok(Value::none()))
        .method("audit", |_, _| Ok(Value::str("audited")))
        .build()
        .unwrap();
    ops::call(&class.to_value().unwrap(), ArgValues::Empty).unwrap()
}

fn interface() -> Value {
    let class = ClassBuilder::new("IAccount")
        .attr("__attributes__", "owner")
        .method("deposit", |_, _| Ok(Value::none()))
        .build()
        .unwrap();
    class.to_value().unwrap()
}

// === API listing ===

#[test]
fn api_includes_dir_and_declared_names() {
    let api = get_api(&account()).unwrap();
    assert!(api.is_superset(&names(&["owner", "deposit", "audit", "__attributes__"])));
    assert_eq!(api, get_public_api(&account()).unwrap());
}

#[test]
fn slots_are_part_of_the_api() {
    let class = ClassBuilder::new("Pair").slots(&["left", "right"]).build().unwrap();
    let pair = ops::call(&class.to_value().unwrap(), ArgValues::Empty).unwrap();
    let api = get_api(&pair).unwrap();
    assert!(api.contains("left"));
    assert!(api.contains("right"));
}

#[test]
fn a_single_declared_name_counts_once() {
    let api = get_api(&interface()).unwrap();
    assert!(api.contains("owner"));
    assert!(!api.contains("o"));
}

// === Private API and public proxies ===

#[test]
fn private_api_is_what_no_interface_declares() {
    let private = get_private_api(&account(), &[interface()]).unwrap();
    assert!(private.contains("audit"));
    assert!(!private.contains("deposit"));
    assert!(!private.contains("owner"));

    let everything = get_private_api(&account(), &[]).unwrap();
    assert_eq!(everything, get_api(&account()).unwrap());
}

#[test]
fn public_proxy_hides_the_private_api() {
    let public = get_public_proxy(&account(), &[interface()]).unwrap();
    let deposited = ops::call_method(&public, "deposit", ArgValues::Empty).unwrap();
    assert!(deposited.is_none());

    let err = ops::getattr(&public, "audit").unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MaskedAttributeError);
    assert!(!ops::dir(&public).unwrap().contains(&"audit".to_owned()));
}
