//! Introspection helpers for building proxies that expose only an interface.

use std::collections::BTreeSet;

use crate::{exception::RunResult, masking::masking_proxy, ops, value::Value};

/// Names declared through an optional attribute that holds one name or a sequence of them.
fn declared_names(obj: &Value, attr: &str) -> RunResult<Vec<String>> {
    if !ops::hasattr(obj, attr)? {
        return Ok(Vec::new());
    }
    let declared = ops::getattr(obj, attr)?;
    match declared.as_str() {
        Some(name) => Ok(vec![name.to_owned()]),
        None => ops::collect_strings(&declared),
    }
}

/// Every name `obj` makes available: `dir(obj)`, `__slots__` and `__attributes__`.
pub fn get_api(obj: &Value) -> RunResult<BTreeSet<String>> {
    let mut api: BTreeSet<String> = ops::dir(obj)?.into_iter().collect();
    api.extend(declared_names(obj, "__slots__")?);
    api.extend(declared_names(obj, "__attributes__")?);
    Ok(api)
}

/// Same as [`get_api`].
pub fn get_public_api(obj: &Value) -> RunResult<BTreeSet<String>> {
    get_api(obj)
}

/// The names of `obj` that none of `interfaces` declares.
pub fn get_private_api(obj: &Value, interfaces: &[Value]) -> RunResult<BTreeSet<String>> {
    let mut private = get_api(obj)?;
    for interface in interfaces {
        for name in get_api(interface)? {
            private.remove(&name);
        }
    }
    Ok(private)
}

/// A masking proxy over `obj` that only shows names declared by `interfaces`.
pub fn get_public_proxy(obj: &Value, interfaces: &[Value]) -> RunResult<Value> {
    let private = get_private_api(obj, interfaces)?;
    masking_proxy(obj.clone(), private)
}
