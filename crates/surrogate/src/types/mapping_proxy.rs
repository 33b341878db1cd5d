//! `type.__dict__`: a live, read-only view of a class namespace.

use crate::{
    dunder::{CompareOp, Dunder},
    exception::{ExcType, RunResult},
    ops,
    types::{PyIterator, PyTrait, TypeRef, builtins, function::NativeFn, native, py_trait::address_of},
    value::Value,
};

pub(crate) const MAPPING_PROXY_SLOTS: &[Dunder] = &[
    Dunder::Repr,
    Dunder::Eq,
    Dunder::Ne,
    Dunder::Len,
    Dunder::Getitem,
    Dunder::Iter,
    Dunder::Contains,
];

/// Reads go straight to the class, so later class attribute changes show up here.
pub struct MappingProxy {
    class: TypeRef,
}

impl MappingProxy {
    #[must_use]
    pub fn new(class: TypeRef) -> Self {
        Self { class }
    }

    fn as_dict(&self) -> Value {
        Value::str_dict(self.class.own_items())
    }
}

fn key_name(key: &Value) -> RunResult<Option<&str>> {
    match key.as_str() {
        Some(name) => Ok(Some(name)),
        // non-str keys are hashed for the error, and can never be present
        None => ops::hash(key).map(|_| None),
    }
}

impl PyTrait for MappingProxy {
    fn py_type(&self) -> TypeRef {
        builtins().mapping_proxy.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        ops::repr_guarded(address_of(self), "...", || {
            Ok(format!("mappingproxy({})", ops::repr(&self.as_dict())?))
        })
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            CompareOp::Eq | CompareOp::Ne => self.as_dict().py_compare(op, other),
            _ => Ok(None),
        }
    }

    fn py_len(&self) -> RunResult<usize> {
        Ok(self.class.own_items().len())
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        key_name(key)?
            .and_then(|name| self.class.own_attr(name))
            .ok_or_else(|| ExcType::key_error(ops::repr(key).unwrap_or_default()))
    }

    fn py_setitem(&self, _key: Value, _value: Value) -> RunResult<()> {
        Err(ExcType::type_error_not_sub_assignment("mappingproxy"))
    }

    fn py_delitem(&self, _key: &Value) -> RunResult<()> {
        Err(ExcType::type_error_not_sub_deletion("mappingproxy"))
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        Ok(Some(key_name(item)?.is_some_and(|name| self.class.own_attr(name).is_some())))
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        let keys = self.class.own_items().into_iter().map(|(name, _)| Value::str(name));
        Ok(PyIterator::over(keys.collect()))
    }
}

/// Binds a `mappingproxy` method that works on a snapshot dict of the namespace.
fn via_dict(name: &'static str) -> NativeFn {
    native(move |args| {
        let (receiver, rest) = args.split_first(name)?;
        let proxy = receiver.downcast_ref::<MappingProxy>().ok_or_else(|| {
            ExcType::type_error(format!(
                "descriptor '{name}' for 'mappingproxy' objects doesn't apply to a '{}' object",
                receiver.type_name()
            ))
        })?;
        ops::call_method(&proxy.as_dict(), name, rest)
    })
}

pub(crate) fn methods() -> Vec<(&'static str, NativeFn)> {
    ["keys", "values", "items", "get", "copy"]
        .into_iter()
        .map(|name| (name, via_dict(name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args::ArgValues, types::ClassBuilder};

    #[test]
    fn view_tracks_class_changes() {
        let class = ClassBuilder::new("C").attr("a", 1_i64).build().unwrap();
        let view = ops::getattr(&class.to_value().unwrap(), "__dict__").unwrap();
        assert_eq!(ops::getitem(&view, &Value::str("a")).unwrap().as_int(), Some(1));
        class.set_attr("b", Value::int(2)).unwrap();
        assert!(ops::contains(&view, &Value::str("b")).unwrap());
        assert_eq!(ops::len(&view).unwrap(), 2);
    }

    #[test]
    fn read_only() {
        let class = ClassBuilder::new("C").build().unwrap();
        let view = Value::new(MappingProxy::new(class));
        let err = ops::setitem(&view, Value::str("x"), Value::int(1)).unwrap_err();
        assert_eq!(err.arg(), Some("'mappingproxy' object does not support item assignment"));
        assert_eq!(ops::getitem(&view, &Value::str("x")).unwrap_err().exc_type(), ExcType::KeyError);
    }

    #[test]
    fn methods_snapshot_namespace() {
        let class = ClassBuilder::new("C").attr("a", 1_i64).build().unwrap();
        let view = Value::new(MappingProxy::new(class));
        let keys = ops::call_method(&view, "keys", ArgValues::Empty).unwrap();
        assert_eq!(ops::collect_strings(&keys).unwrap(), vec!["a".to_owned()]);
    }
}
