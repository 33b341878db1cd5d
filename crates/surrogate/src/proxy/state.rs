//! Private per-proxy state.
//!
//! Every proxy instance owns one [`ProxyState`]. It is never reachable through the wrapped
//! object, so a proxy around an `int` (which cannot hold attributes) can still carry data.
//! Two kinds of entries live here:
//!
//! - attributes, set and read with `setattr`/`getattr` on the state value itself, and the
//!   storage for direct names that are plain data;
//! - typed extensions keyed by Rust type, for native data that should not be a [`Value`]
//!   (the masked-name set, a running digest).

use std::{
    any::{Any, TypeId},
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use ahash::AHashMap;

use crate::{
    dunder::Dunder,
    exception::{ExcType, RunResult},
    ops,
    types::{Dict, PyTrait, PyType, TypeRef, builtins, py_trait::address_of},
    value::Value,
};

static STATE_TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
    PyType::builtin(
        "proxy_state",
        &[&builtins().object],
        &[Dunder::Repr, Dunder::Getattribute, Dunder::Setattr, Dunder::Delattr, Dunder::Dir],
        Vec::new(),
        None,
    )
});

type Extensions = AHashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// The private namespace of one proxy.
pub struct ProxyState {
    /// A [`Dict`], exposed as the state's `__dict__`.
    attrs: Value,
    extensions: RwLock<Extensions>,
}

impl Default for ProxyState {
    fn default() -> Self {
        Self {
            attrs: Value::new(Dict::default()),
            extensions: RwLock::new(Extensions::default()),
        }
    }
}

impl ProxyState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn dict(&self) -> Option<&Dict> {
        self.attrs.downcast_ref::<Dict>()
    }

    /// Reads a state attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.dict().and_then(|dict| dict.get_str(name))
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        if let Some(dict) = self.dict() {
            dict.set_str(name, value.into());
        }
    }

    /// Removes a state attribute, returning it if it was present.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.dict().and_then(|dict| dict.remove_str(name))
    }

    /// The typed extension of type `T`, if one was stored.
    #[must_use]
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let extensions = self.extensions.read().unwrap_or_else(PoisonError::into_inner);
        extensions
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|ext| ext.downcast::<T>().ok())
    }

    /// Stores a typed extension, replacing any previous one of the same type.
    pub fn insert_extension<T: Any + Send + Sync>(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), value.clone());
        value
    }

    /// A shallow copy: new containers holding the same attribute values and extensions.
    ///
    /// Used when an in-place operator rebinds a proxy to a new wrapped value.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        let copy = Self::default();
        if let (Some(from), Some(to)) = (self.dict(), copy.dict()) {
            for (key, value) in from.items() {
                if let Some(name) = key.as_str() {
                    to.set_str(name, value);
                }
            }
        }
        let extensions = self.extensions.read().unwrap_or_else(PoisonError::into_inner).clone();
        *copy.extensions.write().unwrap_or_else(PoisonError::into_inner) = extensions;
        copy
    }
}

impl PyTrait for ProxyState {
    fn py_type(&self) -> TypeRef {
        STATE_TYPE.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        ops::repr_guarded(address_of(self), "<proxy_state ...>", || {
            Ok(format!(
                "<proxy_state at {:#x} {}>",
                address_of(self),
                ops::repr(&self.attrs)?
            ))
        })
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match self.get(name) {
            Some(value) => Ok(value),
            None => ops::generic_getattr(this, name),
        }
    }

    fn py_setattr(&self, name: &str, value: Value) -> RunResult<()> {
        self.set(name, value);
        Ok(())
    }

    fn py_delattr(&self, name: &str) -> RunResult<()> {
        self.remove(name)
            .map(drop)
            .ok_or_else(|| ExcType::attribute_error("proxy_state", name))
    }

    fn py_dir(&self) -> RunResult<Vec<String>> {
        let mut names = STATE_TYPE.dir();
        if let Some(dict) = self.dict() {
            names.extend(dict.keys().iter().filter_map(|key| key.as_str().map(str::to_owned)));
        }
        Ok(names)
    }

    fn py_attr_store(&self) -> Option<Value> {
        Some(self.attrs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    #[test]
    fn attributes_through_the_object_protocol() {
        let state = Value::new(ProxyState::new());
        ops::setattr(&state, "foo", Value::bool(true)).unwrap();
        assert_eq!(ops::getattr(&state, "foo").unwrap().as_bool(), Some(true));
        assert!(ops::dir(&state).unwrap().contains(&"foo".to_owned()));
        ops::delattr(&state, "foo").unwrap();
        let err = ops::getattr(&state, "foo").unwrap_err();
        assert_eq!(err.arg(), Some("'proxy_state' object has no attribute 'foo'"));
    }

    #[test]
    fn snapshot_copies_entries_not_containers() {
        let state = ProxyState::new();
        state.set("n", 1_i64);
        state.insert_extension(Counter(3));
        let copy = state.snapshot();
        copy.set("n", 2_i64);
        assert_eq!(state.get("n").and_then(|v| v.as_int()), Some(1));
        assert_eq!(copy.extension::<Counter>().map(|c| c.0), Some(3));
    }
}
