//! Masking proxies: forwarding proxies that hide a fixed set of names.
//!
//! A masking proxy refuses to read, write or delete the masked attributes with a
//! `MaskedAttributeError`, leaves them out of `dir()`, and exposes the wrapped object's
//! attribute store through a [`MaskingDict`] that applies the same mask to keys.
//! Everything else is plain forwarding.

use std::sync::{Arc, LazyLock};

use ahash::AHashSet;
use tracing::debug;

use crate::{
    args::ArgValues,
    dunder::{CompareOp, Dunder},
    exception::{ExcType, RunResult},
    ops,
    proxy::{Declaration, Receiver, Specialization, mark_direct},
    types::{PyIterator, PyTrait, PyType, TypeRef, builtins, function::NativeFn, native, py_trait::address_of},
    value::Value,
};

/// The frozen set of names a masking proxy hides.
#[derive(Debug, Default, Clone)]
pub struct MaskedNames(AHashSet<String>);

impl MaskedNames {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Whether `key` is a string naming a masked entry.
    #[must_use]
    pub fn masks_key(&self, key: &Value) -> bool {
        key.as_str().is_some_and(|name| self.contains(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The names, sorted.
    #[must_use]
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn masked_names(receiver: &Receiver<'_>) -> Arc<MaskedNames> {
    receiver.state().extension::<MaskedNames>().unwrap_or_default()
}

/// Fails with `MaskedAttributeError` when `name` is masked on this proxy.
fn check_unmasked(receiver: &Receiver<'_>, name: &str) -> RunResult<()> {
    if masked_names(receiver).contains(name) {
        debug!(name, wrapped = %receiver.original().type_name(), "masked attribute denied");
        return Err(ExcType::masked_attribute(name));
    }
    Ok(())
}

fn attr_name(args: ArgValues, dunder: Dunder) -> RunResult<(String, ArgValues)> {
    let (name, rest) = args.split_first(dunder.as_str())?;
    let name = ops::expect_str(&name, dunder.as_str())?;
    Ok((name, rest))
}

static MASKING: LazyLock<Arc<Specialization>> = LazyLock::new(|| {
    Specialization::builder("masking_proxy")
        .on_bind(|receiver, args| {
            let names = match args.get_zero_one_arg("masking_proxy")? {
                Some(names) if !names.is_none() => ops::collect_strings(&names)?,
                _ => Vec::new(),
            };
            let names = receiver.state().insert_extension(MaskedNames::new(names));
            debug!(
                wrapped = %receiver.original().type_name(),
                masked = ?names.sorted(),
                "created masking proxy"
            );
            Ok(())
        })
        .method(Dunder::Getattribute.as_str(), |receiver, args| {
            let (name, _) = attr_name(args, Dunder::Getattribute)?;
            check_unmasked(receiver, &name)?;
            receiver.super_getattr(&name)
        })
        .method(Dunder::Setattr.as_str(), |receiver, args| {
            let (name, rest) = attr_name(args, Dunder::Setattr)?;
            check_unmasked(receiver, &name)?;
            receiver.super_call(Dunder::Setattr.as_str(), rest.prepend(Value::str(name)))
        })
        .method(Dunder::Delattr.as_str(), |receiver, args| {
            let (name, rest) = attr_name(args, Dunder::Delattr)?;
            check_unmasked(receiver, &name)?;
            receiver.super_call(Dunder::Delattr.as_str(), rest.prepend(Value::str(name)))
        })
        .method(Dunder::Dir.as_str(), |receiver, args| {
            let masked = masked_names(receiver);
            let names = ops::collect_strings(&receiver.super_call(Dunder::Dir.as_str(), args)?)?;
            Ok(Value::list(
                names
                    .into_iter()
                    .filter(|name| !masked.contains(name))
                    .map(Value::str)
                    .collect(),
            ))
        })
        .declare(mark_direct(Declaration::property("__dict__", |receiver| {
            let store = ops::getattr(receiver.original(), "__dict__")?;
            Ok(Value::new(MaskingDict::from_shared(store, masked_names(receiver))))
        })))
        .build()
});

/// The masking specialization, for deriving further specializations from it.
#[must_use]
pub fn masking_specialization() -> &'static Arc<Specialization> {
    &MASKING
}

/// Wraps `wrapped` in a proxy that hides `masked`.
pub fn masking_proxy(wrapped: Value, masked: impl IntoIterator<Item = impl Into<String>>) -> RunResult<Value> {
    let names = masked.into_iter().map(|name| Value::str(name.into())).collect();
    MASKING.bind(wrapped, ArgValues::One(Value::list(names)))
}

const MASKING_DICT_SLOTS: &[Dunder] = &[
    Dunder::Repr,
    Dunder::Eq,
    Dunder::Ne,
    Dunder::Len,
    Dunder::Getitem,
    Dunder::Setitem,
    Dunder::Delitem,
    Dunder::Iter,
    Dunder::Contains,
];

static MASKING_DICT_TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
    PyType::builtin(
        "MaskingDict",
        &[&builtins().object],
        MASKING_DICT_SLOTS,
        masking_dict_methods(),
        None,
    )
});

/// A live view over a mapping with some string keys hidden.
///
/// Reads and writes of unmasked keys go straight to the underlying mapping. Masked keys
/// are absent from `len`, iteration and membership, and explicit access to one raises
/// `MaskedKeyError`.
pub struct MaskingDict {
    data: Value,
    masked: Arc<MaskedNames>,
}

impl MaskingDict {
    pub fn new(data: Value, masked: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::from_shared(data, Arc::new(MaskedNames::new(masked)))
    }

    fn from_shared(data: Value, masked: Arc<MaskedNames>) -> Self {
        Self { data, masked }
    }

    /// The underlying mapping.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    fn check_key(&self, key: &Value) -> RunResult<()> {
        if self.masked.masks_key(key) {
            debug!(wrapped = %self.data.type_name(), "masked key denied");
            return Err(ExcType::masked_key(ops::repr(key)?));
        }
        Ok(())
    }

    fn visible_keys(&self) -> RunResult<Vec<Value>> {
        let keys = ops::collect(&self.data)?;
        Ok(keys.into_iter().filter(|key| !self.masked.masks_key(key)).collect())
    }

    fn visible_items(&self) -> RunResult<Vec<(Value, Value)>> {
        self.visible_keys()?
            .into_iter()
            .map(|key| {
                let value = ops::getitem(&self.data, &key)?;
                Ok((key, value))
            })
            .collect()
    }

    /// A plain dict of the unmasked entries.
    fn snapshot(&self) -> RunResult<Value> {
        Value::dict(self.visible_items()?)
    }
}

impl PyTrait for MaskingDict {
    fn py_type(&self) -> TypeRef {
        MASKING_DICT_TYPE.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        ops::repr_guarded(address_of(self), "{...}", || ops::repr(&self.snapshot()?))
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            CompareOp::Eq | CompareOp::Ne => {
                let other = match other.downcast_ref::<Self>() {
                    Some(view) => view.snapshot()?,
                    None => other.clone(),
                };
                ops::compare(&self.snapshot()?, op, &other).map(ops::implemented)
            }
            _ => Ok(None),
        }
    }

    fn py_len(&self) -> RunResult<usize> {
        Ok(self.visible_keys()?.len())
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        self.check_key(key)?;
        ops::getitem(&self.data, key)
    }

    fn py_setitem(&self, key: Value, value: Value) -> RunResult<()> {
        self.check_key(&key)?;
        ops::setitem(&self.data, key, value)
    }

    fn py_delitem(&self, key: &Value) -> RunResult<()> {
        self.check_key(key)?;
        ops::delitem(&self.data, key)
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        if self.masked.masks_key(item) {
            return Ok(Some(false));
        }
        ops::contains(&self.data, item).map(Some)
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        Ok(PyIterator::over(self.visible_keys()?))
    }
}

fn with_view(name: &'static str, body: fn(&MaskingDict, ArgValues) -> RunResult<Value>) -> NativeFn {
    native(move |args| {
        let (receiver, rest) = args.split_first(name)?;
        let view = receiver.downcast_ref::<MaskingDict>().ok_or_else(|| {
            ExcType::type_error(format!(
                "descriptor '{name}' for 'MaskingDict' objects doesn't apply to a '{}' object",
                receiver.type_name()
            ))
        })?;
        body(view, rest)
    })
}

fn masking_dict_methods() -> Vec<(&'static str, NativeFn)> {
    vec![
        (
            "keys",
            with_view("keys", |view, args| {
                args.check_zero_args("keys")?;
                Ok(Value::list(view.visible_keys()?))
            }),
        ),
        (
            "values",
            with_view("values", |view, args| {
                args.check_zero_args("values")?;
                let items = view.visible_items()?;
                Ok(Value::list(items.into_iter().map(|(_, value)| value).collect()))
            }),
        ),
        (
            "items",
            with_view("items", |view, args| {
                args.check_zero_args("items")?;
                let items = view.visible_items()?;
                Ok(Value::list(
                    items.into_iter().map(|(key, value)| Value::tuple([key, value])).collect(),
                ))
            }),
        ),
        (
            "get",
            with_view("get", |view, args| {
                let (key, default) = args.get_one_two_args("get")?;
                view.check_key(&key)?;
                if ops::contains(&view.data, &key)? {
                    ops::getitem(&view.data, &key)
                } else {
                    Ok(default.unwrap_or_else(Value::none))
                }
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::str_dict([("name", Value::str("Bob")), ("password", Value::str("secret"))])
    }

    #[test]
    fn view_hides_masked_keys() {
        let view = Value::new(MaskingDict::new(sample(), ["password"]));
        assert_eq!(ops::len(&view).unwrap(), 1);
        assert!(!ops::contains(&view, &Value::str("password")).unwrap());
        assert_eq!(ops::repr(&view).unwrap(), "{'name': 'Bob'}");
        let err = ops::getitem(&view, &Value::str("password")).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::MaskedKeyError);
        assert_eq!(err.arg(), Some("'password'"));
    }

    #[test]
    fn view_writes_through() {
        let data = sample();
        let view = Value::new(MaskingDict::new(data.clone(), ["password"]));
        ops::setitem(&view, Value::str("name"), Value::str("Alice")).unwrap();
        assert_eq!(ops::getitem(&data, &Value::str("name")).unwrap().as_str(), Some("Alice"));
        assert!(ops::delitem(&view, &Value::str("password")).is_err());
        assert_eq!(ops::len(&data).unwrap(), 2);
    }

    #[test]
    fn get_method_respects_mask() {
        let view = Value::new(MaskingDict::new(sample(), ["password"]));
        let missing = ops::call_method(&view, "get", ArgValues::Two(Value::str("age"), Value::int(0))).unwrap();
        assert_eq!(missing.as_int(), Some(0));
        assert!(ops::call_method(&view, "get", ArgValues::One(Value::str("password"))).is_err());
    }
}
