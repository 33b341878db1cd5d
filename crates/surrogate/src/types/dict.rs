//! `dict`, preserving insertion order.
//!
//! Entries are addressed by a per-dict id and indexed by the key's hash. Key equality is
//! `==` on the keys, evaluated with the table unlocked so a key's `__eq__` can raise or
//! touch the dict it is being looked up in. A lookup whose table changed shape while
//! its keys were compared starts over.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    args::{ArgValues, Kwargs},
    dunder::{CompareOp, Dunder},
    exception::{ExcType, Exception, RunResult},
    ops, py_hash,
    types::{
        PyIterator, PyTrait, TypeRef, builtins,
        function::{NativeFn, native},
        py_trait::address_of,
    },
    value::Value,
};

pub(crate) const DICT_SLOTS: &[Dunder] = &[
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

/// Times a lookup starts over before giving up on a dict that keeps changing under it.
const MAX_LOOKUP_RESTARTS: usize = 64;

#[derive(Debug)]
struct Entry {
    hash: i64,
    key: Value,
    value: Value,
}

#[derive(Debug, Default)]
struct Table {
    entries: IndexMap<u64, Entry, ahash::RandomState>,
    by_hash: AHashMap<i64, SmallVec<[u64; 1]>>,
    next_id: u64,
    /// Bumped by every insertion and removal.
    version: u64,
}

impl Table {
    fn ids_for(&self, hash: i64) -> impl Iterator<Item = u64> + '_ {
        self.by_hash.get(&hash).into_iter().flatten().copied()
    }

    fn find_str(&self, hash: i64, key: &str) -> Option<u64> {
        self.ids_for(hash)
            .find(|id| self.entries.get(id).is_some_and(|entry| entry.key.as_str() == Some(key)))
    }

    fn push(&mut self, hash: i64, key: Value, value: Value) {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, Entry { hash, key, value });
        self.by_hash.entry(hash).or_default().push(id);
        self.version += 1;
    }

    fn assign(&mut self, id: Option<u64>, hash: i64, key: Value, value: Value) {
        match id.and_then(|id| self.entries.get_mut(&id)) {
            Some(entry) => entry.value = value,
            None => self.push(hash, key, value),
        }
    }

    fn take(&mut self, id: u64) -> Option<Entry> {
        let entry = self.entries.shift_remove(&id)?;
        if let Some(ids) = self.by_hash.get_mut(&entry.hash) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_hash.remove(&entry.hash);
            }
        }
        self.version += 1;
        Some(entry)
    }
}

/// Where a key was found, and the table version the search saw.
struct Located {
    id: Option<u64>,
    version: u64,
}

#[derive(Debug, Default)]
pub struct Dict {
    table: RwLock<Table>,
}

impl Dict {
    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Finds the entry whose key equals `key`, comparing with the table unlocked.
    fn locate(&self, hash: i64, key: &Value) -> RunResult<Located> {
        let (candidates, version) = {
            let table = self.read();
            let candidates: SmallVec<[(u64, Value); 1]> = table
                .ids_for(hash)
                .filter_map(|id| table.entries.get(&id).map(|entry| (id, entry.key.clone())))
                .collect();
            (candidates, table.version)
        };
        for (id, candidate) in candidates {
            if candidate.is(key) || ops::eq(&candidate, key)? {
                return Ok(Located { id: Some(id), version });
            }
        }
        Ok(Located { id: None, version })
    }

    /// `d[key] = value`.
    pub fn set(&self, key: Value, value: Value) -> RunResult<()> {
        let hash = ops::hash(&key)?;
        for _ in 0..MAX_LOOKUP_RESTARTS {
            let located = self.locate(hash, &key)?;
            let mut table = self.write();
            if table.version == located.version {
                table.assign(located.id, hash, key, value);
                return Ok(());
            }
        }
        Err(changed_during_lookup())
    }

    /// `d[key] = value` for a string key. String keys match string entries only.
    pub fn set_str(&self, key: &str, value: Value) {
        let hash = py_hash::hash_str(key);
        let mut table = self.write();
        let id = table.find_str(hash, key);
        table.assign(id, hash, Value::str(key), value);
    }

    /// `d.get(key)`.
    pub fn get(&self, key: &Value) -> RunResult<Option<Value>> {
        let hash = ops::hash(key)?;
        for _ in 0..MAX_LOOKUP_RESTARTS {
            let located = self.locate(hash, key)?;
            let table = self.read();
            if table.version == located.version {
                let entry = located.id.and_then(|id| table.entries.get(&id));
                return Ok(entry.map(|entry| entry.value.clone()));
            }
        }
        Err(changed_during_lookup())
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<Value> {
        let table = self.read();
        let id = table.find_str(py_hash::hash_str(key), key)?;
        table.entries.get(&id).map(|entry| entry.value.clone())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &Value) -> RunResult<Option<Value>> {
        let hash = ops::hash(key)?;
        for _ in 0..MAX_LOOKUP_RESTARTS {
            let located = self.locate(hash, key)?;
            let removed = {
                let mut table = self.write();
                if table.version != located.version {
                    continue;
                }
                located.id.and_then(|id| table.take(id))
            };
            return Ok(removed.map(|entry| entry.value));
        }
        Err(changed_during_lookup())
    }

    pub fn remove_str(&self, key: &str) -> Option<Value> {
        let removed = {
            let mut table = self.write();
            let id = table.find_str(py_hash::hash_str(key), key)?;
            table.take(id)
        };
        removed.map(|entry| entry.value)
    }

    /// A snapshot of the keys, in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<Value> {
        self.read().entries.values().map(|entry| entry.key.clone()).collect()
    }

    /// A snapshot of the values, in insertion order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.read().entries.values().map(|entry| entry.value.clone()).collect()
    }

    /// A snapshot of the entries, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<(Value, Value)> {
        self.read()
            .entries
            .values()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn clear(&self) {
        let mut table = self.write();
        let cleared = Table {
            next_id: table.next_id,
            version: table.version + 1,
            ..Table::default()
        };
        *table = cleared;
    }

    /// `d.update(other)`: from a mapping (anything with `keys()`) or an iterable of pairs.
    pub fn update(&self, other: &Value) -> RunResult<()> {
        for (key, value) in mapping_items(other)? {
            self.set(key, value)?;
        }
        Ok(())
    }

    fn update_kwargs(&self, kwargs: Kwargs) {
        for (key, value) in kwargs {
            self.set_str(&key, value);
        }
    }
}

fn changed_during_lookup() -> Exception {
    ExcType::runtime_error("dictionary keeps changing during lookup")
}

/// The `(key, value)` pairs of a mapping or of an iterable of pairs.
pub(crate) fn mapping_items(source: &Value) -> RunResult<Vec<(Value, Value)>> {
    if let Some(dict) = source.downcast_ref::<Dict>() {
        return Ok(dict.items());
    }
    if ops::hasattr(source, "keys")? {
        let keys = ops::collect(&ops::call_method(source, "keys", ArgValues::Empty)?)?;
        return keys
            .into_iter()
            .map(|key| {
                let value = ops::getitem(source, &key)?;
                Ok((key, value))
            })
            .collect();
    }
    let mut pairs = Vec::new();
    for (index, item) in ops::collect(source)?.into_iter().enumerate() {
        let pair = ops::collect(&item)?;
        let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
            ExcType::value_error(format!(
                "dictionary update sequence element #{index} has length {}; 2 is required",
                pair.len()
            ))
        })?;
        pairs.push((key, value));
    }
    Ok(pairs)
}

impl PyTrait for Dict {
    fn py_type(&self) -> TypeRef {
        builtins().dict.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        let items = self.items();
        ops::repr_guarded(address_of(self), "{...}", || {
            let parts = items
                .iter()
                .map(|(k, v)| Ok(format!("{}: {}", ops::repr(k)?, ops::repr(v)?)))
                .collect::<RunResult<Vec<_>>>()?;
            Ok(format!("{{{}}}", parts.join(", ")))
        })
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        let Some(other) = other.downcast_ref::<Self>() else {
            return Ok(None);
        };
        let equal = match op {
            CompareOp::Eq | CompareOp::Ne => {
                let mine = self.items();
                let mut equal = mine.len() == other.len();
                for (key, value) in &mine {
                    if !equal {
                        break;
                    }
                    equal = match other.get(key)? {
                        Some(theirs) => theirs.is(value) || ops::eq(value, &theirs)?,
                        None => false,
                    };
                }
                equal
            }
            _ => return Ok(None),
        };
        Ok(Some(Value::bool(if op == CompareOp::Eq { equal } else { !equal })))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Err(ExcType::type_error_unhashable("dict"))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(!self.is_empty())
    }

    fn py_len(&self) -> RunResult<usize> {
        Ok(self.len())
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        self.get(key)?.ok_or_else(|| missing_key(key))
    }

    fn py_setitem(&self, key: Value, value: Value) -> RunResult<()> {
        self.set(key, value)
    }

    fn py_delitem(&self, key: &Value) -> RunResult<()> {
        self.remove(key)?.map(drop).ok_or_else(|| missing_key(key))
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        Ok(Some(self.get(item)?.is_some()))
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        Ok(PyIterator::over(self.keys()))
    }
}

/// `KeyError(repr(key))`.
pub(crate) fn missing_key(key: &Value) -> Exception {
    ExcType::key_error(ops::repr(key).unwrap_or_else(|_| key.type_name()))
}

fn with_dict(args: ArgValues, name: &'static str, body: impl FnOnce(&Dict, ArgValues) -> RunResult<Value>) -> RunResult<Value> {
    let (receiver, rest) = args.split_first(name)?;
    let dict = receiver.downcast_ref::<Dict>().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor '{name}' for 'dict' objects doesn't apply to a '{}' object",
            receiver.type_name()
        ))
    })?;
    body(dict, rest)
}

fn pairs_value(pairs: Vec<(Value, Value)>) -> Value {
    Value::list(pairs.into_iter().map(|(k, v)| Value::tuple([k, v])).collect())
}

pub(crate) fn methods() -> Vec<(&'static str, NativeFn)> {
    vec![
        (
            "keys",
            native(|args| {
                with_dict(args, "keys", |dict, rest| {
                    rest.check_zero_args("keys")?;
                    Ok(Value::list(dict.keys()))
                })
            }),
        ),
        (
            "values",
            native(|args| {
                with_dict(args, "values", |dict, rest| {
                    rest.check_zero_args("values")?;
                    Ok(Value::list(dict.values()))
                })
            }),
        ),
        (
            "items",
            native(|args| {
                with_dict(args, "items", |dict, rest| {
                    rest.check_zero_args("items")?;
                    Ok(pairs_value(dict.items()))
                })
            }),
        ),
        (
            "get",
            native(|args| {
                with_dict(args, "get", |dict, rest| {
                    let (key, default) = rest.get_one_two_args("get")?;
                    Ok(dict.get(&key)?.or(default).unwrap_or_else(Value::none))
                })
            }),
        ),
        (
            "pop",
            native(|args| {
                with_dict(args, "pop", |dict, rest| {
                    let (key, default) = rest.get_one_two_args("pop")?;
                    match (dict.remove(&key)?, default) {
                        (Some(value), _) | (None, Some(value)) => Ok(value),
                        (None, None) => Err(missing_key(&key)),
                    }
                })
            }),
        ),
        (
            "setdefault",
            native(|args| {
                with_dict(args, "setdefault", |dict, rest| {
                    let (key, default) = rest.get_one_two_args("setdefault")?;
                    if let Some(existing) = dict.get(&key)? {
                        return Ok(existing);
                    }
                    let default = default.unwrap_or_else(Value::none);
                    dict.set(key, default.clone())?;
                    Ok(default)
                })
            }),
        ),
        (
            "update",
            native(|args| {
                with_dict(args, "update", |dict, rest| {
                    let (positional, kwargs) = rest.into_parts();
                    if positional.len() > 1 {
                        return Err(ExcType::type_error_at_most("update", 1, positional.len()));
                    }
                    if let Some(source) = positional.first() {
                        dict.update(source)?;
                    }
                    dict.update_kwargs(kwargs);
                    Ok(Value::none())
                })
            }),
        ),
        (
            "clear",
            native(|args| {
                with_dict(args, "clear", |dict, rest| {
                    rest.check_zero_args("clear")?;
                    dict.clear();
                    Ok(Value::none())
                })
            }),
        ),
        (
            "copy",
            native(|args| {
                with_dict(args, "copy", |dict, rest| {
                    rest.check_zero_args("copy")?;
                    Value::dict(dict.items())
                })
            }),
        ),
    ]
}

/// `dict()`, `dict(mapping_or_pairs)` and `dict(**kwargs)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    let (positional, kwargs) = args.into_parts();
    if positional.len() > 1 {
        return Err(ExcType::type_error_at_most("dict", 1, positional.len()));
    }
    let dict = Dict::default();
    if let Some(source) = positional.first() {
        dict.update(source)?;
    }
    dict.update_kwargs(kwargs);
    Ok(Value::new(dict))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_numbers_are_the_same_key() {
        let dict = Dict::default();
        dict.set(Value::int(1), Value::str("int")).unwrap();
        dict.set(Value::float(1.0), Value::str("float")).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::bool(true)).unwrap().unwrap().as_str(), Some("float"));
    }

    #[test]
    fn missing_keys_raise_key_error_with_repr() {
        let dict = Value::str_dict([("a", Value::int(1))]);
        let err = ops::getitem(&dict, &Value::str("b")).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::KeyError);
        assert_eq!(err.arg(), Some("'b'"));
    }

    #[test]
    fn unhashable_keys_are_rejected() {
        let dict = Dict::default();
        let err = dict.set(Value::list(Vec::new()), Value::none()).unwrap_err();
        assert_eq!(err.arg(), Some("unhashable type: 'list'"));
    }

    #[test]
    fn repr_and_methods() {
        let dict = Value::str_dict([("a", Value::int(1)), ("b", Value::int(2))]);
        assert_eq!(ops::repr(&dict).unwrap(), "{'a': 1, 'b': 2}");
        let got = ops::call_method(&dict, "get", ArgValues::Two(Value::str("z"), Value::int(0))).unwrap();
        assert_eq!(got.as_int(), Some(0));
        let copy = ops::call_method(&dict, "copy", ArgValues::Empty).unwrap();
        assert!(ops::eq(&copy, &dict).unwrap());
        assert!(!copy.is(&dict));
    }
}
