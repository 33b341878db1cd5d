//! `list`, the mutable sequence.
//!
//! Slots never call back into other objects while holding the item lock: they work on a
//! snapshot and write back afterwards, so a list that contains itself (or whose items'
//! `__eq__` touches the list) cannot deadlock.

use std::{
    cmp::Ordering,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Dunder},
    exception::{ExcType, Exception, RunResult},
    ops,
    types::{
        PyIterator, PyTrait, TypeRef, builtins,
        function::{NativeFn, native},
        py_trait::address_of,
        str::{normalize_index, repeat_count, repeat_items},
    },
    value::Value,
};

pub(crate) const LIST_SLOTS: &[Dunder] = &[
    Dunder::Repr,
    Dunder::Lt,
    Dunder::Le,
    Dunder::Eq,
    Dunder::Ne,
    Dunder::Gt,
    Dunder::Ge,
    Dunder::Len,
    Dunder::Getitem,
    Dunder::Setitem,
    Dunder::Delitem,
    Dunder::Iter,
    Dunder::Reversed,
    Dunder::Contains,
    Dunder::Add,
    Dunder::Mul,
    Dunder::Rmul,
    Dunder::Iadd,
    Dunder::Imul,
];

#[derive(Debug, Default)]
pub struct List {
    items: RwLock<Vec<Value>>,
}

impl List {
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// A snapshot of the items.
    #[must_use]
    pub fn items(&self) -> Vec<Value> {
        self.read().clone()
    }

    pub fn push(&self, item: Value) {
        self.write().push(item);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Lexicographic comparison of two sequences, the way `list` and `tuple` compare.
pub(crate) fn sequence_compare(left: &[Value], op: CompareOp, right: &[Value]) -> RunResult<bool> {
    for (a, b) in left.iter().zip(right) {
        if a.is(b) || ops::eq(a, b)? {
            continue;
        }
        return match op {
            CompareOp::Eq => Ok(false),
            CompareOp::Ne => Ok(true),
            _ => ops::truthy(&ops::compare(a, op, b)?),
        };
    }
    Ok(op.matches(left.len().cmp(&right.len())))
}

/// `[a, b]`-style rendering of items, guarding against self-reference.
pub(crate) fn sequence_repr(id: usize, open: &str, close: &str, items: &[Value]) -> RunResult<String> {
    let placeholder = format!("{open}...{close}");
    ops::repr_guarded(id, &placeholder, || {
        let parts = items.iter().map(ops::repr).collect::<RunResult<Vec<_>>>()?;
        Ok(format!("{open}{}{close}", parts.join(", ")))
    })
}

fn index_of(key: &Value, len: usize) -> RunResult<usize> {
    let index = key.as_int().ok_or_else(|| {
        ExcType::type_error(format!("list indices must be integers, not {}", key.type_name()))
    })?;
    normalize_index(index, len, "list")
}

impl PyTrait for List {
    fn py_type(&self) -> TypeRef {
        builtins().list.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        sequence_repr(address_of(self), "[", "]", &self.items())
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        let Some(other) = other.downcast_ref::<Self>() else {
            return Ok(None);
        };
        Ok(Some(Value::bool(sequence_compare(&self.items(), op, &other.items())?)))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Err(ExcType::type_error_unhashable("list"))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(!self.is_empty())
    }

    fn py_len(&self) -> RunResult<usize> {
        Ok(self.len())
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        let items = self.read();
        let index = index_of(key, items.len())?;
        Ok(items[index].clone())
    }

    fn py_setitem(&self, key: Value, value: Value) -> RunResult<()> {
        let mut items = self.write();
        let index = index_of(&key, items.len())?;
        items[index] = value;
        Ok(())
    }

    fn py_delitem(&self, key: &Value) -> RunResult<()> {
        let mut items = self.write();
        let index = index_of(key, items.len())?;
        items.remove(index);
        Ok(())
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        for candidate in self.items() {
            if candidate.is(item) || ops::eq(&candidate, item)? {
                return Ok(Some(true));
            }
        }
        Ok(Some(false))
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        Ok(PyIterator::over(self.items()))
    }

    fn py_reversed(&self) -> RunResult<Value> {
        let mut items = self.items();
        items.reverse();
        Ok(PyIterator::over(items))
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            BinaryOp::Add => Ok(other.downcast_ref::<Self>().map(|other| {
                let mut items = self.items();
                items.extend(other.items());
                Value::list(items)
            })),
            BinaryOp::Mul => repeat_count(other)
                .map(|count| repeat_items(&self.items(), count, "list").map(Value::list))
                .transpose(),
            _ => Ok(None),
        }
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            BinaryOp::Mul => self.py_binary(op, other),
            _ => Ok(None),
        }
    }

    fn py_inplace(&self, this: &Value, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            BinaryOp::Add => {
                let extra = ops::collect(other)?;
                self.write().extend(extra);
                Ok(Some(this.clone()))
            }
            BinaryOp::Mul => {
                let Some(count) = repeat_count(other) else {
                    return Ok(None);
                };
                let mut items = self.write();
                let repeated = repeat_items(&items, count, "list")?;
                *items = repeated;
                Ok(Some(this.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// Runs `body` with the receiver of a `list` method.
fn with_list(
    args: ArgValues,
    name: &'static str,
    body: impl FnOnce(&List, ArgValues) -> RunResult<Value>,
) -> RunResult<Value> {
    let (receiver, rest) = args.split_first(name)?;
    let list = receiver.downcast_ref::<List>().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor '{name}' for 'list' objects doesn't apply to a '{}' object",
            receiver.type_name()
        ))
    })?;
    body(list, rest)
}

/// Position of the first item equal to `item`.
fn position(items: &[Value], item: &Value) -> RunResult<Option<usize>> {
    for (index, candidate) in items.iter().enumerate() {
        if candidate.is(item) || ops::eq(candidate, item)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Stable sort by `<`, propagating the first comparison error.
fn sort_values(items: &mut [Value]) -> RunResult<()> {
    let mut error = None;
    items.sort_by(|a, b| {
        if error.is_some() {
            return Ordering::Equal;
        }
        match ops::lt(a, b) {
            Ok(true) => Ordering::Less,
            Ok(false) => match ops::lt(b, a) {
                Ok(true) => Ordering::Greater,
                Ok(false) => Ordering::Equal,
                Err(exc) => {
                    error = Some(exc);
                    Ordering::Equal
                }
            },
            Err(exc) => {
                error = Some(exc);
                Ordering::Equal
            }
        }
    });
    error.map_or(Ok(()), Err)
}

pub(crate) fn methods() -> Vec<(&'static str, NativeFn)> {
    vec![
        (
            "append",
            native(|args| {
                with_list(args, "append", |list, rest| {
                    list.push(rest.get_one_arg("append")?);
                    Ok(Value::none())
                })
            }),
        ),
        (
            "extend",
            native(|args| {
                with_list(args, "extend", |list, rest| {
                    let extra = ops::collect(&rest.get_one_arg("extend")?)?;
                    list.write().extend(extra);
                    Ok(Value::none())
                })
            }),
        ),
        (
            "insert",
            native(|args| {
                with_list(args, "insert", |list, rest| {
                    let (index, item) = rest.get_two_args("insert")?;
                    let index = ops::index(&index)?;
                    let mut items = list.write();
                    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                    let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
                    items.insert(usize::try_from(index).unwrap_or(0), item);
                    Ok(Value::none())
                })
            }),
        ),
        (
            "pop",
            native(|args| {
                with_list(args, "pop", |list, rest| {
                    let index = rest.get_zero_one_arg("pop")?.map(|i| ops::index(&i)).transpose()?;
                    let mut items = list.write();
                    if items.is_empty() {
                        return Err(Exception::new_msg(ExcType::IndexError, "pop from empty list"));
                    }
                    let position = match index {
                        Some(index) => normalize_index(index, items.len(), "pop")?,
                        None => items.len() - 1,
                    };
                    Ok(items.remove(position))
                })
            }),
        ),
        (
            "remove",
            native(|args| {
                with_list(args, "remove", |list, rest| {
                    let item = rest.get_one_arg("remove")?;
                    let found = position(&list.items(), &item)?;
                    match found {
                        Some(index) => {
                            list.write().remove(index);
                            Ok(Value::none())
                        }
                        None => Err(ExcType::value_error("list.remove(x): x not in list")),
                    }
                })
            }),
        ),
        (
            "index",
            native(|args| {
                with_list(args, "index", |list, rest| {
                    let item = rest.get_one_arg("index")?;
                    match position(&list.items(), &item)? {
                        Some(index) => ops::int_from_usize(index),
                        None => Err(ExcType::value_error(format!("{} is not in list", ops::repr(&item)?))),
                    }
                })
            }),
        ),
        (
            "count",
            native(|args| {
                with_list(args, "count", |list, rest| {
                    let item = rest.get_one_arg("count")?;
                    let mut count = 0;
                    for candidate in list.items() {
                        if candidate.is(&item) || ops::eq(&candidate, &item)? {
                            count += 1;
                        }
                    }
                    ops::int_from_usize(count)
                })
            }),
        ),
        (
            "reverse",
            native(|args| {
                with_list(args, "reverse", |list, rest| {
                    rest.check_zero_args("reverse")?;
                    list.write().reverse();
                    Ok(Value::none())
                })
            }),
        ),
        (
            "clear",
            native(|args| {
                with_list(args, "clear", |list, rest| {
                    rest.check_zero_args("clear")?;
                    list.write().clear();
                    Ok(Value::none())
                })
            }),
        ),
        (
            "copy",
            native(|args| {
                with_list(args, "copy", |list, rest| {
                    rest.check_zero_args("copy")?;
                    Ok(Value::list(list.items()))
                })
            }),
        ),
        (
            "sort",
            native(|args| {
                with_list(args, "sort", |list, rest| {
                    rest.check_zero_args("sort")?;
                    let mut items = list.items();
                    sort_values(&mut items)?;
                    *list.write() = items;
                    Ok(Value::none())
                })
            }),
        ),
    ]
}

/// `list()` and `list(iterable)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    match args.get_zero_one_arg("list")? {
        Some(iterable) => Ok(Value::list(ops::collect(&iterable)?)),
        None => Ok(Value::list(Vec::new())),
    }
}
