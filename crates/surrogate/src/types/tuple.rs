use smallvec::SmallVec;

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Dunder},
    exception::{ExcType, RunResult},
    ops, py_hash,
    types::{
        PyIterator, PyTrait, TypeRef, builtins,
        function::{NativeFn, native},
        list::{sequence_compare, sequence_repr},
        py_trait::address_of,
        str::{normalize_index, repeat_count, repeat_items},
    },
    value::Value,
};

pub(crate) const TUPLE_SLOTS: &[Dunder] = &[
    Dunder::Repr,
    Dunder::Lt,
    Dunder::Le,
    Dunder::Eq,
    Dunder::Ne,
    Dunder::Gt,
    Dunder::Ge,
    Dunder::Hash,
    Dunder::Len,
    Dunder::Getitem,
    Dunder::Iter,
    Dunder::Contains,
    Dunder::Add,
    Dunder::Mul,
    Dunder::Rmul,
];

/// Most tuples built here are pairs (`divmod`, coercion, dict items).
pub(crate) type TupleItems = SmallVec<[Value; 3]>;

/// An immutable `tuple`.
#[derive(Debug, Default)]
pub struct Tuple(TupleItems);

impl Tuple {
    #[must_use]
    pub fn new(items: TupleItems) -> Self {
        Self(items)
    }

    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.0
    }
}

impl PyTrait for Tuple {
    fn py_type(&self) -> TypeRef {
        builtins().tuple.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        if let [single] = self.0.as_slice() {
            return Ok(format!("({},)", ops::repr(single)?));
        }
        sequence_repr(address_of(self), "(", ")", &self.0)
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        let Some(other) = other.downcast_ref::<Self>() else {
            return Ok(None);
        };
        Ok(Some(Value::bool(sequence_compare(&self.0, op, &other.0)?)))
    }

    fn py_hash(&self) -> RunResult<i64> {
        let lanes = self.0.iter().map(ops::hash).collect::<RunResult<Vec<_>>>()?;
        Ok(py_hash::hash_tuple(lanes.into_iter()))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(!self.0.is_empty())
    }

    fn py_len(&self) -> RunResult<usize> {
        Ok(self.0.len())
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        let index = key.as_int().ok_or_else(|| {
            ExcType::type_error(format!("tuple indices must be integers, not {}", key.type_name()))
        })?;
        Ok(self.0[normalize_index(index, self.0.len(), "tuple")?].clone())
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        for candidate in &self.0 {
            if candidate.is(item) || ops::eq(candidate, item)? {
                return Ok(Some(true));
            }
        }
        Ok(Some(false))
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        Ok(PyIterator::over(self.0.to_vec()))
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            BinaryOp::Add => Ok(other
                .downcast_ref::<Self>()
                .map(|other| Value::tuple(self.0.iter().chain(other.0.iter()).cloned()))),
            BinaryOp::Mul => repeat_count(other)
                .map(|count| repeat_items(&self.0, count, "tuple").map(Value::tuple))
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
}

fn with_tuple(args: ArgValues, name: &'static str, body: impl FnOnce(&Tuple, Value) -> RunResult<Value>) -> RunResult<Value> {
    let (receiver, rest) = args.split_first(name)?;
    let tuple = receiver.downcast_ref::<Tuple>().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor '{name}' for 'tuple' objects doesn't apply to a '{}' object",
            receiver.type_name()
        ))
    })?;
    body(tuple, rest.get_one_arg(name)?)
}

pub(crate) fn methods() -> Vec<(&'static str, NativeFn)> {
    vec![
        (
            "index",
            native(|args| {
                with_tuple(args, "index", |tuple, item| {
                    for (index, candidate) in tuple.items().iter().enumerate() {
                        if candidate.is(&item) || ops::eq(candidate, &item)? {
                            return ops::int_from_usize(index);
                        }
                    }
                    Err(ExcType::value_error("tuple.index(x): x not in tuple"))
                })
            }),
        ),
        (
            "count",
            native(|args| {
                with_tuple(args, "count", |tuple, item| {
                    let mut count = 0;
                    for candidate in tuple.items() {
                        if candidate.is(&item) || ops::eq(candidate, &item)? {
                            count += 1;
                        }
                    }
                    ops::int_from_usize(count)
                })
            }),
        ),
    ]
}

/// `tuple()` and `tuple(iterable)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    match args.get_zero_one_arg("tuple")? {
        Some(iterable) => Ok(Value::tuple(ops::collect(&iterable)?)),
        None => Ok(Value::tuple([])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_forms() {
        assert_eq!(ops::repr(&Value::tuple([])).unwrap(), "()");
        assert_eq!(ops::repr(&Value::tuple([Value::int(1)])).unwrap(), "(1,)");
        assert_eq!(ops::repr(&Value::tuple([Value::int(1), Value::str("a")])).unwrap(), "(1, 'a')");
    }

    #[test]
    fn empty_tuple_hash_matches() {
        assert_eq!(ops::hash(&Value::tuple([])).unwrap(), 5_740_354_900_026_072_187);
    }

    #[test]
    fn unhashable_items_make_the_tuple_unhashable() {
        let tuple = Value::tuple([Value::list(Vec::new())]);
        assert_eq!(ops::hash(&tuple).unwrap_err().exc_type(), ExcType::TypeError);
    }
}
