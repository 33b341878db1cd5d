use std::sync::{Mutex, PoisonError};

use crate::{
    dunder::Dunder,
    exception::RunResult,
    types::{PyTrait, TypeRef, builtins},
    value::Value,
};

pub(crate) const ITER_SLOTS: &[Dunder] = &[Dunder::Iter, Dunder::Next, Dunder::LengthHint];

type Items = Box<dyn Iterator<Item = Value> + Send>;

/// Iterator returned by `iter()` on the builtin containers.
///
/// Containers hand out an iterator over a snapshot of their items, so mutating the
/// container while iterating does not affect an iterator already in progress.
pub struct PyIterator {
    items: Mutex<Items>,
}

impl PyIterator {
    #[must_use]
    pub fn new(items: impl Iterator<Item = Value> + Send + 'static) -> Self {
        Self {
            items: Mutex::new(Box::new(items)),
        }
    }

    /// An iterator value over `items`.
    #[must_use]
    pub fn over(items: Vec<Value>) -> Value {
        Value::new(Self::new(items.into_iter()))
    }
}

impl PyTrait for PyIterator {
    fn py_type(&self) -> TypeRef {
        builtins().iterator.clone()
    }

    fn py_iter(&self, this: &Value) -> RunResult<Value> {
        Ok(this.clone())
    }

    fn py_next(&self) -> RunResult<Option<Value>> {
        Ok(self.items.lock().unwrap_or_else(PoisonError::into_inner).next())
    }

    fn py_length_hint(&self) -> RunResult<usize> {
        Ok(self.items.lock().unwrap_or_else(PoisonError::into_inner).size_hint().0)
    }
}
