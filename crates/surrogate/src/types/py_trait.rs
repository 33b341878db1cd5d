//! The slot trait every object in the model implements.
//!
//! Each `py_*` method is one special-method slot. Defaults describe an object that does
//! not support the operation: they raise the same error the corresponding builtin would,
//! or return `None` where the builtin has a fallback (binary operators, comparisons,
//! membership, in-place operators).
//!
//! Code outside the type implementations should go through [`crate::ops`], which applies
//! operator semantics (reflection, fallbacks, result checks) on top of these slots.

use std::{any::Any, sync::Arc};

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Conversion, UnaryOp},
    exception::{ExcType, RunResult},
    ops::{self, ExitArgs},
    py_hash,
    types::TypeRef,
    value::Value,
};

/// Upcasts to `Any` so values can be downcast to their concrete type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Address of an object, for identity hashing and default reprs.
pub(crate) fn address_of<T: ?Sized>(object: &T) -> usize {
    std::ptr::from_ref(object).cast::<()>() as usize
}

/// Special-method slots of an object.
///
/// Slots that need the handle they were reached through (to hand out bound methods or
/// to return the receiver itself) take it as `this`.
pub trait PyTrait: AsAny {
    /// `type(x)`.
    fn py_type(&self) -> TypeRef;

    /// `__repr__`
    fn py_repr(&self) -> RunResult<String> {
        Ok(format!("<{} object at {:#x}>", self.py_type().name(), address_of(self)))
    }

    /// `__str__`, falls back to the repr.
    fn py_str(&self) -> RunResult<String> {
        self.py_repr()
    }

    /// `__bytes__`
    fn py_bytes(&self) -> RunResult<Vec<u8>> {
        Err(ExcType::type_error(format!(
            "cannot convert '{}' object to bytes",
            self.py_type().name()
        )))
    }

    /// `__format__`, an empty spec formats as `str()`.
    fn py_format(&self, spec: &str) -> RunResult<String> {
        if spec.is_empty() {
            self.py_str()
        } else {
            Err(ExcType::type_error(format!(
                "unsupported format string passed to {}.__format__",
                self.py_type().name()
            )))
        }
    }

    /// Rich comparison. `None` means the object declines and the reflected side is tried.
    fn py_compare(&self, _op: CompareOp, _other: &Value) -> RunResult<Option<Value>> {
        Ok(None)
    }

    /// Legacy three-way comparison, `None` if unsupported.
    fn py_cmp(&self, _other: &Value) -> RunResult<Option<i64>> {
        Ok(None)
    }

    /// `__hash__`, identity-based unless the type has value semantics.
    fn py_hash(&self) -> RunResult<i64> {
        Ok(py_hash::hash_pointer(address_of(self)))
    }

    /// `__bool__`
    fn py_bool(&self) -> RunResult<bool> {
        Ok(true)
    }

    /// `__getattribute__`, with the class-level lookup as default.
    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        ops::generic_getattr(this, name)
    }

    /// `__setattr__`
    fn py_setattr(&self, name: &str, _value: Value) -> RunResult<()> {
        Err(ops::readonly_attribute_error(&self.py_type(), name))
    }

    /// `__delattr__`
    fn py_delattr(&self, name: &str) -> RunResult<()> {
        Err(ops::readonly_attribute_error(&self.py_type(), name))
    }

    /// `__dir__`
    fn py_dir(&self) -> RunResult<Vec<String>> {
        Ok(self.py_type().dir())
    }

    /// Per-instance attribute store exposed as `__dict__`, if the object has one.
    fn py_attr_store(&self) -> Option<Value> {
        None
    }

    /// `__get__`
    fn py_descr_get(&self, _instance: Option<&Value>, _owner: Option<&Value>) -> RunResult<Value> {
        Err(ExcType::attribute_error(self.py_type().name(), "__get__"))
    }

    /// `__set__`
    fn py_descr_set(&self, _instance: &Value, _value: Value) -> RunResult<()> {
        Err(ExcType::attribute_error(self.py_type().name(), "__set__"))
    }

    /// `__delete__`
    fn py_descr_delete(&self, _instance: &Value) -> RunResult<()> {
        Err(ExcType::attribute_error(self.py_type().name(), "__delete__"))
    }

    /// `__call__`
    fn py_call(&self, _args: ArgValues) -> RunResult<Value> {
        Err(ExcType::type_error_not_callable(self.py_type().name()))
    }

    /// `__len__`
    fn py_len(&self) -> RunResult<usize> {
        Err(ExcType::type_error_no_len(self.py_type().name()))
    }

    /// `__length_hint__`
    fn py_length_hint(&self) -> RunResult<usize> {
        Err(ExcType::attribute_error(self.py_type().name(), "__length_hint__"))
    }

    /// `__getitem__`
    fn py_getitem(&self, _key: &Value) -> RunResult<Value> {
        Err(ExcType::type_error_not_sub(self.py_type().name()))
    }

    /// `__setitem__`
    fn py_setitem(&self, _key: Value, _value: Value) -> RunResult<()> {
        Err(ExcType::type_error_not_sub_assignment(self.py_type().name()))
    }

    /// `__delitem__`
    fn py_delitem(&self, _key: &Value) -> RunResult<()> {
        Err(ExcType::type_error_not_sub_deletion(self.py_type().name()))
    }

    /// `__contains__`, `None` falls back to iteration.
    fn py_contains(&self, _item: &Value) -> RunResult<Option<bool>> {
        Ok(None)
    }

    /// `__iter__`
    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        Err(ExcType::type_error_not_iterable(self.py_type().name()))
    }

    /// `__next__`, `Ok(None)` once exhausted.
    fn py_next(&self) -> RunResult<Option<Value>> {
        Err(ExcType::type_error_not_iterator(self.py_type().name()))
    }

    /// `__reversed__`
    fn py_reversed(&self) -> RunResult<Value> {
        Err(ExcType::type_error(format!(
            "'{}' object is not reversible",
            self.py_type().name()
        )))
    }

    /// Forward binary operator (`__add__` and friends). `None` is `NotImplemented`.
    fn py_binary(&self, _op: BinaryOp, _other: &Value) -> RunResult<Option<Value>> {
        Ok(None)
    }

    /// Reflected binary operator (`__radd__` and friends). `None` is `NotImplemented`.
    fn py_reflected(&self, _op: BinaryOp, _other: &Value) -> RunResult<Option<Value>> {
        Ok(None)
    }

    /// In-place operator (`__iadd__` and friends). `None` falls back to the binary operator.
    fn py_inplace(&self, _this: &Value, _op: BinaryOp, _other: &Value) -> RunResult<Option<Value>> {
        Ok(None)
    }

    /// `__neg__`, `__pos__`, `__abs__`, `__invert__`.
    fn py_unary(&self, op: UnaryOp) -> RunResult<Value> {
        Err(ExcType::type_error_unsupported_unary(op.symbol(), self.py_type().name()))
    }

    /// Numeric conversions (`__int__`, `__index__`, `__hex__`, ...).
    fn py_convert(&self, conversion: Conversion) -> RunResult<Value> {
        Err(ops::conversion_error(conversion, &self.py_type()))
    }

    /// `__round__`
    fn py_round(&self, _ndigits: Option<i64>) -> RunResult<Value> {
        Err(ExcType::type_error(format!(
            "type {} doesn't define __round__ method",
            self.py_type().name()
        )))
    }

    /// Legacy `__coerce__`, `None` if the pair can't be coerced.
    fn py_coerce(&self, _other: &Value) -> RunResult<Option<(Value, Value)>> {
        Ok(None)
    }

    /// `__enter__`
    fn py_enter(&self, _this: &Value) -> RunResult<Value> {
        Err(ExcType::attribute_error(self.py_type().name(), "__enter__"))
    }

    /// `__exit__`
    fn py_exit(&self, _args: &ExitArgs) -> RunResult<Value> {
        Err(ExcType::attribute_error(self.py_type().name(), "__exit__"))
    }
}
