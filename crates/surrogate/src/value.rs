use std::{
    fmt,
    ops::Deref,
    sync::{Arc, LazyLock},
};

use crate::{
    exception::RunResult,
    ops,
    types::{Bool, Bytes, Complex, Dict, Float, Int, List, NoneType, NotImplementedType, PyTrait, Str, Tuple, TypeRef},
};

static NONE: LazyLock<Value> = LazyLock::new(|| Value::new(NoneType));
static NOT_IMPLEMENTED: LazyLock<Value> = LazyLock::new(|| Value::new(NotImplementedType));
static TRUE: LazyLock<Value> = LazyLock::new(|| Value::new(Bool(true)));
static FALSE: LazyLock<Value> = LazyLock::new(|| Value::new(Bool(false)));

/// A shared handle to any object in the model.
///
/// Cloning a `Value` clones the handle, never the object: two clones are the *same*
/// object for [`Value::is`]. Everything the object can do goes through its [`PyTrait`]
/// slots, usually via the builtins in [`crate::ops`].
#[derive(Clone)]
pub struct Value(Arc<dyn PyTrait>);

impl Value {
    /// Wraps a new object.
    #[must_use]
    pub fn new<T: PyTrait>(object: T) -> Self {
        Self(Arc::new(object))
    }

    #[must_use]
    pub fn from_arc(object: Arc<dyn PyTrait>) -> Self {
        Self(object)
    }

    /// The `None` singleton.
    #[must_use]
    pub fn none() -> Self {
        NONE.clone()
    }

    /// The `NotImplemented` singleton, returned by binary slots that decline an operand.
    #[must_use]
    pub fn not_implemented() -> Self {
        NOT_IMPLEMENTED.clone()
    }

    /// One of the two bool singletons.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        if value { TRUE.clone() } else { FALSE.clone() }
    }

    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::new(Int(value))
    }

    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::new(Float(value))
    }

    #[must_use]
    pub fn complex(real: f64, imag: f64) -> Self {
        Self::new(Complex { real, imag })
    }

    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::new(Str::new(value.into()))
    }

    #[must_use]
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::new(Bytes::new(value.into()))
    }

    #[must_use]
    pub fn list(items: Vec<Self>) -> Self {
        Self::new(List::new(items))
    }

    #[must_use]
    pub fn tuple(items: impl IntoIterator<Item = Self>) -> Self {
        Self::new(Tuple::new(items.into_iter().collect()))
    }

    /// Builds a dict, hashing every key.
    pub fn dict(pairs: impl IntoIterator<Item = (Self, Self)>) -> RunResult<Self> {
        let dict = Dict::default();
        for (key, value) in pairs {
            dict.set(key, value)?;
        }
        Ok(Self::new(dict))
    }

    /// Builds a dict with string keys, which always hash.
    #[must_use]
    pub fn str_dict<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Self)>) -> Self {
        let dict = Dict::default();
        for (key, value) in pairs {
            dict.set_str(&key.into(), value);
        }
        Self::new(dict)
    }

    /// Identity comparison, the `is` operator.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Address of the object, stable for its lifetime. Used by `id()` and identity hashing.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Borrows the object as a concrete type.
    #[must_use]
    pub fn downcast_ref<T: PyTrait>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }

    /// Gets a shared handle to the object as a concrete type.
    #[must_use]
    pub fn downcast_arc<T: PyTrait>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).into_any_arc().downcast().ok()
    }

    /// The object's type, `type(x)`.
    #[must_use]
    pub fn py_type(&self) -> TypeRef {
        self.0.py_type()
    }

    /// The name of the object's type.
    #[must_use]
    pub fn type_name(&self) -> String {
        self.0.py_type().name().to_owned()
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.is(&NONE)
    }

    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        self.is(&NOT_IMPLEMENTED)
    }

    /// The integer value of an `int` or `bool`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let Some(Int(value)) = self.downcast_ref() {
            Some(*value)
        } else if let Some(Bool(value)) = self.downcast_ref() {
            Some(i64::from(*value))
        } else {
            None
        }
    }

    /// The value of a `float`.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        self.downcast_ref::<Float>().map(|float| float.0)
    }

    /// The contents of a `str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.downcast_ref::<Str>().map(Str::as_str)
    }

    /// The contents of a `bytes`.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.downcast_ref::<Bytes>().map(Bytes::as_slice)
    }

    /// The value of a `bool` singleton.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.downcast_ref::<Bool>().map(|b| b.0)
    }
}

impl Deref for Value {
    type Target = dyn PyTrait;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Shows `repr(x)` when it succeeds, the default object form otherwise.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ops::repr(self) {
            Ok(repr) => f.write_str(&repr),
            Err(_) => write!(f, "<{} object at {:#x}>", self.type_name(), self.id()),
        }
    }
}

// Test-only: lets `assert_eq!` compare `Option<Value>` (e.g. against `None`).
// Uses object identity; non-test builds keep `Value` without `PartialEq`.
#[cfg(test)]
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::str(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::str(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::list(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_shared() {
        assert!(Value::none().is(&Value::none()));
        assert!(Value::bool(true).is(&Value::bool(true)));
        assert!(!Value::bool(true).is(&Value::bool(false)));
        assert!(Value::none().is_none());
    }

    #[test]
    fn clones_are_identical_and_fresh_values_are_not() {
        let a = Value::int(5);
        assert!(a.is(&a.clone()));
        assert!(!a.is(&Value::int(5)));
        assert!(ops::eq(&a, &Value::int(5)).unwrap());
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::bool(true).as_int(), Some(1));
        assert_eq!(Value::str("x").as_str(), Some("x"));
        assert_eq!(Value::float(1.5).as_float(), Some(1.5));
        assert_eq!(Value::int(1).as_str(), None);
    }
}
