use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    args::ArgValues,
    format::FormatError,
    ops,
    types::{PyTrait, TypeRef, builtins},
    value::Value,
};

/// Result type alias for operations that can raise an exception.
pub type RunResult<T> = Result<T, Exception>;

/// Exception types raised by the object model and the proxy layers.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter, Serialize, Deserialize,
)]
pub enum ExcType {
    /// Root of the hierarchy.
    BaseException,
    /// Primary exception class - matches any non-exit exception in isinstance checks.
    Exception,

    // --- ArithmeticError hierarchy ---
    ArithmeticError,
    OverflowError,
    ZeroDivisionError,

    // --- LookupError hierarchy ---
    LookupError,
    IndexError,
    KeyError,
    /// Subclass of KeyError raised when a masked key is accessed through a masking dict.
    MaskedKeyError,

    // --- AttributeError hierarchy ---
    AttributeError,
    /// Subclass of AttributeError raised when a masked attribute is accessed through a masking proxy.
    MaskedAttributeError,

    // --- TypeError hierarchy ---
    TypeError,
    /// Subclass of TypeError raised when something other than a type is handed to a
    /// specialization's bound-type lookup.
    InvalidWrappedType,

    ValueError,

    // --- RuntimeError hierarchy ---
    RuntimeError,
    NotImplementedError,

    // --- Standalone exception types ---
    StopIteration,
    AssertionError,
    MemoryError,
    OSError,
}

impl ExcType {
    /// Returns the direct parent of this exception type, `None` for `BaseException`.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::BaseException => None,
            Self::Exception => Some(Self::BaseException),
            Self::OverflowError | Self::ZeroDivisionError => Some(Self::ArithmeticError),
            Self::IndexError | Self::KeyError => Some(Self::LookupError),
            Self::MaskedKeyError => Some(Self::KeyError),
            Self::MaskedAttributeError => Some(Self::AttributeError),
            Self::InvalidWrappedType => Some(Self::TypeError),
            Self::NotImplementedError => Some(Self::RuntimeError),
            Self::ArithmeticError
            | Self::LookupError
            | Self::AttributeError
            | Self::TypeError
            | Self::ValueError
            | Self::RuntimeError
            | Self::StopIteration
            | Self::AssertionError
            | Self::MemoryError
            | Self::OSError => Some(Self::Exception),
        }
    }

    /// Checks if this exception type is the same as, or a subclass of, `handler_type`.
    ///
    /// Walks the parent chain, so `MaskedKeyError` matches `KeyError`, `LookupError`,
    /// `Exception` and `BaseException`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        let mut current = Some(self);
        while let Some(exc_type) = current {
            if exc_type == handler_type {
                return true;
            }
            current = exc_type.parent();
        }
        false
    }

    /// Returns the type object for this exception type.
    #[must_use]
    pub fn py_type(self) -> TypeRef {
        builtins().exception(self)
    }

    /// Creates an AttributeError for when an attribute is not found.
    #[must_use]
    pub(crate) fn attribute_error(type_name: impl Display, attr: &str) -> Exception {
        Exception::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
    }

    /// Creates an AttributeError for a missing attribute on a type object.
    #[must_use]
    pub(crate) fn attribute_error_type(type_name: impl Display, attr: &str) -> Exception {
        Exception::new_msg(
            Self::AttributeError,
            format!("type object '{type_name}' has no attribute '{attr}'"),
        )
    }

    /// Creates an AttributeError for attribute assignment on objects that have no attribute store.
    ///
    /// Matches CPython's format for setting attributes on built-in types.
    #[must_use]
    pub(crate) fn attribute_error_no_setattr(type_name: impl Display, attr: &str) -> Exception {
        Exception::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}' and no __dict__ for setting new attributes"),
        )
    }

    /// Creates an AttributeError for a property without a setter.
    #[must_use]
    pub(crate) fn attribute_error_read_only(type_name: impl Display, attr: &str) -> Exception {
        Exception::new_msg(
            Self::AttributeError,
            format!("property '{attr}' of '{type_name}' object has no setter"),
        )
    }

    /// Creates a MaskedAttributeError naming the masked attribute.
    #[must_use]
    pub(crate) fn masked_attribute(name: &str) -> Exception {
        Exception::new_msg(Self::MaskedAttributeError, name)
    }

    /// Creates a MaskedKeyError carrying the repr of the masked key.
    #[must_use]
    pub(crate) fn masked_key(key_repr: impl Display) -> Exception {
        Exception::new_msg(Self::MaskedKeyError, key_repr)
    }

    /// Creates a KeyError carrying the repr of the missing key.
    #[must_use]
    pub(crate) fn key_error(key_repr: impl Display) -> Exception {
        Exception::new_msg(Self::KeyError, key_repr)
    }

    /// Creates a TypeError with a custom message.
    #[must_use]
    pub(crate) fn type_error(msg: impl Display) -> Exception {
        Exception::new_msg(Self::TypeError, msg)
    }

    /// Creates a ValueError with a custom message.
    #[must_use]
    pub(crate) fn value_error(msg: impl Display) -> Exception {
        Exception::new_msg(Self::ValueError, msg)
    }

    /// Creates a TypeError for subscripting objects that aren't subscriptable.
    #[must_use]
    pub(crate) fn type_error_not_sub(type_name: impl Display) -> Exception {
        Self::type_error(format!("'{type_name}' object is not subscriptable"))
    }

    /// Creates a TypeError for item assignment on objects that don't support it.
    #[must_use]
    pub(crate) fn type_error_not_sub_assignment(type_name: impl Display) -> Exception {
        Self::type_error(format!("'{type_name}' object does not support item assignment"))
    }

    /// Creates a TypeError for item deletion on objects that don't support it.
    #[must_use]
    pub(crate) fn type_error_not_sub_deletion(type_name: impl Display) -> Exception {
        Self::type_error(format!("'{type_name}' object doesn't support item deletion"))
    }

    /// Creates a TypeError for hashing unhashable objects.
    #[must_use]
    pub(crate) fn type_error_unhashable(type_name: impl Display) -> Exception {
        Self::type_error(format!("unhashable type: '{type_name}'"))
    }

    #[must_use]
    pub(crate) fn type_error_not_callable(type_name: impl Display) -> Exception {
        Self::type_error(format!("'{type_name}' object is not callable"))
    }

    #[must_use]
    pub(crate) fn type_error_not_iterable(type_name: impl Display) -> Exception {
        Self::type_error(format!("'{type_name}' object is not iterable"))
    }

    #[must_use]
    pub(crate) fn type_error_not_iterator(type_name: impl Display) -> Exception {
        Self::type_error(format!("'{type_name}' object is not an iterator"))
    }

    #[must_use]
    pub(crate) fn type_error_no_len(type_name: impl Display) -> Exception {
        Self::type_error(format!("object of type '{type_name}' has no len()"))
    }

    /// Creates a TypeError for a binary operator with no implementation on either side.
    ///
    /// Matches CPython's `unsupported operand type(s) for +: 'int' and 'str'`.
    #[must_use]
    pub(crate) fn type_error_unsupported_binary(symbol: &str, left: impl Display, right: impl Display) -> Exception {
        Self::type_error(format!(
            "unsupported operand type(s) for {symbol}: '{left}' and '{right}'"
        ))
    }

    #[must_use]
    pub(crate) fn type_error_unsupported_unary(symbol: &str, type_name: impl Display) -> Exception {
        Self::type_error(format!("bad operand type for {symbol}: '{type_name}'"))
    }

    /// Creates a TypeError for an ordering comparison neither side supports.
    #[must_use]
    pub(crate) fn type_error_unsupported_compare(symbol: &str, left: impl Display, right: impl Display) -> Exception {
        Self::type_error(format!(
            "'{symbol}' not supported between instances of '{left}' and '{right}'"
        ))
    }

    /// Creates a TypeError for a slot method that returned the wrong kind of value.
    #[must_use]
    pub(crate) fn type_error_bad_return(slot: &str, expected: &str, got: impl Display) -> Exception {
        Self::type_error(format!("{slot} returned non-{expected} (type {got})"))
    }

    /// Creates a TypeError for an incorrect number of positional arguments.
    ///
    /// # Arguments
    /// * `name` - The callable name (e.g., "len" for builtins, "list.append" for methods)
    /// * `expected` - Number of expected arguments
    /// * `actual` - Number of arguments actually provided
    #[must_use]
    pub(crate) fn type_error_arg_count(name: &str, expected: usize, actual: usize) -> Exception {
        if expected == 1 {
            // CPython: "len() takes exactly one argument (2 given)"
            Self::type_error(format!("{name}() takes exactly one argument ({actual} given)"))
        } else {
            // CPython: "insert expected 2 arguments, got 1"
            Self::type_error(format!("{name} expected {expected} arguments, got {actual}"))
        }
    }

    /// Creates a TypeError for when a callable that takes no arguments receives some.
    #[must_use]
    pub(crate) fn type_error_no_args(name: &str, actual: usize) -> Exception {
        Self::type_error(format!("{name}() takes no arguments ({actual} given)"))
    }

    #[must_use]
    pub(crate) fn type_error_at_most(name: &str, max: usize, actual: usize) -> Exception {
        Self::type_error(format!("{name} expected at most {max} arguments, got {actual}"))
    }

    #[must_use]
    pub(crate) fn type_error_no_kwargs(name: &str) -> Exception {
        Self::type_error(format!("{name}() takes no keyword arguments"))
    }

    /// Creates a TypeError for a type that cannot be converted with `conversion`.
    #[must_use]
    pub(crate) fn type_error_conversion(conversion: &str, type_name: impl Display) -> Exception {
        Self::type_error(format!("{conversion}() argument must be a number, not '{type_name}'"))
    }

    /// Creates a TypeError for using a non-integer where an index is required.
    #[must_use]
    pub(crate) fn type_error_not_index(type_name: impl Display) -> Exception {
        Self::type_error(format!("'{type_name}' object cannot be interpreted as an integer"))
    }

    /// Creates a TypeError for a helper that needs a proxy but got a plain object.
    #[must_use]
    pub(crate) fn type_error_not_a_proxy(func: &str, type_name: impl Display) -> Exception {
        Self::type_error(format!("{func}() expects a proxy, got '{type_name}' object"))
    }

    /// Creates an InvalidWrappedType error for a non-type handed to a bound-type lookup.
    #[must_use]
    pub(crate) fn invalid_wrapped_type(type_name: impl Display) -> Exception {
        Exception::new_msg(
            Self::InvalidWrappedType,
            format!("expected a type to specialize for, got '{type_name}' object"),
        )
    }

    #[must_use]
    pub(crate) fn overflow_error(msg: impl Display) -> Exception {
        Exception::new_msg(Self::OverflowError, msg)
    }

    #[must_use]
    pub(crate) fn memory_error(msg: impl Display) -> Exception {
        Exception::new_msg(Self::MemoryError, msg)
    }

    #[must_use]
    pub(crate) fn zero_division(msg: impl Display) -> Exception {
        Exception::new_msg(Self::ZeroDivisionError, msg)
    }

    #[must_use]
    pub(crate) fn index_error(type_name: &str) -> Exception {
        Exception::new_msg(Self::IndexError, format!("{type_name} index out of range"))
    }

    #[must_use]
    pub(crate) fn stop_iteration() -> Exception {
        Exception::new(Self::StopIteration, None)
    }

    #[must_use]
    pub(crate) fn runtime_error(msg: impl Display) -> Exception {
        Exception::new_msg(Self::RuntimeError, msg)
    }
}

/// A raised exception: its type, an optional message and an optional payload value.
///
/// Exceptions travel through `RunResult` as Rust errors; [`Exception::to_value`] turns one
/// into an object-model value when it has to be handed to Python-style code such as a
/// context manager's `__exit__`.
#[derive(Debug, Clone)]
pub struct Exception {
    exc_type: ExcType,
    arg: Option<String>,
    payload: Option<Value>,
}

impl Exception {
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<String>) -> Self {
        Self {
            exc_type,
            arg,
            payload: None,
        }
    }

    /// Creates an exception with a message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, msg: impl Display) -> Self {
        Self::new(exc_type, Some(msg.to_string()))
    }

    /// Attaches a payload value, e.g. the value carried by `StopIteration`.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Whether this exception would be caught by a handler for `handler_type`.
    #[must_use]
    pub fn is_instance_of(&self, handler_type: ExcType) -> bool {
        self.exc_type.is_subclass_of(handler_type)
    }

    /// Wraps a copy of this exception as an object-model value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::new(self.clone())
    }

    /// Recovers an exception from a value produced by [`Exception::to_value`].
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.downcast_ref::<Self>().cloned()
    }
}

impl Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}: {arg}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

impl std::error::Error for Exception {}

impl PartialEq for Exception {
    fn eq(&self, other: &Self) -> bool {
        self.exc_type == other.exc_type
            && self.arg == other.arg
            && match (&self.payload, &other.payload) {
                (None, None) => true,
                (Some(a), Some(b)) => a.is(b),
                _ => false,
            }
    }
}

impl From<FormatError> for Exception {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Overflow(msg) => ExcType::overflow_error(msg),
            FormatError::InvalidAlignment(msg) | FormatError::ValueError(msg) => ExcType::value_error(msg),
        }
    }
}

impl PyTrait for Exception {
    fn py_type(&self) -> TypeRef {
        self.exc_type.py_type()
    }

    fn py_repr(&self) -> RunResult<String> {
        match &self.arg {
            Some(arg) => Ok(format!("{}({})", self.exc_type, ops::repr(&Value::str(arg.as_str()))?)),
            None => Ok(format!("{}()", self.exc_type)),
        }
    }

    fn py_str(&self) -> RunResult<String> {
        Ok(self.arg.clone().unwrap_or_default())
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match name {
            "args" => Ok(Value::tuple(self.arg.iter().map(|arg| Value::str(arg.as_str())))),
            "value" if self.exc_type == ExcType::StopIteration => {
                Ok(self.payload.clone().unwrap_or_else(Value::none))
            }
            _ => ops::generic_getattr(this, name),
        }
    }
}

/// Builds an exception instance when an exception type is called.
pub(crate) fn construct(exc_type: ExcType, args: ArgValues) -> RunResult<Value> {
    let name: &'static str = exc_type.into();
    let arg = match args.get_zero_one_arg(name)? {
        None => None,
        Some(value) => Some(ops::str(&value)?),
    };
    Ok(Exception::new(exc_type, arg).to_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_types_sit_under_their_parents() {
        assert!(ExcType::MaskedKeyError.is_subclass_of(ExcType::KeyError));
        assert!(ExcType::MaskedKeyError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::MaskedAttributeError.is_subclass_of(ExcType::AttributeError));
        assert!(ExcType::InvalidWrappedType.is_subclass_of(ExcType::TypeError));
        assert!(!ExcType::KeyError.is_subclass_of(ExcType::MaskedKeyError));
        assert!(!ExcType::AttributeError.is_subclass_of(ExcType::KeyError));
    }

    #[test]
    fn everything_is_a_base_exception() {
        use strum::IntoEnumIterator;
        for exc_type in ExcType::iter() {
            assert!(exc_type.is_subclass_of(ExcType::BaseException), "{exc_type}");
        }
    }

    #[test]
    fn display_includes_message() {
        let exc = ExcType::attribute_error("int", "foo");
        assert_eq!(exc.to_string(), "AttributeError: 'int' object has no attribute 'foo'");
        assert_eq!(ExcType::stop_iteration().to_string(), "StopIteration");
    }

    #[test]
    fn stop_iteration_carries_its_value() {
        let exc = ExcType::stop_iteration().with_payload(Value::int(3));
        let value = ops::getattr(&exc.to_value(), "value").unwrap();
        assert_eq!(value.as_int(), Some(3));
        assert_ne!(exc, ExcType::stop_iteration());
        assert_eq!(exc.payload().and_then(Value::as_int), Some(3));
    }
}
