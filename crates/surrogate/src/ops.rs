//! Builtin operations over [`Value`]s.
//!
//! These are the operator and builtin-function semantics (`repr()`, `a + b`, `a += b`,
//! `len()`, `getattr()`, `with`, ...) layered over the raw [`PyTrait`](crate::types::PyTrait) slots: reflected
//! operands, `NotImplemented` fallbacks, identity fallbacks for `==`, and checks on what
//! user-supplied slots return.

use std::cell::RefCell;

use ahash::AHashSet;

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Conversion, Dunder, UnaryOp},
    exception::{ExcType, Exception, RunResult},
    types::{PyType, r#type::types_from_value},
    value::Value,
};

thread_local! {
    /// Objects whose repr is currently being rendered on this thread.
    static REPR_ACTIVE: RefCell<AHashSet<usize>> = RefCell::new(AHashSet::new());
}

/// Renders a container repr, substituting `placeholder` when the container is already
/// being rendered further up the stack (`[[...]]` for a list that contains itself).
pub(crate) fn repr_guarded(
    id: usize,
    placeholder: &str,
    render: impl FnOnce() -> RunResult<String>,
) -> RunResult<String> {
    let entered = REPR_ACTIVE.with(|active| active.borrow_mut().insert(id));
    if !entered {
        return Ok(placeholder.to_owned());
    }
    let result = render();
    REPR_ACTIVE.with(|active| active.borrow_mut().remove(&id));
    result
}

// === identity and types ===

/// `type(x)` as a value.
#[must_use]
pub fn type_of(value: &Value) -> Value {
    Value::from_arc(value.py_type())
}

/// `isinstance(value, classinfo)`, where `classinfo` is a type or a tuple of types.
///
/// Like the builtin, this also consults `value.__class__`, so an object that reports a
/// different class through its attributes is an instance of that class too.
pub fn isinstance(value: &Value, classinfo: &Value) -> RunResult<bool> {
    let classes = types_from_value(classinfo)?;
    let own_type = value.py_type();
    if classes.iter().any(|cls| own_type.is_subclass_of(cls)) {
        return Ok(true);
    }
    let reported = getattr(value, "__class__")
        .ok()
        .and_then(|cls| cls.downcast_arc::<PyType>());
    Ok(match reported {
        Some(reported) if reported.uid() != own_type.uid() => {
            classes.iter().any(|cls| reported.is_subclass_of(cls))
        }
        _ => false,
    })
}

/// `issubclass(cls, classinfo)`.
pub fn issubclass(cls: &Value, classinfo: &Value) -> RunResult<bool> {
    let cls = cls
        .downcast_arc::<PyType>()
        .ok_or_else(|| ExcType::type_error("issubclass() arg 1 must be a class"))?;
    let classes = types_from_value(classinfo)?;
    Ok(classes.iter().any(|other| cls.is_subclass_of(other)))
}

// === textual forms ===

/// `repr(x)`.
pub fn repr(value: &Value) -> RunResult<String> {
    value.py_repr()
}

/// `str(x)`.
pub fn str(value: &Value) -> RunResult<String> {
    value.py_str()
}

/// `bytes(x)` through `__bytes__`.
pub fn bytes(value: &Value) -> RunResult<Vec<u8>> {
    value.py_bytes()
}

/// `format(x, spec)`.
pub fn format(value: &Value, spec: &str) -> RunResult<String> {
    value.py_format(spec)
}

// === comparison, hashing, truth ===

/// Rich comparison with reflection: the left operand first (or the right one when its
/// type is a subclass of the left's), then the other side with the swapped operator.
/// `==` and `!=` fall back to identity.
pub fn compare(left: &Value, op: CompareOp, right: &Value) -> RunResult<Value> {
    let left_type = left.py_type();
    let right_type = right.py_type();
    let right_first = left_type.uid() != right_type.uid() && right_type.is_subclass_of(&left_type);

    if right_first && let Some(result) = right.py_compare(op.swapped(), left)? {
        return Ok(result);
    }
    if let Some(result) = left.py_compare(op, right)? {
        return Ok(result);
    }
    if !right_first && let Some(result) = right.py_compare(op.swapped(), left)? {
        return Ok(result);
    }
    match op {
        CompareOp::Eq => Ok(Value::bool(left.is(right))),
        CompareOp::Ne => Ok(Value::bool(!left.is(right))),
        _ => Err(ExcType::type_error_unsupported_compare(
            op.symbol(),
            left_type.name(),
            right_type.name(),
        )),
    }
}

/// `a == b`, evaluated for truth.
pub fn eq(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, CompareOp::Eq, right)?)
}

/// `a != b`, evaluated for truth.
pub fn ne(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, CompareOp::Ne, right)?)
}

/// `a < b`, evaluated for truth.
pub fn lt(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, CompareOp::Lt, right)?)
}

/// Legacy three-way comparison: `-1`, `0` or `1`.
///
/// Uses `__cmp__` when the left operand has one, otherwise derives the answer from
/// `<` and `==`.
pub fn cmp(left: &Value, right: &Value) -> RunResult<i64> {
    if let Some(result) = left.py_cmp(right)? {
        return Ok(result.signum());
    }
    if let Some(result) = right.py_cmp(left)? {
        return Ok(-result.signum());
    }
    if eq(left, right)? {
        Ok(0)
    } else if lt(left, right)? {
        Ok(-1)
    } else {
        Ok(1)
    }
}

/// `hash(x)`.
pub fn hash(value: &Value) -> RunResult<i64> {
    value.py_hash()
}

/// `bool(x)`.
pub fn truthy(value: &Value) -> RunResult<bool> {
    value.py_bool()
}

// === attributes ===

/// `getattr(x, name)`.
pub fn getattr(value: &Value, name: &str) -> RunResult<Value> {
    value.py_getattr(value, name)
}

/// `hasattr(x, name)`: true unless the lookup raises an AttributeError.
pub fn hasattr(value: &Value, name: &str) -> RunResult<bool> {
    match getattr(value, name) {
        Ok(_) => Ok(true),
        Err(exc) if exc.is_instance_of(ExcType::AttributeError) => Ok(false),
        Err(exc) => Err(exc),
    }
}

/// `setattr(x, name, value)`.
pub fn setattr(target: &Value, name: &str, value: Value) -> RunResult<()> {
    target.py_setattr(name, value)
}

/// `delattr(x, name)`.
pub fn delattr(target: &Value, name: &str) -> RunResult<()> {
    target.py_delattr(name)
}

/// `dir(x)`, sorted.
pub fn dir(value: &Value) -> RunResult<Vec<String>> {
    let mut names = value.py_dir()?;
    names.sort_unstable();
    names.dedup();
    Ok(names)
}

/// `x.name(*args)`.
pub fn call_method(value: &Value, name: &str, args: ArgValues) -> RunResult<Value> {
    call(&getattr(value, name)?, args)
}

/// Attribute lookup through the type, for objects without per-instance attributes.
///
/// Descriptors found on the type (methods, properties, slot wrappers) are bound to
/// `this`; plain class attributes are returned as they are.
pub(crate) fn generic_getattr(this: &Value, name: &str) -> RunResult<Value> {
    let ty = this.py_type();
    if name == "__class__" {
        return Ok(Value::from_arc(ty));
    }
    if name == "__dict__"
        && let Some(store) = this.py_attr_store()
    {
        return Ok(store);
    }
    match ty.lookup(name) {
        Some(attr) if is_descriptor(&attr) => descr_get(&attr, Some(this), Some(&Value::from_arc(ty.clone()))),
        Some(attr) => Ok(attr),
        None => Err(ExcType::attribute_error(ty.name(), name)),
    }
}

/// The error for assigning to an attribute of an object that has no attribute store.
pub(crate) fn readonly_attribute_error(ty: &PyType, name: &str) -> Exception {
    if ty.has_attr(name) {
        Exception::new_msg(
            ExcType::AttributeError,
            format!("'{}' object attribute '{name}' is read-only", ty.name()),
        )
    } else {
        ExcType::attribute_error_no_setattr(ty.name(), name)
    }
}

// === descriptors ===

/// Whether `value`'s type defines `__get__`.
pub(crate) fn is_descriptor(value: &Value) -> bool {
    value.py_type().has_attr(Dunder::Get.as_str())
}

/// Whether `value`'s type defines `__set__` or `__delete__`.
pub(crate) fn is_data_descriptor(value: &Value) -> bool {
    let ty = value.py_type();
    ty.has_attr(Dunder::Set.as_str()) || ty.has_attr(Dunder::Delete.as_str())
}

/// `descr.__get__(instance, owner)`.
pub fn descr_get(descr: &Value, instance: Option<&Value>, owner: Option<&Value>) -> RunResult<Value> {
    descr.py_descr_get(instance, owner)
}

/// `descr.__set__(instance, value)`.
pub fn descr_set(descr: &Value, instance: &Value, value: Value) -> RunResult<()> {
    descr.py_descr_set(instance, value)
}

/// `descr.__delete__(instance)`.
pub fn descr_delete(descr: &Value, instance: &Value) -> RunResult<()> {
    descr.py_descr_delete(instance)
}

// === calls ===

/// `x(*args)`.
pub fn call(value: &Value, args: ArgValues) -> RunResult<Value> {
    value.py_call(args)
}

/// `callable(x)`: whether the type of `x` defines `__call__`.
#[must_use]
pub fn callable(value: &Value) -> bool {
    value.py_type().has_attr(Dunder::Call.as_str())
}

// === containers ===

/// `len(x)`.
pub fn len(value: &Value) -> RunResult<usize> {
    value.py_len()
}

/// `x.__length_hint__()`.
pub fn length_hint(value: &Value) -> RunResult<usize> {
    value.py_length_hint()
}

/// `x[key]`.
pub fn getitem(value: &Value, key: &Value) -> RunResult<Value> {
    value.py_getitem(key)
}

/// `x[key] = item`.
pub fn setitem(target: &Value, key: Value, item: Value) -> RunResult<()> {
    target.py_setitem(key, item)
}

/// `del x[key]`.
pub fn delitem(target: &Value, key: &Value) -> RunResult<()> {
    target.py_delitem(key)
}

/// `item in container`, scanning the container when it has no `__contains__`.
pub fn contains(container: &Value, item: &Value) -> RunResult<bool> {
    if let Some(found) = container.py_contains(item)? {
        return Ok(found);
    }
    for candidate in collect(container)? {
        if candidate.is(item) || eq(&candidate, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `iter(x)`.
pub fn iter(value: &Value) -> RunResult<Value> {
    value.py_iter(value)
}

/// `next(it)`, `None` once the iterator is exhausted.
pub fn next(iterator: &Value) -> RunResult<Option<Value>> {
    iterator.py_next()
}

/// `reversed(x)`.
pub fn reversed(value: &Value) -> RunResult<Value> {
    value.py_reversed()
}

/// Drains `iter(x)` into a vector.
pub fn collect(value: &Value) -> RunResult<Vec<Value>> {
    let iterator = iter(value)?;
    let mut items = Vec::new();
    while let Some(item) = next(&iterator)? {
        items.push(item);
    }
    Ok(items)
}

/// Drains `iter(x)` expecting strings.
pub(crate) fn collect_strings(value: &Value) -> RunResult<Vec<String>> {
    collect(value)?
        .into_iter()
        .map(|item| {
            item.as_str()
                .map(str::to_owned)
                .ok_or_else(|| ExcType::type_error(format!("expected str, got '{}'", item.type_name())))
        })
        .collect()
}

// === arithmetic ===

/// `left <op> right` with reflection.
pub fn binary(left: &Value, op: BinaryOp, right: &Value) -> RunResult<Value> {
    binary_or(left, op, right, op.symbol())
}

fn binary_or(left: &Value, op: BinaryOp, right: &Value, symbol: &str) -> RunResult<Value> {
    let left_type = left.py_type();
    let right_type = right.py_type();
    let right_first = left_type.uid() != right_type.uid() && right_type.is_subclass_of(&left_type);

    if right_first && let Some(result) = right.py_reflected(op, left)? {
        return Ok(result);
    }
    if let Some(result) = left.py_binary(op, right)? {
        return Ok(result);
    }
    if !right_first && let Some(result) = right.py_reflected(op, left)? {
        return Ok(result);
    }
    Err(ExcType::type_error_unsupported_binary(
        symbol,
        left_type.name(),
        right_type.name(),
    ))
}

/// `left + right`.
pub fn add(left: &Value, right: &Value) -> RunResult<Value> {
    binary(left, BinaryOp::Add, right)
}

/// `left - right`.
pub fn sub(left: &Value, right: &Value) -> RunResult<Value> {
    binary(left, BinaryOp::Sub, right)
}

/// `left * right`.
pub fn mul(left: &Value, right: &Value) -> RunResult<Value> {
    binary(left, BinaryOp::Mul, right)
}

/// `left <op>= right`.
///
/// Uses the in-place slot when the left operand has one and falls back to the plain
/// binary operator otherwise. The result is the new value for the assignment target;
/// for mutable objects it is `left` itself.
pub fn inplace(left: &Value, op: BinaryOp, right: &Value) -> RunResult<Value> {
    if let Some(result) = left.py_inplace(left, op, right)? {
        return Ok(result);
    }
    binary_or(left, op, right, op.inplace_symbol())
}

/// `-x`, `+x`, `abs(x)`, `~x`.
pub fn unary(op: UnaryOp, value: &Value) -> RunResult<Value> {
    value.py_unary(op)
}

/// Numeric conversion through the matching special method, checking the result type.
pub fn convert(value: &Value, conversion: Conversion) -> RunResult<Value> {
    let result = value.py_convert(conversion)?;
    let slot = conversion.dunder().as_str();
    let valid = match conversion {
        Conversion::Int | Conversion::Index | Conversion::Trunc | Conversion::Floor | Conversion::Ceil => {
            result.as_int().is_some()
        }
        Conversion::Float => result.as_float().is_some(),
        Conversion::Complex => result.py_type().uid() == crate::types::builtins().complex.uid(),
        Conversion::Oct | Conversion::Hex => result.as_str().is_some(),
    };
    if valid {
        Ok(result)
    } else {
        let expected = match conversion {
            Conversion::Float => "float",
            Conversion::Complex => "complex",
            Conversion::Oct | Conversion::Hex => "string",
            _ => "int",
        };
        Err(ExcType::type_error_bad_return(slot, expected, result.type_name()))
    }
}

/// `int(x)` through `__int__`.
pub fn int(value: &Value) -> RunResult<i64> {
    expect_int(&convert(value, Conversion::Int)?, "__int__")
}

/// `float(x)` through `__float__`.
pub fn float(value: &Value) -> RunResult<f64> {
    let result = convert(value, Conversion::Float)?;
    result
        .as_float()
        .ok_or_else(|| ExcType::type_error_bad_return("__float__", "float", result.type_name()))
}

/// `operator.index(x)`.
pub fn index(value: &Value) -> RunResult<i64> {
    expect_int(&convert(value, Conversion::Index)?, "__index__")
}

/// `round(x)` or `round(x, ndigits)`.
pub fn round(value: &Value, ndigits: Option<i64>) -> RunResult<Value> {
    value.py_round(ndigits)
}

/// Legacy `coerce(a, b)`.
pub fn coerce(left: &Value, right: &Value) -> RunResult<(Value, Value)> {
    if let Some(pair) = left.py_coerce(right)? {
        return Ok(pair);
    }
    if let Some((r, l)) = right.py_coerce(left)? {
        return Ok((l, r));
    }
    Err(ExcType::type_error("number coercion failed"))
}

/// The error for a conversion the type doesn't support.
pub(crate) fn conversion_error(conversion: Conversion, ty: &PyType) -> Exception {
    match conversion {
        Conversion::Index | Conversion::Oct | Conversion::Hex => ExcType::type_error_not_index(ty.name()),
        Conversion::Int | Conversion::Float | Conversion::Complex => {
            ExcType::type_error_conversion(conversion.builtin_name(), ty.name())
        }
        Conversion::Trunc | Conversion::Floor | Conversion::Ceil => ExcType::type_error(format!(
            "type {} doesn't define {} method",
            ty.name(),
            conversion.dunder()
        )),
    }
}

// === context managers ===

/// The three arguments of `__exit__`: all `None` on a clean exit, otherwise the
/// exception's type and value.
#[derive(Debug, Clone)]
pub struct ExitArgs {
    pub exc_type: Value,
    pub exc_value: Value,
    pub traceback: Value,
}

impl ExitArgs {
    /// Arguments for a block that finished without raising.
    #[must_use]
    pub fn none() -> Self {
        Self {
            exc_type: Value::none(),
            exc_value: Value::none(),
            traceback: Value::none(),
        }
    }

    /// Arguments for a block that raised `exc`.
    #[must_use]
    pub fn from_exception(exc: &Exception) -> Self {
        Self {
            exc_type: Value::from_arc(exc.exc_type().py_type()),
            exc_value: exc.to_value(),
            traceback: Value::none(),
        }
    }

    /// The exception being propagated, if any.
    #[must_use]
    pub fn exception(&self) -> Option<Exception> {
        Exception::from_value(&self.exc_value)
    }

    pub(crate) fn from_args(args: ArgValues) -> RunResult<Self> {
        let (exc_type, exc_value, traceback) = args.get_three_args("__exit__")?;
        Ok(Self {
            exc_type,
            exc_value,
            traceback,
        })
    }

    #[must_use]
    pub fn into_args(self) -> ArgValues {
        ArgValues::from_vec(vec![self.exc_type, self.exc_value, self.traceback])
    }
}

/// `manager.__enter__()`.
pub fn enter(manager: &Value) -> RunResult<Value> {
    manager.py_enter(manager)
}

/// `manager.__exit__(exc_type, exc_value, traceback)`.
pub fn exit(manager: &Value, args: &ExitArgs) -> RunResult<Value> {
    manager.py_exit(args)
}

/// Runs `body` inside `with manager as entered:`.
///
/// Returns `Ok(None)` when the body raised and `__exit__` suppressed the exception.
pub fn with_context<T>(manager: &Value, body: impl FnOnce(Value) -> RunResult<T>) -> RunResult<Option<T>> {
    let entered = enter(manager)?;
    match body(entered) {
        Ok(result) => {
            exit(manager, &ExitArgs::none())?;
            Ok(Some(result))
        }
        Err(exc) => {
            let suppress = truthy(&exit(manager, &ExitArgs::from_exception(&exc))?)?;
            if suppress { Ok(None) } else { Err(exc) }
        }
    }
}

// === slot results ===

pub(crate) fn expect_str(value: &Value, slot: &str) -> RunResult<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ExcType::type_error_bad_return(slot, "string", value.type_name()))
}

pub(crate) fn expect_bytes(value: &Value, slot: &str) -> RunResult<Vec<u8>> {
    value
        .as_bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| ExcType::type_error_bad_return(slot, "bytes", value.type_name()))
}

pub(crate) fn expect_int(value: &Value, slot: &str) -> RunResult<i64> {
    value
        .as_int()
        .ok_or_else(|| ExcType::type_error_bad_return(slot, "int", value.type_name()))
}

pub(crate) fn expect_bool(value: &Value, slot: &str) -> RunResult<bool> {
    value.as_bool().ok_or_else(|| {
        ExcType::type_error(format!(
            "{slot} should return bool, returned {}",
            value.type_name()
        ))
    })
}

pub(crate) fn expect_usize(value: &Value, slot: &str) -> RunResult<usize> {
    let count = expect_int(value, slot)?;
    usize::try_from(count).map_err(|_| ExcType::value_error(format!("{slot}() should return >= 0")))
}

pub(crate) fn expect_strings(value: &Value, slot: &str) -> RunResult<Vec<String>> {
    collect_strings(value).map_err(|_| ExcType::type_error_bad_return(slot, "iterable of str", value.type_name()))
}

/// Maps a `NotImplemented` result to `None`.
pub(crate) fn implemented(value: Value) -> Option<Value> {
    if value.is_not_implemented() { None } else { Some(value) }
}

/// Converts a length to an int value.
pub(crate) fn int_from_usize(count: usize) -> RunResult<Value> {
    i64::try_from(count)
        .map(Value::int)
        .map_err(|_| ExcType::overflow_error("length does not fit in an int"))
}

/// Invokes one slot of `value` directly, as its slot wrapper does when called.
///
/// Unlike the operator functions above there is no reflection or fallback: a declining
/// binary or comparison slot returns `NotImplemented`.
pub(crate) fn call_slot(value: &Value, dunder: Dunder, args: ArgValues) -> RunResult<Value> {
    let name = dunder.as_str();
    if let Some(op) = dunder.binary() {
        let other = args.get_one_arg(name)?;
        return Ok(value.py_binary(op, &other)?.unwrap_or_else(Value::not_implemented));
    }
    if let Some(op) = dunder.reflected() {
        let other = args.get_one_arg(name)?;
        return Ok(value.py_reflected(op, &other)?.unwrap_or_else(Value::not_implemented));
    }
    if let Some(op) = dunder.inplace() {
        let other = args.get_one_arg(name)?;
        return Ok(value.py_inplace(value, op, &other)?.unwrap_or_else(Value::not_implemented));
    }
    if let Some(op) = dunder.compare() {
        let other = args.get_one_arg(name)?;
        return Ok(value.py_compare(op, &other)?.unwrap_or_else(Value::not_implemented));
    }
    if let Some(op) = dunder.unary() {
        args.check_zero_args(name)?;
        return value.py_unary(op);
    }
    if let Some(conversion) = dunder.conversion() {
        args.check_zero_args(name)?;
        return value.py_convert(conversion);
    }
    match dunder {
        Dunder::Repr => {
            args.check_zero_args(name)?;
            Ok(Value::str(value.py_repr()?))
        }
        Dunder::Str => {
            args.check_zero_args(name)?;
            Ok(Value::str(value.py_str()?))
        }
        Dunder::Bytes => {
            args.check_zero_args(name)?;
            Ok(Value::bytes(value.py_bytes()?))
        }
        Dunder::Format => {
            let spec = args.get_one_arg(name)?;
            Ok(Value::str(value.py_format(&expect_str(&spec, name)?)?))
        }
        Dunder::Cmp => {
            let other = args.get_one_arg(name)?;
            Ok(value.py_cmp(&other)?.map_or_else(Value::not_implemented, Value::int))
        }
        Dunder::Hash => {
            args.check_zero_args(name)?;
            Ok(Value::int(value.py_hash()?))
        }
        Dunder::Bool | Dunder::Nonzero => {
            args.check_zero_args(name)?;
            Ok(Value::bool(value.py_bool()?))
        }
        Dunder::Getattribute | Dunder::Getattr => {
            let attr = args.get_one_arg(name)?;
            value.py_getattr(value, &expect_str(&attr, name)?)
        }
        Dunder::Setattr => {
            let (attr, item) = args.get_two_args(name)?;
            value.py_setattr(&expect_str(&attr, name)?, item)?;
            Ok(Value::none())
        }
        Dunder::Delattr => {
            let attr = args.get_one_arg(name)?;
            value.py_delattr(&expect_str(&attr, name)?)?;
            Ok(Value::none())
        }
        Dunder::Dir => {
            args.check_zero_args(name)?;
            Ok(Value::list(value.py_dir()?.into_iter().map(Value::str).collect()))
        }
        Dunder::Get => {
            let (instance, owner) = args.get_one_two_args(name)?;
            let instance = (!instance.is_none()).then_some(&instance);
            value.py_descr_get(instance, owner.as_ref())
        }
        Dunder::Set => {
            let (instance, item) = args.get_two_args(name)?;
            value.py_descr_set(&instance, item)?;
            Ok(Value::none())
        }
        Dunder::Delete => {
            let instance = args.get_one_arg(name)?;
            value.py_descr_delete(&instance)?;
            Ok(Value::none())
        }
        Dunder::Call => value.py_call(args),
        Dunder::Len => {
            args.check_zero_args(name)?;
            int_from_usize(value.py_len()?)
        }
        Dunder::LengthHint => {
            args.check_zero_args(name)?;
            int_from_usize(value.py_length_hint()?)
        }
        Dunder::Getitem => value.py_getitem(&args.get_one_arg(name)?),
        Dunder::Setitem => {
            let (key, item) = args.get_two_args(name)?;
            value.py_setitem(key, item)?;
            Ok(Value::none())
        }
        Dunder::Delitem => {
            value.py_delitem(&args.get_one_arg(name)?)?;
            Ok(Value::none())
        }
        Dunder::Contains => {
            let item = args.get_one_arg(name)?;
            Ok(Value::bool(contains(value, &item)?))
        }
        Dunder::Iter => {
            args.check_zero_args(name)?;
            value.py_iter(value)
        }
        Dunder::Next => {
            args.check_zero_args(name)?;
            value.py_next()?.ok_or_else(ExcType::stop_iteration)
        }
        Dunder::Reversed => {
            args.check_zero_args(name)?;
            value.py_reversed()
        }
        Dunder::Round => {
            let ndigits = match args.get_zero_one_arg(name)? {
                Some(n) if !n.is_none() => Some(index(&n)?),
                _ => None,
            };
            value.py_round(ndigits)
        }
        Dunder::Coerce => {
            let other = args.get_one_arg(name)?;
            Ok(value
                .py_coerce(&other)?
                .map_or_else(Value::not_implemented, |(a, b)| Value::tuple([a, b])))
        }
        Dunder::Enter => {
            args.check_zero_args(name)?;
            value.py_enter(value)
        }
        Dunder::Exit => value.py_exit(&ExitArgs::from_args(args)?),
        // the operator families are handled above
        _ => Err(ExcType::attribute_error(value.type_name(), name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_falls_back_to_identity() {
        let obj = call(&Value::from_arc(crate::types::builtins().object.clone()), ArgValues::Empty).unwrap();
        assert!(eq(&obj, &obj).unwrap());
        let other = call(&Value::from_arc(crate::types::builtins().object.clone()), ArgValues::Empty).unwrap();
        assert!(!eq(&obj, &other).unwrap());
        assert!(ne(&obj, &other).unwrap());
    }

    #[test]
    fn ordering_unsupported_between_unrelated_types() {
        let err = lt(&Value::int(1), &Value::str("a")).unwrap_err();
        assert_eq!(err.arg(), Some("'<' not supported between instances of 'int' and 'str'"));
    }

    #[test]
    fn inplace_falls_back_to_binary() {
        let a = Value::int(5);
        let b = inplace(&a, BinaryOp::Add, &Value::int(2)).unwrap();
        assert_eq!(b.as_int(), Some(7));
        assert!(!a.is(&b));
        let err = inplace(&a, BinaryOp::Add, &Value::str("x")).unwrap_err();
        assert_eq!(err.arg(), Some("unsupported operand type(s) for +=: 'int' and 'str'"));
    }

    #[test]
    fn hasattr_only_swallows_attribute_errors() {
        assert!(hasattr(&Value::int(1), "__add__").unwrap());
        assert!(!hasattr(&Value::int(1), "__iadd__").unwrap());
        assert!(!hasattr(&Value::int(1), "nope").unwrap());
    }

    #[test]
    fn context_manager_suppression() {
        // a plain int is not a context manager
        let err = with_context(&Value::int(1), |_| Ok(())).unwrap_err();
        assert!(err.is_instance_of(ExcType::AttributeError));
    }
}
