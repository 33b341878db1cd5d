//! The forwarding core.
//!
//! A [`Proxy`] stands in for a wrapped object. Each operator slot first looks for a
//! declaration of the matching special method on the proxy's specialization; without one
//! the operation is applied to the wrapped object and its result or error is returned
//! untouched. Attribute access by name is forwarded unless the name is direct.
//!
//! In-place operators are the one place the core adds behaviour: the wrapped object's
//! `x op= y` is evaluated, and if that produced a different object (an `int`, a `str`),
//! the result is a new proxy of the same specialization wrapping it. Mutable objects that
//! update in place keep their proxy.

pub mod specialization;
pub mod state;

use std::{
    str::FromStr,
    sync::{Arc, Weak},
};

use tracing::trace;

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Conversion, Dunder, UnaryOp},
    exception::{ExcType, Exception, RunResult},
    ops::{self, ExitArgs},
    types::{PyTrait, SlotMethod, TypeRef},
    value::Value,
};

pub use specialization::{
    BindHook, Declaration, DeclarationKind, DirectFn, GetterFn, Receiver, SetterFn, Specialization,
    SpecializationBuilder, base, make_specialization, mark_direct, unproxied,
};
pub use state::ProxyState;

use specialization::DirectMethod;

/// A proxy instance.
pub struct Proxy {
    me: Weak<Self>,
    spec: Arc<Specialization>,
    /// The derived type for (`spec`, type of `original`).
    bound: TypeRef,
    original: Value,
    state: Arc<ProxyState>,
}

impl Proxy {
    pub(crate) fn create(spec: Arc<Specialization>, bound: TypeRef, original: Value, state: Arc<ProxyState>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            spec,
            bound,
            original,
            state,
        })
    }

    /// The wrapped object.
    #[must_use]
    pub fn original(&self) -> &Value {
        &self.original
    }

    #[must_use]
    pub fn state(&self) -> &ProxyState {
        &self.state
    }

    /// The state as a value, for `getattr`/`setattr` use.
    #[must_use]
    pub fn state_value(&self) -> Value {
        Value::from_arc(self.state.clone())
    }

    #[must_use]
    pub fn specialization(&self) -> &Arc<Specialization> {
        &self.spec
    }

    fn value(&self) -> RunResult<Value> {
        self.me
            .upgrade()
            .map(|me| Value::from_arc(me))
            .ok_or_else(|| ExcType::runtime_error("proxy is being dropped"))
    }

    fn slot(&self, dunder: Dunder, args: ArgValues) -> RunResult<Value> {
        self.slot_on(&self.value()?, dunder, args)
    }

    /// Runs the declared body for `dunder`, or the forwarding behaviour.
    fn slot_on(&self, this: &Value, dunder: Dunder, args: ArgValues) -> RunResult<Value> {
        match self.spec.resolve_method(dunder.as_str()) {
            Some((owner, body)) => body(&Receiver::new(this, self, owner), args),
            None => self.forward(this, dunder, args),
        }
    }

    fn declares(&self, dunder: Dunder) -> bool {
        self.spec.resolve_method(dunder.as_str()).is_some()
    }

    /// The base proxy behaviour for `dunder`: apply it to the wrapped object.
    pub(crate) fn forward(&self, this: &Value, dunder: Dunder, args: ArgValues) -> RunResult<Value> {
        let original = &self.original;
        let name = dunder.as_str();
        trace!(op = name, wrapped = %original.type_name(), "forwarding");

        if let Some(op) = dunder.binary() {
            return ops::binary(original, op, &args.get_one_arg(name)?);
        }
        if let Some(op) = dunder.reflected() {
            return ops::binary(&args.get_one_arg(name)?, op, original);
        }
        if let Some(op) = dunder.inplace() {
            return self.base_inplace(this, op, &args.get_one_arg(name)?);
        }
        if let Some(op) = dunder.compare() {
            return ops::compare(original, op, &args.get_one_arg(name)?);
        }
        if let Some(op) = dunder.unary() {
            args.check_zero_args(name)?;
            return ops::unary(op, original);
        }
        if let Some(conversion) = dunder.conversion() {
            args.check_zero_args(name)?;
            return ops::convert(original, conversion);
        }
        match dunder {
            Dunder::Repr => {
                args.check_zero_args(name)?;
                ops::repr(original).map(Value::str)
            }
            Dunder::Str => {
                args.check_zero_args(name)?;
                ops::str(original).map(Value::str)
            }
            Dunder::Bytes => {
                args.check_zero_args(name)?;
                ops::bytes(original).map(Value::bytes)
            }
            Dunder::Format => {
                let spec = args.get_one_arg(name)?;
                ops::format(original, &ops::expect_str(&spec, name)?).map(Value::str)
            }
            Dunder::Cmp => ops::cmp(original, &args.get_one_arg(name)?).map(Value::int),
            Dunder::Hash => {
                args.check_zero_args(name)?;
                ops::hash(original).map(Value::int)
            }
            Dunder::Bool | Dunder::Nonzero => {
                args.check_zero_args(name)?;
                ops::truthy(original).map(Value::bool)
            }
            Dunder::Getattribute | Dunder::Getattr => {
                let attr = args.get_one_arg(name)?;
                self.base_getattr(this, &ops::expect_str(&attr, name)?)
            }
            Dunder::Setattr => {
                let (attr, value) = args.get_two_args(name)?;
                self.base_setattr(this, &ops::expect_str(&attr, name)?, value)?;
                Ok(Value::none())
            }
            Dunder::Delattr => {
                let attr = args.get_one_arg(name)?;
                self.base_delattr(&ops::expect_str(&attr, name)?)?;
                Ok(Value::none())
            }
            Dunder::Dir => {
                args.check_zero_args(name)?;
                Ok(Value::list(ops::dir(original)?.into_iter().map(Value::str).collect()))
            }
            Dunder::Get => {
                let (instance, owner) = args.get_one_two_args(name)?;
                let instance = (!instance.is_none()).then_some(&instance);
                let owner = owner.filter(|owner| !owner.is_none());
                ops::descr_get(original, instance, owner.as_ref())
            }
            Dunder::Set => {
                let (instance, value) = args.get_two_args(name)?;
                ops::descr_set(original, &instance, value)?;
                Ok(Value::none())
            }
            Dunder::Delete => {
                ops::descr_delete(original, &args.get_one_arg(name)?)?;
                Ok(Value::none())
            }
            Dunder::Call => ops::call(original, args),
            Dunder::Len => {
                args.check_zero_args(name)?;
                ops::int_from_usize(ops::len(original)?)
            }
            Dunder::LengthHint => {
                args.check_zero_args(name)?;
                ops::int_from_usize(ops::length_hint(original)?)
            }
            Dunder::Getitem => ops::getitem(original, &args.get_one_arg(name)?),
            Dunder::Setitem => {
                let (key, value) = args.get_two_args(name)?;
                ops::setitem(original, key, value)?;
                Ok(Value::none())
            }
            Dunder::Delitem => {
                ops::delitem(original, &args.get_one_arg(name)?)?;
                Ok(Value::none())
            }
            Dunder::Contains => ops::contains(original, &args.get_one_arg(name)?).map(Value::bool),
            Dunder::Iter => {
                args.check_zero_args(name)?;
                ops::iter(original)
            }
            Dunder::Next => {
                args.check_zero_args(name)?;
                ops::next(original)?.ok_or_else(ExcType::stop_iteration)
            }
            Dunder::Reversed => {
                args.check_zero_args(name)?;
                ops::reversed(original)
            }
            Dunder::Round => {
                let ndigits = match args.get_zero_one_arg(name)? {
                    Some(ndigits) if !ndigits.is_none() => Some(ops::index(&ndigits)?),
                    _ => None,
                };
                ops::round(original, ndigits)
            }
            Dunder::Coerce => {
                let (left, right) = ops::coerce(original, &args.get_one_arg(name)?)?;
                Ok(Value::tuple([left, right]))
            }
            Dunder::Enter => {
                args.check_zero_args(name)?;
                ops::enter(original)
            }
            Dunder::Exit => ops::exit(original, &ExitArgs::from_args(args)?),
            // the operator families are handled above
            _ => Err(ExcType::attribute_error(original.type_name(), name)),
        }
    }

    /// Attribute lookup without a declared `__getattribute__`.
    fn base_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        if self.spec.is_direct(name) {
            trace!(name, "attribute resolved on proxy");
            return self.local_getattr(this, name);
        }
        if let Ok(dunder) = Dunder::from_str(name)
            && dunder.is_inplace()
        {
            // the wrapped object decides whether the operator exists at all
            ops::getattr(&self.original, name)?;
            return Ok(Value::new(SlotMethod::new(dunder, this.clone())));
        }
        trace!(name, wrapped = %self.original.type_name(), "attribute forwarded");
        ops::getattr(&self.original, name)
    }

    fn base_setattr(&self, this: &Value, name: &str, value: Value) -> RunResult<()> {
        if self.spec.is_direct(name) {
            return self.local_setattr(this, name, value);
        }
        ops::setattr(&self.original, name, value)
    }

    fn base_delattr(&self, name: &str) -> RunResult<()> {
        if self.spec.is_direct(name) {
            return self.local_delattr(name);
        }
        ops::delattr(&self.original, name)
    }

    /// Reads a direct name. Values assigned through the proxy live in the state and
    /// shadow declared methods and defaults, but not properties.
    fn local_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        let Some((owner, declaration)) = self.spec.resolve(name) else {
            return self
                .state
                .get(name)
                .ok_or_else(|| ExcType::attribute_error(self.bound.name(), name));
        };
        match declaration.kind() {
            DeclarationKind::Property { getter, .. } => getter(&Receiver::new(this, self, owner)),
            DeclarationKind::Method(body) => Ok(self.state.get(name).unwrap_or_else(|| {
                Value::new(DirectMethod::new(name, body.clone(), owner.clone(), this.clone()))
            })),
            DeclarationKind::Attr(default) => Ok(self.state.get(name).unwrap_or_else(|| default.clone())),
        }
    }

    fn local_setattr(&self, this: &Value, name: &str, value: Value) -> RunResult<()> {
        match self.spec.resolve(name) {
            Some((owner, declaration)) => match declaration.kind() {
                DeclarationKind::Property {
                    setter: Some(setter), ..
                } => setter(&Receiver::new(this, self, owner), value),
                DeclarationKind::Property { setter: None, .. } => {
                    Err(ExcType::attribute_error_read_only(self.bound.name(), name))
                }
                _ => {
                    self.state.set(name, value);
                    Ok(())
                }
            },
            None => {
                self.state.set(name, value);
                Ok(())
            }
        }
    }

    fn local_delattr(&self, name: &str) -> RunResult<()> {
        if let Some((_, declaration)) = self.spec.resolve(name)
            && matches!(declaration.kind(), DeclarationKind::Property { .. })
        {
            return Err(Exception::new_msg(
                ExcType::AttributeError,
                format!("property '{name}' of '{}' object has no deleter", self.bound.name()),
            ));
        }
        self.state
            .remove(name)
            .map(drop)
            .ok_or_else(|| ExcType::attribute_error(self.bound.name(), name))
    }

    /// `proxy op= other`: keeps this proxy when the wrapped object updated in place,
    /// otherwise wraps the new value in a fresh proxy.
    fn base_inplace(&self, this: &Value, op: BinaryOp, other: &Value) -> RunResult<Value> {
        let candidate = ops::inplace(&self.original, op, other)?;
        if candidate.is(&self.original) {
            return Ok(this.clone());
        }
        trace!(
            op = op.inplace_symbol(),
            wrapped = %self.original.type_name(),
            result = %candidate.type_name(),
            "in-place operator rebinds proxy"
        );
        Ok(self.rebind(candidate))
    }

    /// A new proxy of the same specialization around `original`, with a copy of the state.
    fn rebind(&self, original: Value) -> Value {
        let bound = self.spec.bound_type_of(&original.py_type());
        let state = Arc::new(self.state.snapshot());
        Value::from_arc(Self::create(self.spec.clone(), bound, original, state))
    }
}

impl PyTrait for Proxy {
    fn py_type(&self) -> TypeRef {
        self.bound.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        ops::expect_str(&self.slot(Dunder::Repr, ArgValues::Empty)?, "__repr__")
    }

    fn py_str(&self) -> RunResult<String> {
        ops::expect_str(&self.slot(Dunder::Str, ArgValues::Empty)?, "__str__")
    }

    fn py_bytes(&self) -> RunResult<Vec<u8>> {
        ops::expect_bytes(&self.slot(Dunder::Bytes, ArgValues::Empty)?, "__bytes__")
    }

    fn py_format(&self, spec: &str) -> RunResult<String> {
        ops::expect_str(&self.slot(Dunder::Format, ArgValues::One(Value::str(spec)))?, "__format__")
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        self.slot(op.dunder(), ArgValues::One(other.clone()))
            .map(ops::implemented)
    }

    fn py_cmp(&self, other: &Value) -> RunResult<Option<i64>> {
        match ops::implemented(self.slot(Dunder::Cmp, ArgValues::One(other.clone()))?) {
            Some(result) => ops::expect_int(&result, "__cmp__").map(Some),
            None => Ok(None),
        }
    }

    fn py_hash(&self) -> RunResult<i64> {
        ops::expect_int(&self.slot(Dunder::Hash, ArgValues::Empty)?, "__hash__")
    }

    fn py_bool(&self) -> RunResult<bool> {
        // the legacy spelling counts as an override too
        let dunder = if !self.declares(Dunder::Bool) && self.declares(Dunder::Nonzero) {
            Dunder::Nonzero
        } else {
            Dunder::Bool
        };
        ops::expect_bool(&self.slot(dunder, ArgValues::Empty)?, dunder.as_str())
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match self.slot_on(this, Dunder::Getattribute, ArgValues::One(Value::str(name))) {
            Err(exc) if exc.is_instance_of(ExcType::AttributeError) && self.declares(Dunder::Getattr) => {
                self.slot_on(this, Dunder::Getattr, ArgValues::One(Value::str(name)))
            }
            result => result,
        }
    }

    fn py_setattr(&self, name: &str, value: Value) -> RunResult<()> {
        self.slot(Dunder::Setattr, ArgValues::Two(Value::str(name), value))
            .map(drop)
    }

    fn py_delattr(&self, name: &str) -> RunResult<()> {
        self.slot(Dunder::Delattr, ArgValues::One(Value::str(name)))
            .map(drop)
    }

    fn py_dir(&self) -> RunResult<Vec<String>> {
        ops::expect_strings(&self.slot(Dunder::Dir, ArgValues::Empty)?, "__dir__")
    }

    fn py_descr_get(&self, instance: Option<&Value>, owner: Option<&Value>) -> RunResult<Value> {
        let args = ArgValues::Two(
            instance.cloned().unwrap_or_else(Value::none),
            owner.cloned().unwrap_or_else(Value::none),
        );
        self.slot(Dunder::Get, args)
    }

    fn py_descr_set(&self, instance: &Value, value: Value) -> RunResult<()> {
        self.slot(Dunder::Set, ArgValues::Two(instance.clone(), value))
            .map(drop)
    }

    fn py_descr_delete(&self, instance: &Value) -> RunResult<()> {
        self.slot(Dunder::Delete, ArgValues::One(instance.clone()))
            .map(drop)
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        self.slot(Dunder::Call, args)
    }

    fn py_len(&self) -> RunResult<usize> {
        ops::expect_usize(&self.slot(Dunder::Len, ArgValues::Empty)?, "__len__")
    }

    fn py_length_hint(&self) -> RunResult<usize> {
        ops::expect_usize(&self.slot(Dunder::LengthHint, ArgValues::Empty)?, "__length_hint__")
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        self.slot(Dunder::Getitem, ArgValues::One(key.clone()))
    }

    fn py_setitem(&self, key: Value, value: Value) -> RunResult<()> {
        self.slot(Dunder::Setitem, ArgValues::Two(key, value)).map(drop)
    }

    fn py_delitem(&self, key: &Value) -> RunResult<()> {
        self.slot(Dunder::Delitem, ArgValues::One(key.clone())).map(drop)
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        ops::truthy(&self.slot(Dunder::Contains, ArgValues::One(item.clone()))?).map(Some)
    }

    fn py_iter(&self, this: &Value) -> RunResult<Value> {
        self.slot_on(this, Dunder::Iter, ArgValues::Empty)
    }

    fn py_next(&self) -> RunResult<Option<Value>> {
        match self.slot(Dunder::Next, ArgValues::Empty) {
            Ok(item) => Ok(Some(item)),
            Err(exc) if exc.exc_type() == ExcType::StopIteration => Ok(None),
            Err(exc) => Err(exc),
        }
    }

    fn py_reversed(&self) -> RunResult<Value> {
        self.slot(Dunder::Reversed, ArgValues::Empty)
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        self.slot(op.dunder(), ArgValues::One(other.clone()))
            .map(ops::implemented)
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        self.slot(op.reflected_dunder(), ArgValues::One(other.clone()))
            .map(ops::implemented)
    }

    fn py_inplace(&self, this: &Value, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        let Some(dunder) = op.inplace_dunder() else {
            return Ok(None);
        };
        self.slot_on(this, dunder, ArgValues::One(other.clone()))
            .map(ops::implemented)
    }

    fn py_unary(&self, op: UnaryOp) -> RunResult<Value> {
        self.slot(op.dunder(), ArgValues::Empty)
    }

    fn py_convert(&self, conversion: Conversion) -> RunResult<Value> {
        self.slot(conversion.dunder(), ArgValues::Empty)
    }

    fn py_round(&self, ndigits: Option<i64>) -> RunResult<Value> {
        let args = match ndigits {
            Some(ndigits) => ArgValues::One(Value::int(ndigits)),
            None => ArgValues::Empty,
        };
        self.slot(Dunder::Round, args)
    }

    fn py_coerce(&self, other: &Value) -> RunResult<Option<(Value, Value)>> {
        let Some(pair) = ops::implemented(self.slot(Dunder::Coerce, ArgValues::One(other.clone()))?) else {
            return Ok(None);
        };
        match <[Value; 2]>::try_from(ops::collect(&pair)?) {
            Ok([left, right]) => Ok(Some((left, right))),
            Err(_) => Err(ExcType::type_error("coercion should return None or 2-tuple")),
        }
    }

    fn py_enter(&self, this: &Value) -> RunResult<Value> {
        self.slot_on(this, Dunder::Enter, ArgValues::Empty)
    }

    fn py_exit(&self, args: &ExitArgs) -> RunResult<Value> {
        self.slot(Dunder::Exit, args.clone().into_args())
    }
}

/// Wraps `wrapped` in a plain forwarding proxy.
#[must_use]
pub fn proxy(wrapped: Value) -> Value {
    let spec = base();
    let bound = spec.bound_type_of(&wrapped.py_type());
    Value::from_arc(Proxy::create(spec.clone(), bound, wrapped, Arc::default()))
}

fn as_proxy<'a>(value: &'a Value, func: &str) -> RunResult<&'a Proxy> {
    value
        .downcast_ref::<Proxy>()
        .ok_or_else(|| ExcType::type_error_not_a_proxy(func, value.type_name()))
}

/// Whether `value` is a proxy of any specialization.
#[must_use]
pub fn is_proxy(value: &Value) -> bool {
    value.downcast_ref::<Proxy>().is_some()
}

/// The object behind a proxy.
pub fn get_original(value: &Value) -> RunResult<Value> {
    as_proxy(value, "get_original").map(|proxy| proxy.original.clone())
}

/// Older name of [`get_original`].
pub fn proxiee(value: &Value) -> RunResult<Value> {
    get_original(value)
}

/// The private state of a proxy.
pub fn get_state(value: &Value) -> RunResult<Value> {
    as_proxy(value, "get_state").map(Proxy::state_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_errors_are_untouched() {
        let direct = ops::getattr(&Value::int(1), "nope").unwrap_err();
        let proxied = ops::getattr(&proxy(Value::int(1)), "nope").unwrap_err();
        assert_eq!(direct.exc_type(), proxied.exc_type());
        assert_eq!(direct.arg(), proxied.arg());
    }

    #[test]
    fn inplace_names_probe_the_wrapped_object() {
        assert!(!ops::hasattr(&proxy(Value::int(1)), "__iadd__").unwrap());
        let list = proxy(Value::list(vec![Value::int(1)]));
        let iadd = ops::getattr(&list, "__iadd__").unwrap();
        let result = ops::call(&iadd, ArgValues::One(Value::list(vec![Value::int(2)]))).unwrap();
        assert!(result.is(&list));
        assert_eq!(ops::len(&list).unwrap(), 2);
    }

    #[test]
    fn helpers_reject_plain_values() {
        let err = get_original(&Value::int(1)).unwrap_err();
        assert_eq!(err.arg(), Some("get_original() expects a proxy, got 'int' object"));
        assert!(get_state(&Value::int(1)).is_err());
        assert!(proxiee(&proxy(Value::int(1))).unwrap().as_int() == Some(1));
    }
}
