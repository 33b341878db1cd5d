//! User-defined classes and their instances.
//!
//! A class is a [`PyType`] of kind [`TypeKind::Class`] whose namespace holds Rust closures
//! as methods. Its instances dispatch every special method to the class namespace, so a
//! class that defines `__iadd__` supports `+=` in place, one that defines `__enter__` and
//! `__exit__` is a context manager, and so on.
//!
//! Only attributes defined by user classes count as overrides. The slot wrappers that
//! `object` advertises resolve to the default behaviour instead of being called, which
//! would recurse straight back into the instance.

use std::sync::{Arc, Weak};

use ahash::AHashSet;
use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Conversion, Dunder, UnaryOp},
    exception::{ExcType, RunResult},
    ops::{self, ExitArgs},
    types::{
        Dict, Property, PyTrait, PyType, SlotWrapper, TypeKind, TypeRef,
        function::{Function, native},
        py_trait::address_of,
    },
    value::Value,
};

/// Builds a user class.
///
/// ```
/// use surrogate::{ArgValues, ClassBuilder, Value, ops};
///
/// let counter = ClassBuilder::new("Counter")
///     .attr("step", 2_i64)
///     .method("__init__", |this, args| {
///         ops::setattr(this, "count", args.get_one_arg("__init__")?)?;
///         Ok(Value::none())
///     })
///     .build()
///     .unwrap();
/// let instance = ops::call(&Value::from_arc(counter), ArgValues::One(Value::int(5))).unwrap();
/// assert_eq!(ops::getattr(&instance, "count").unwrap().as_int(), Some(5));
/// ```
#[derive(Default)]
pub struct ClassBuilder {
    name: String,
    bases: Vec<TypeRef>,
    namespace: IndexMap<String, Value>,
}

impl ClassBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a base class. Without any, the class derives from `object`.
    #[must_use]
    pub fn base(mut self, base: &TypeRef) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Sets a plain class attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.namespace.insert(name.to_owned(), value.into());
        self
    }

    /// Defines a method. `body` receives the instance and the call's arguments.
    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        body: impl Fn(&Value, ArgValues) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        let method_name = name.to_owned();
        let func = native(move |args| {
            let (this, rest) = args.split_first(&method_name)?;
            body(&this, rest)
        });
        let qualname = format!("{}.{name}", self.name);
        self.namespace.insert(name.to_owned(), Function::new_value(qualname, func));
        self
    }

    /// Defines a read-only property computed from the instance.
    #[must_use]
    pub fn property(
        mut self,
        name: &str,
        getter: impl Fn(&Value) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        let getter_name = name.to_owned();
        let fget = native(move |args| getter(&args.get_one_arg(&getter_name)?));
        let fget = Function::new_value(format!("{}.{name}", self.name), fget);
        self.namespace.insert(name.to_owned(), Value::new(Property::getter(fget)));
        self
    }

    /// Declares `__slots__`: instances get no `__dict__` and accept only these attributes.
    #[must_use]
    pub fn slots(mut self, names: &[&str]) -> Self {
        let slots = Value::tuple(names.iter().map(|name| Value::str(*name)));
        self.namespace.insert("__slots__".to_owned(), slots);
        self
    }

    pub fn build(mut self) -> RunResult<TypeRef> {
        // defining __eq__ without __hash__ makes instances unhashable
        if self.namespace.contains_key(Dunder::Eq.as_str()) && !self.namespace.contains_key(Dunder::Hash.as_str()) {
            self.namespace.insert(Dunder::Hash.as_str().to_owned(), Value::none());
        }
        PyType::class(&self.name, self.bases, self.namespace)
    }
}

/// An instance of a user class.
pub struct Instance {
    me: Weak<Self>,
    class: TypeRef,
    /// Attribute storage, a [`Dict`]. Exposed as `__dict__` unless the class uses `__slots__`.
    attrs: Value,
    slot_names: Option<AHashSet<String>>,
}

impl Instance {
    /// Creates an instance of `class` and runs its `__init__`.
    pub(crate) fn create(class: TypeRef, args: ArgValues) -> RunResult<Value> {
        let slot_names = if class.instances_have_dict() {
            None
        } else {
            Some(declared_slots(&class)?)
        };
        let instance = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            class,
            attrs: Value::new(Dict::default()),
            slot_names,
        });
        let value = Value::from_arc(instance.clone());
        match instance.call_user("__init__", args.clone())? {
            Some(result) if !result.is_none() => Err(ExcType::type_error(format!(
                "__init__() should return None, not '{}'",
                result.type_name()
            ))),
            Some(_) => Ok(value),
            None if args.count() > 0 || args.has_kwargs() => Err(ExcType::type_error(format!(
                "{}() takes no arguments",
                instance.class.name()
            ))),
            None => Ok(value),
        }
    }

    #[must_use]
    pub fn class(&self) -> &TypeRef {
        &self.class
    }

    fn value(&self) -> RunResult<Value> {
        self.me
            .upgrade()
            .map(|me| Value::from_arc(me))
            .ok_or_else(|| ExcType::runtime_error("instance is being dropped"))
    }

    fn attrs(&self) -> Option<&Dict> {
        self.attrs.downcast_ref::<Dict>()
    }

    /// Special method `name` defined by a user class, bound to this instance.
    fn user_method(&self, name: &str) -> RunResult<Option<Value>> {
        let Some(attr) = self.class.lookup(name) else {
            return Ok(None);
        };
        if attr.is_none() || attr.downcast_ref::<SlotWrapper>().is_some() {
            return Ok(None);
        }
        if ops::is_descriptor(&attr) {
            let this = self.value()?;
            return ops::descr_get(&attr, Some(&this), Some(&self.class.to_value()?)).map(Some);
        }
        Ok(Some(attr))
    }

    fn call_user(&self, name: &str, args: ArgValues) -> RunResult<Option<Value>> {
        match self.user_method(name)? {
            Some(method) => ops::call(&method, args).map(Some),
            None => Ok(None),
        }
    }

    fn call_dunder(&self, dunder: Dunder, args: ArgValues) -> RunResult<Option<Value>> {
        self.call_user(dunder.as_str(), args)
    }

    fn type_error_unsupported(&self, what: &str) -> crate::exception::Exception {
        ExcType::type_error(format!("'{}' object {what}", self.class.name()))
    }

    /// Attribute lookup without the `__getattr__` fallback.
    fn lookup_attr(&self, this: &Value, name: &str) -> RunResult<Option<Value>> {
        match name {
            "__class__" => return self.class.to_value().map(Some),
            "__dict__" if self.slot_names.is_none() => return Ok(Some(self.attrs.clone())),
            _ => {}
        }
        let class_attr = self.class.lookup(name);
        if let Some(attr) = &class_attr
            && ops::is_data_descriptor(attr)
        {
            return ops::descr_get(attr, Some(this), Some(&self.class.to_value()?)).map(Some);
        }
        if let Some(value) = self.attrs().and_then(|attrs| attrs.get_str(name)) {
            return Ok(Some(value));
        }
        match class_attr {
            Some(attr) if ops::is_descriptor(&attr) => {
                ops::descr_get(&attr, Some(this), Some(&self.class.to_value()?)).map(Some)
            }
            other => Ok(other),
        }
    }

    fn check_slot(&self, name: &str) -> RunResult<()> {
        match &self.slot_names {
            Some(names) if !names.contains(name) => Err(ExcType::attribute_error(self.class.name(), name)),
            _ => Ok(()),
        }
    }
}

/// Every `__slots__` name declared along the class's MRO.
fn declared_slots(class: &PyType) -> RunResult<AHashSet<String>> {
    let mut names = AHashSet::new();
    let mro = ops::getattr(&class.to_value()?, "__mro__")?;
    for ty in ops::collect(&mro)? {
        if let Some(ty) = ty.downcast_ref::<PyType>()
            && matches!(ty.kind(), TypeKind::Class)
            && let Some(slots) = ty.own_attr("__slots__")
        {
            names.extend(ops::collect_strings(&slots)?);
        }
    }
    Ok(names)
}

impl PyTrait for Instance {
    fn py_type(&self) -> TypeRef {
        self.class.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        match self.call_dunder(Dunder::Repr, ArgValues::Empty)? {
            Some(repr) => ops::expect_str(&repr, "__repr__"),
            None => Ok(format!("<{} object at {:#x}>", self.class.name(), address_of(self))),
        }
    }

    fn py_str(&self) -> RunResult<String> {
        match self.call_dunder(Dunder::Str, ArgValues::Empty)? {
            Some(text) => ops::expect_str(&text, "__str__"),
            None => self.py_repr(),
        }
    }

    fn py_bytes(&self) -> RunResult<Vec<u8>> {
        match self.call_dunder(Dunder::Bytes, ArgValues::Empty)? {
            Some(bytes) => ops::expect_bytes(&bytes, "__bytes__"),
            None => Err(ExcType::type_error(format!(
                "cannot convert '{}' object to bytes",
                self.class.name()
            ))),
        }
    }

    fn py_format(&self, spec: &str) -> RunResult<String> {
        match self.call_dunder(Dunder::Format, ArgValues::One(Value::str(spec)))? {
            Some(text) => ops::expect_str(&text, "__format__"),
            None if spec.is_empty() => self.py_str(),
            None => Err(ExcType::type_error(format!(
                "unsupported format string passed to {}.__format__",
                self.class.name()
            ))),
        }
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        if let Some(result) = self.call_dunder(op.dunder(), ArgValues::One(other.clone()))? {
            return Ok(ops::implemented(result));
        }
        // != defaults to the inverse of a user-defined ==
        if op == CompareOp::Ne
            && let Some(result) = self.call_dunder(Dunder::Eq, ArgValues::One(other.clone()))?
        {
            return match ops::implemented(result) {
                Some(equal) => Ok(Some(Value::bool(!ops::truthy(&equal)?))),
                None => Ok(None),
            };
        }
        Ok(None)
    }

    fn py_cmp(&self, other: &Value) -> RunResult<Option<i64>> {
        match self.call_dunder(Dunder::Cmp, ArgValues::One(other.clone()))? {
            Some(result) => match ops::implemented(result) {
                Some(result) => ops::expect_int(&result, "__cmp__").map(Some),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn py_hash(&self) -> RunResult<i64> {
        match self.class.lookup(Dunder::Hash.as_str()) {
            Some(attr) if attr.is_none() => Err(ExcType::type_error_unhashable(self.class.name())),
            _ => match self.call_dunder(Dunder::Hash, ArgValues::Empty)? {
                Some(hash) => ops::expect_int(&hash, "__hash__"),
                None => Ok(crate::py_hash::hash_pointer(address_of(self))),
            },
        }
    }

    fn py_bool(&self) -> RunResult<bool> {
        for dunder in [Dunder::Bool, Dunder::Nonzero] {
            if let Some(result) = self.call_dunder(dunder, ArgValues::Empty)? {
                return ops::expect_bool(&result, dunder.as_str());
            }
        }
        match self.call_dunder(Dunder::Len, ArgValues::Empty)? {
            Some(len) => Ok(ops::expect_usize(&len, "__len__")? != 0),
            None => Ok(true),
        }
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        let error = match self.lookup_attr(this, name) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => ExcType::attribute_error(self.class.name(), name),
            Err(exc) if exc.is_instance_of(ExcType::AttributeError) => exc,
            Err(exc) => return Err(exc),
        };
        match self.call_dunder(Dunder::Getattr, ArgValues::One(Value::str(name)))? {
            Some(value) => Ok(value),
            None => Err(error),
        }
    }

    fn py_setattr(&self, name: &str, value: Value) -> RunResult<()> {
        if let Some(attr) = self.class.lookup(name)
            && ops::is_data_descriptor(&attr)
        {
            return ops::descr_set(&attr, &self.value()?, value);
        }
        self.check_slot(name)?;
        match self.attrs() {
            Some(attrs) => {
                attrs.set_str(name, value);
                Ok(())
            }
            None => Err(ExcType::attribute_error_no_setattr(self.class.name(), name)),
        }
    }

    fn py_delattr(&self, name: &str) -> RunResult<()> {
        if let Some(attr) = self.class.lookup(name)
            && ops::is_data_descriptor(&attr)
        {
            return ops::descr_delete(&attr, &self.value()?);
        }
        match self.attrs().and_then(|attrs| attrs.remove_str(name)) {
            Some(_) => Ok(()),
            None => Err(ExcType::attribute_error(self.class.name(), name)),
        }
    }

    fn py_dir(&self) -> RunResult<Vec<String>> {
        if let Some(names) = self.call_dunder(Dunder::Dir, ArgValues::Empty)? {
            return ops::expect_strings(&names, "__dir__");
        }
        let mut names = self.class.dir();
        if let Some(attrs) = self.attrs() {
            names.extend(attrs.keys().iter().filter_map(|key| key.as_str().map(str::to_owned)));
        }
        Ok(names)
    }

    fn py_attr_store(&self) -> Option<Value> {
        self.slot_names.is_none().then(|| self.attrs.clone())
    }

    fn py_descr_get(&self, instance: Option<&Value>, owner: Option<&Value>) -> RunResult<Value> {
        let args = ArgValues::Two(
            instance.cloned().unwrap_or_else(Value::none),
            owner.cloned().unwrap_or_else(Value::none),
        );
        self.call_dunder(Dunder::Get, args)?
            .ok_or_else(|| ExcType::attribute_error(self.class.name(), "__get__"))
    }

    fn py_descr_set(&self, instance: &Value, value: Value) -> RunResult<()> {
        self.call_dunder(Dunder::Set, ArgValues::Two(instance.clone(), value))?
            .map(drop)
            .ok_or_else(|| ExcType::attribute_error(self.class.name(), "__set__"))
    }

    fn py_descr_delete(&self, instance: &Value) -> RunResult<()> {
        self.call_dunder(Dunder::Delete, ArgValues::One(instance.clone()))?
            .map(drop)
            .ok_or_else(|| ExcType::attribute_error(self.class.name(), "__delete__"))
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        self.call_dunder(Dunder::Call, args)?
            .ok_or_else(|| ExcType::type_error_not_callable(self.class.name()))
    }

    fn py_len(&self) -> RunResult<usize> {
        match self.call_dunder(Dunder::Len, ArgValues::Empty)? {
            Some(len) => ops::expect_usize(&len, "__len__"),
            None => Err(ExcType::type_error_no_len(self.class.name())),
        }
    }

    fn py_length_hint(&self) -> RunResult<usize> {
        match self.call_dunder(Dunder::LengthHint, ArgValues::Empty)? {
            Some(hint) => ops::expect_usize(&hint, "__length_hint__"),
            None => Err(ExcType::attribute_error(self.class.name(), "__length_hint__")),
        }
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        self.call_dunder(Dunder::Getitem, ArgValues::One(key.clone()))?
            .ok_or_else(|| self.type_error_unsupported("is not subscriptable"))
    }

    fn py_setitem(&self, key: Value, value: Value) -> RunResult<()> {
        self.call_dunder(Dunder::Setitem, ArgValues::Two(key, value))?
            .map(drop)
            .ok_or_else(|| self.type_error_unsupported("does not support item assignment"))
    }

    fn py_delitem(&self, key: &Value) -> RunResult<()> {
        self.call_dunder(Dunder::Delitem, ArgValues::One(key.clone()))?
            .map(drop)
            .ok_or_else(|| self.type_error_unsupported("doesn't support item deletion"))
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        match self.call_dunder(Dunder::Contains, ArgValues::One(item.clone()))? {
            Some(found) => ops::truthy(&found).map(Some),
            None => Ok(None),
        }
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        self.call_dunder(Dunder::Iter, ArgValues::Empty)?
            .ok_or_else(|| ExcType::type_error_not_iterable(self.class.name()))
    }

    fn py_next(&self) -> RunResult<Option<Value>> {
        match self.call_dunder(Dunder::Next, ArgValues::Empty) {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => Err(ExcType::type_error_not_iterator(self.class.name())),
            Err(exc) if exc.exc_type() == ExcType::StopIteration => Ok(None),
            Err(exc) => Err(exc),
        }
    }

    fn py_reversed(&self) -> RunResult<Value> {
        self.call_dunder(Dunder::Reversed, ArgValues::Empty)?
            .ok_or_else(|| self.type_error_unsupported("is not reversible"))
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        Ok(self
            .call_dunder(op.dunder(), ArgValues::One(other.clone()))?
            .and_then(ops::implemented))
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        Ok(self
            .call_dunder(op.reflected_dunder(), ArgValues::One(other.clone()))?
            .and_then(ops::implemented))
    }

    fn py_inplace(&self, _this: &Value, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        let Some(dunder) = op.inplace_dunder() else {
            return Ok(None);
        };
        Ok(self
            .call_dunder(dunder, ArgValues::One(other.clone()))?
            .and_then(ops::implemented))
    }

    fn py_unary(&self, op: UnaryOp) -> RunResult<Value> {
        self.call_dunder(op.dunder(), ArgValues::Empty)?
            .ok_or_else(|| ExcType::type_error_unsupported_unary(op.symbol(), self.class.name()))
    }

    fn py_convert(&self, conversion: Conversion) -> RunResult<Value> {
        self.call_dunder(conversion.dunder(), ArgValues::Empty)?
            .ok_or_else(|| ops::conversion_error(conversion, &self.class))
    }

    fn py_round(&self, ndigits: Option<i64>) -> RunResult<Value> {
        let args = match ndigits {
            Some(ndigits) => ArgValues::One(Value::int(ndigits)),
            None => ArgValues::Empty,
        };
        self.call_dunder(Dunder::Round, args)?.ok_or_else(|| {
            ExcType::type_error(format!(
                "type {} doesn't define __round__ method",
                self.class.name()
            ))
        })
    }

    fn py_coerce(&self, other: &Value) -> RunResult<Option<(Value, Value)>> {
        let Some(result) = self.call_dunder(Dunder::Coerce, ArgValues::One(other.clone()))? else {
            return Ok(None);
        };
        let Some(result) = ops::implemented(result) else {
            return Ok(None);
        };
        match <[Value; 2]>::try_from(ops::collect(&result)?) {
            Ok([a, b]) => Ok(Some((a, b))),
            Err(_) => Err(ExcType::type_error("coercion should return None or 2-tuple")),
        }
    }

    fn py_enter(&self, _this: &Value) -> RunResult<Value> {
        self.call_dunder(Dunder::Enter, ArgValues::Empty)?
            .ok_or_else(|| ExcType::attribute_error(self.class.name(), "__enter__"))
    }

    fn py_exit(&self, args: &ExitArgs) -> RunResult<Value> {
        self.call_dunder(Dunder::Exit, args.clone().into_args())?
            .ok_or_else(|| ExcType::attribute_error(self.class.name(), "__exit__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> TypeRef {
        ClassBuilder::new("Point")
            .method("__init__", |this, args| {
                let (x, y) = args.get_two_args("__init__")?;
                ops::setattr(this, "x", x)?;
                ops::setattr(this, "y", y)?;
                Ok(Value::none())
            })
            .method("__add__", |this, args| {
                let other = args.get_one_arg("__add__")?;
                let x = ops::add(&ops::getattr(this, "x")?, &ops::getattr(&other, "x")?)?;
                let y = ops::add(&ops::getattr(this, "y")?, &ops::getattr(&other, "y")?)?;
                ops::call(&this.py_type().to_value()?, ArgValues::Two(x, y))
            })
            .property("norm1", |this| ops::add(&ops::getattr(this, "x")?, &ops::getattr(this, "y")?))
            .build()
            .unwrap()
    }

    fn make(class: &TypeRef, x: i64, y: i64) -> Value {
        ops::call(&Value::from_arc(class.clone()), ArgValues::Two(Value::int(x), Value::int(y))).unwrap()
    }

    #[test]
    fn init_attributes_and_properties() {
        let class = point();
        let p = make(&class, 1, 2);
        assert_eq!(ops::getattr(&p, "x").unwrap().as_int(), Some(1));
        assert_eq!(ops::getattr(&p, "norm1").unwrap().as_int(), Some(3));
        let err = ops::setattr(&p, "norm1", Value::int(0)).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::AttributeError);
    }

    #[test]
    fn user_operators_and_inplace_fallback() {
        let class = point();
        let p = make(&class, 1, 2);
        let q = ops::inplace(&p, BinaryOp::Add, &make(&class, 10, 20)).unwrap();
        assert!(!q.is(&p));
        assert_eq!(ops::getattr(&q, "y").unwrap().as_int(), Some(22));
        assert!(!ops::hasattr(&p, "__iadd__").unwrap());
    }

    #[test]
    fn slots_reject_unknown_attributes() {
        let class = ClassBuilder::new("Slotted").slots(&["a"]).build().unwrap();
        let obj = ops::call(&Value::from_arc(class), ArgValues::Empty).unwrap();
        ops::setattr(&obj, "a", Value::int(1)).unwrap();
        assert!(ops::setattr(&obj, "b", Value::int(1)).is_err());
        assert!(!ops::hasattr(&obj, "__dict__").unwrap());
    }

    #[test]
    fn eq_without_hash_is_unhashable() {
        let class = ClassBuilder::new("Eq")
            .method("__eq__", |_, _| Ok(Value::bool(true)))
            .build()
            .unwrap();
        let obj = ops::call(&Value::from_arc(class), ArgValues::Empty).unwrap();
        assert_eq!(ops::hash(&obj).unwrap_err().arg(), Some("unhashable type: 'Eq'"));
        assert!(!ops::ne(&obj, &Value::int(1)).unwrap());
    }

    #[test]
    fn getattr_fallback() {
        let class = ClassBuilder::new("Dynamic")
            .method("__getattr__", |_, args| {
                let name = args.get_one_arg("__getattr__")?;
                Ok(Value::str(format!("dyn:{}", name.as_str().unwrap_or_default())))
            })
            .build()
            .unwrap();
        let obj = ops::call(&Value::from_arc(class), ArgValues::Empty).unwrap();
        assert_eq!(ops::getattr(&obj, "anything").unwrap().as_str(), Some("dyn:anything"));
    }

    #[test]
    fn takes_no_arguments_without_init() {
        let class = ClassBuilder::new("Plain").build().unwrap();
        let err = ops::call(&Value::from_arc(class), ArgValues::One(Value::int(1))).unwrap_err();
        assert_eq!(err.arg(), Some("Plain() takes no arguments"));
    }
}
