//! Callables: native functions, bound methods, slot wrappers and properties.
//!
//! Functions and slot wrappers are descriptors. Looking one up through an instance binds
//! it, so `x.append` is a [`BoundMethod`] and `x.__add__` is a [`SlotMethod`] carrying `x`
//! as the receiver.

use std::sync::Arc;

use crate::{
    args::ArgValues,
    dunder::Dunder,
    exception::{ExcType, Exception, RunResult},
    ops,
    types::{PyTrait, TypeRef, builtins, py_trait::address_of},
    value::Value,
};

/// Body of a native callable. Methods receive their receiver as the first positional argument.
pub type NativeFn = Arc<dyn Fn(ArgValues) -> RunResult<Value> + Send + Sync>;

/// Boxes a closure as a [`NativeFn`].
pub fn native(func: impl Fn(ArgValues) -> RunResult<Value> + Send + Sync + 'static) -> NativeFn {
    Arc::new(func)
}

pub(crate) const FUNCTION_SLOTS: &[Dunder] = &[Dunder::Repr, Dunder::Call, Dunder::Get];
pub(crate) const METHOD_SLOTS: &[Dunder] = &[Dunder::Repr, Dunder::Call];
pub(crate) const PROPERTY_SLOTS: &[Dunder] = &[Dunder::Get, Dunder::Set, Dunder::Delete];

/// A named native function.
pub struct Function {
    name: String,
    func: NativeFn,
}

impl Function {
    #[must_use]
    pub fn new(name: impl Into<String>, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    #[must_use]
    pub fn new_value(name: String, func: NativeFn) -> Value {
        Value::new(Self::new(name, func))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PyTrait for Function {
    fn py_type(&self) -> TypeRef {
        builtins().function.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(format!("<function {} at {:#x}>", self.name, address_of(self)))
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match name {
            "__name__" => Ok(Value::str(self.name.rsplit('.').next().unwrap_or(&self.name))),
            "__qualname__" => Ok(Value::str(self.name.as_str())),
            _ => ops::generic_getattr(this, name),
        }
    }

    fn py_descr_get(&self, instance: Option<&Value>, _owner: Option<&Value>) -> RunResult<Value> {
        Ok(match instance {
            Some(receiver) => Value::new(BoundMethod {
                name: self.name.clone(),
                func: self.func.clone(),
                receiver: receiver.clone(),
            }),
            None => Value::new(Self::new(self.name.clone(), self.func.clone())),
        })
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        (self.func)(args)
    }
}

/// A function bound to its receiver.
pub struct BoundMethod {
    name: String,
    func: NativeFn,
    receiver: Value,
}

impl PyTrait for BoundMethod {
    fn py_type(&self) -> TypeRef {
        builtins().method.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(format!("<bound method {} of {}>", self.name, ops::repr(&self.receiver)?))
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match name {
            "__self__" => Ok(self.receiver.clone()),
            "__name__" => Ok(Value::str(self.name.rsplit('.').next().unwrap_or(&self.name))),
            _ => ops::generic_getattr(this, name),
        }
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        (self.func)(args.prepend(self.receiver.clone()))
    }
}

/// The namespace entry a builtin type uses to advertise a special method.
///
/// Calling it on an object invokes that object's slot directly.
#[derive(Debug, Clone, Copy)]
pub struct SlotWrapper {
    dunder: Dunder,
}

impl SlotWrapper {
    #[must_use]
    pub fn new(dunder: Dunder) -> Self {
        Self { dunder }
    }

    #[must_use]
    pub fn dunder(&self) -> Dunder {
        self.dunder
    }
}

impl PyTrait for SlotWrapper {
    fn py_type(&self) -> TypeRef {
        builtins().slot_wrapper.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(format!("<slot wrapper '{}'>", self.dunder.as_str()))
    }

    fn py_descr_get(&self, instance: Option<&Value>, _owner: Option<&Value>) -> RunResult<Value> {
        Ok(match instance {
            Some(receiver) => Value::new(SlotMethod {
                dunder: self.dunder,
                receiver: receiver.clone(),
            }),
            None => Value::new(*self),
        })
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        let (receiver, rest) = args.split_first(self.dunder.as_str())?;
        ops::call_slot(&receiver, self.dunder, rest)
    }
}

/// A slot wrapper bound to its receiver, `(3).__add__`.
pub struct SlotMethod {
    dunder: Dunder,
    receiver: Value,
}

impl SlotMethod {
    #[must_use]
    pub fn new(dunder: Dunder, receiver: Value) -> Self {
        Self { dunder, receiver }
    }
}

impl PyTrait for SlotMethod {
    fn py_type(&self) -> TypeRef {
        builtins().method_wrapper.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(format!(
            "<method-wrapper '{}' of {} object at {:#x}>",
            self.dunder.as_str(),
            self.receiver.type_name(),
            self.receiver.id()
        ))
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match name {
            "__self__" => Ok(self.receiver.clone()),
            "__name__" => Ok(Value::str(self.dunder.as_str())),
            _ => ops::generic_getattr(this, name),
        }
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        ops::call_slot(&self.receiver, self.dunder, args)
    }
}

/// A computed attribute with optional getter, setter and deleter callables.
#[derive(Clone, Default)]
pub struct Property {
    fget: Option<Value>,
    fset: Option<Value>,
    fdel: Option<Value>,
}

impl Property {
    /// A read-only property.
    #[must_use]
    pub fn getter(fget: Value) -> Self {
        Self {
            fget: Some(fget),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_setter(mut self, fset: Value) -> Self {
        self.fset = Some(fset);
        self
    }

    #[must_use]
    pub fn with_deleter(mut self, fdel: Value) -> Self {
        self.fdel = Some(fdel);
        self
    }
}

fn missing_accessor(instance: &Value, accessor: &str) -> Exception {
    Exception::new_msg(
        ExcType::AttributeError,
        format!("property of '{}' object has no {accessor}", instance.type_name()),
    )
}

fn accessor(value: Option<Value>) -> Option<Value> {
    value.filter(|value| !value.is_none())
}

impl PyTrait for Property {
    fn py_type(&self) -> TypeRef {
        builtins().property.clone()
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        let field = match name {
            "fget" => &self.fget,
            "fset" => &self.fset,
            "fdel" => &self.fdel,
            _ => return ops::generic_getattr(this, name),
        };
        Ok(field.clone().unwrap_or_else(Value::none))
    }

    fn py_descr_get(&self, instance: Option<&Value>, _owner: Option<&Value>) -> RunResult<Value> {
        let Some(instance) = instance else {
            return Ok(Value::new(self.clone()));
        };
        match &self.fget {
            Some(fget) => ops::call(fget, ArgValues::One(instance.clone())),
            None => Err(missing_accessor(instance, "getter")),
        }
    }

    fn py_descr_set(&self, instance: &Value, value: Value) -> RunResult<()> {
        match &self.fset {
            Some(fset) => ops::call(fset, ArgValues::Two(instance.clone(), value)).map(drop),
            None => Err(missing_accessor(instance, "setter")),
        }
    }

    fn py_descr_delete(&self, instance: &Value) -> RunResult<()> {
        match &self.fdel {
            Some(fdel) => ops::call(fdel, ArgValues::One(instance.clone())).map(drop),
            None => Err(missing_accessor(instance, "deleter")),
        }
    }
}

/// `property(fget=None, fset=None, fdel=None)`.
pub(crate) fn construct_property(args: ArgValues) -> RunResult<Value> {
    let (positional, mut kwargs) = args.into_parts();
    if positional.len() > 3 {
        return Err(ExcType::type_error_at_most("property", 3, positional.len()));
    }
    let mut positional = positional.into_iter();
    let mut take = |name: &str| accessor(positional.next().or_else(|| kwargs.shift_remove(name)));
    let property = Property {
        fget: take("fget"),
        fset: take("fset"),
        fdel: take("fdel"),
    };
    if let Some(name) = kwargs.keys().next() {
        return Err(ExcType::type_error(format!(
            "property() got an unexpected keyword argument '{name}'"
        )));
    }
    Ok(Value::new(property))
}
