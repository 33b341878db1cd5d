//! `None`, `NotImplemented` and bare `object()` instances.

use crate::{
    args::ArgValues,
    dunder::Dunder,
    exception::RunResult,
    types::{PyTrait, TypeRef, builtins},
    value::Value,
};

/// Special methods every object inherits from `object`.
pub(crate) const OBJECT_SLOTS: &[Dunder] = &[
    Dunder::Repr,
    Dunder::Str,
    Dunder::Format,
    Dunder::Lt,
    Dunder::Le,
    Dunder::Eq,
    Dunder::Ne,
    Dunder::Gt,
    Dunder::Ge,
    Dunder::Hash,
    Dunder::Getattribute,
    Dunder::Setattr,
    Dunder::Delattr,
    Dunder::Dir,
];

/// The type of `None`. Use [`Value::none`] rather than creating new instances.
#[derive(Debug)]
pub struct NoneType;

impl PyTrait for NoneType {
    fn py_type(&self) -> TypeRef {
        builtins().none.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok("None".to_owned())
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(false)
    }
}

/// The type of `NotImplemented`. Use [`Value::not_implemented`].
#[derive(Debug)]
pub struct NotImplementedType;

impl PyTrait for NotImplementedType {
    fn py_type(&self) -> TypeRef {
        builtins().not_implemented.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok("NotImplemented".to_owned())
    }
}

/// A featureless `object()` instance.
#[derive(Debug)]
pub struct Object;

impl PyTrait for Object {
    fn py_type(&self) -> TypeRef {
        builtins().object.clone()
    }
}

pub(crate) fn construct_object(args: ArgValues) -> RunResult<Value> {
    args.check_zero_args("object")?;
    Ok(Value::new(Object))
}
