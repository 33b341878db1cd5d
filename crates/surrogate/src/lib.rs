#![doc = include_str!("../../../README.md")]

mod args;
mod dunder;
mod exception;
mod format;
pub mod masking;
pub mod ops;
pub mod policy;
pub mod proxy;
pub mod public;
mod py_hash;
pub mod types;
mod value;

pub use crate::{
    args::{ArgValues, Kwargs},
    dunder::{BinaryOp, CompareOp, Conversion, Dunder, UnaryOp},
    exception::{ExcType, Exception, RunResult},
    format::FormatError,
    masking::{MaskedNames, MaskingDict, masking_proxy, masking_specialization},
    ops::ExitArgs,
    policy::MaskPolicy,
    proxy::{
        Declaration, DeclarationKind, Proxy, ProxyState, Receiver, Specialization, SpecializationBuilder,
        get_original, get_state, is_proxy, make_specialization, mark_direct, proxiee, proxy, unproxied,
    },
    public::{get_api, get_private_api, get_public_api, get_public_proxy},
    types::{ClassBuilder, PyTrait, PyType, TypeRef},
    value::Value,
};
