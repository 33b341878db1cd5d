//! Builtin object types.
//!
//! Each module implements [`PyTrait`] for one family of builtin values and exposes the
//! list of special methods its type object advertises.
pub mod bytes;
pub mod class;
pub mod complex;
pub mod dict;
pub mod float;
pub mod function;
pub mod int;
pub mod iter;
pub mod list;
pub mod mapping_proxy;
pub(crate) mod number;
pub mod py_trait;
pub mod singletons;
pub mod str;
pub mod tuple;
pub mod r#type;

pub use bytes::Bytes;
pub use class::{ClassBuilder, Instance};
pub use complex::Complex;
pub use dict::Dict;
pub use float::Float;
pub use function::{BoundMethod, Function, NativeFn, Property, SlotMethod, SlotWrapper, native};
pub use int::{Bool, Int};
pub use iter::PyIterator;
pub use list::List;
pub use mapping_proxy::MappingProxy;
pub use py_trait::{AsAny, PyTrait};
pub use singletons::{NoneType, NotImplementedType, Object};
pub use str::Str;
pub use tuple::Tuple;
pub use r#type::{Builtins, PyType, TypeKind, TypeRef, builtins};
