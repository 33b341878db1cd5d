//! Type objects and the registry of builtin types.
//!
//! A [`PyType`] is itself a value (its type is `type`), so `type(x)` hands back a
//! [`TypeRef`] that can be compared by identity, called, introspected and put in
//! containers like any other object.
//!
//! Builtin types advertise the special methods they support as slot-wrapper entries in
//! their namespace. That is what makes `hasattr(3, "__add__")` true and
//! `hasattr(3, "__iadd__")` false, and what `dir()` lists.

use std::{
    fmt,
    sync::{
        Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::AHashMap;
use indexmap::IndexMap;
use strum::IntoEnumIterator;

use crate::{
    args::ArgValues,
    dunder::Dunder,
    exception::{self, ExcType, RunResult},
    types::{
        Instance, PyTrait, Tuple, bytes, complex, dict, float,
        function::{self, NativeFn, SlotWrapper, native},
        int, iter, list, mapping_proxy, singletons, str, tuple,
    },
    value::Value,
};

/// Shared handle to a type object.
pub type TypeRef = Arc<PyType>;

static NEXT_TYPE_UID: AtomicU64 = AtomicU64::new(1);

/// What kind of type this is, which decides how it constructs instances and
/// resolves subclass checks.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Implemented in Rust.
    Builtin,
    /// An exception type.
    Exception(ExcType),
    /// A user class built with [`crate::ClassBuilder`].
    Class,
    /// The type of a proxy specialization.
    Specialization,
    /// A specialization bound to the type of the object it wraps.
    BoundProxy { wrapped: TypeRef },
}

/// A type object.
pub struct PyType {
    me: Weak<Self>,
    uid: u64,
    name: String,
    kind: TypeKind,
    bases: Vec<TypeRef>,
    /// Method resolution order, excluding the type itself.
    mro: Vec<TypeRef>,
    namespace: RwLock<IndexMap<String, Value>>,
    constructor: Option<NativeFn>,
}

impl fmt::Debug for PyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.name)
    }
}

impl PyType {
    fn create(
        name: String,
        kind: TypeKind,
        bases: Vec<TypeRef>,
        mro: Vec<TypeRef>,
        namespace: IndexMap<String, Value>,
        constructor: Option<NativeFn>,
    ) -> TypeRef {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            uid: NEXT_TYPE_UID.fetch_add(1, Ordering::Relaxed),
            name,
            kind,
            bases,
            mro,
            namespace: RwLock::new(namespace),
            constructor,
        })
    }

    /// Creates a builtin type advertising `slots` and the given native methods.
    pub(crate) fn builtin(
        name: &str,
        bases: &[&TypeRef],
        slots: &[Dunder],
        methods: Vec<(&'static str, NativeFn)>,
        constructor: Option<NativeFn>,
    ) -> TypeRef {
        let mut namespace = IndexMap::new();
        for &dunder in slots {
            namespace.insert(dunder.as_str().to_owned(), Value::new(SlotWrapper::new(dunder)));
        }
        for (method_name, func) in methods {
            namespace.insert(
                method_name.to_owned(),
                function::Function::new_value(format!("{name}.{method_name}"), func),
            );
        }
        let bases: Vec<TypeRef> = bases.iter().map(|base| Arc::clone(base)).collect();
        let mro = linear_mro(&bases);
        Self::create(name.to_owned(), TypeKind::Builtin, bases, mro, namespace, constructor)
    }

    /// Creates a user class, computing its C3 method resolution order.
    pub(crate) fn class(name: &str, bases: Vec<TypeRef>, namespace: IndexMap<String, Value>) -> RunResult<TypeRef> {
        for base in &bases {
            if !matches!(base.kind, TypeKind::Class) && !Arc::ptr_eq(base, &builtins().object) {
                return Err(ExcType::type_error(format!(
                    "cannot subclass '{}': only classes and object are valid bases",
                    base.name
                )));
            }
        }
        let bases = if bases.is_empty() {
            vec![builtins().object.clone()]
        } else {
            bases
        };
        let mro = c3_mro(&bases)?;
        Ok(Self::create(
            name.to_owned(),
            TypeKind::Class,
            bases,
            mro,
            namespace,
            None,
        ))
    }

    fn exception(exc_type: ExcType, parent: &TypeRef) -> TypeRef {
        let mut namespace = IndexMap::new();
        for dunder in [Dunder::Repr, Dunder::Str] {
            namespace.insert(dunder.as_str().to_owned(), Value::new(SlotWrapper::new(dunder)));
        }
        let bases = vec![parent.clone()];
        let mro = linear_mro(&bases);
        let constructor: NativeFn = Arc::new(move |args| exception::construct(exc_type, args));
        Self::create(
            exc_type.to_string(),
            TypeKind::Exception(exc_type),
            bases,
            mro,
            namespace,
            Some(constructor),
        )
    }

    /// Creates the type object of a proxy specialization.
    pub(crate) fn specialization(name: &str, base: &TypeRef, constructor: NativeFn) -> TypeRef {
        let bases = vec![base.clone()];
        let mro = linear_mro(&bases);
        Self::create(
            name.to_owned(),
            TypeKind::Specialization,
            bases,
            mro,
            IndexMap::new(),
            Some(constructor),
        )
    }

    /// Creates the bound type of `specialization` for objects of type `wrapped`.
    ///
    /// The bound type advertises the special methods `wrapped` supports, so capability
    /// checks such as `callable()` see the wrapped object's protocols. The advertised set
    /// is read from `wrapped` on every lookup and follows later changes to the class.
    pub(crate) fn bound_proxy(specialization: &TypeRef, wrapped: &TypeRef) -> TypeRef {
        let bases = vec![specialization.clone()];
        let mro = linear_mro(&bases);
        Self::create(
            format!("{}[{}]", specialization.name, wrapped.name),
            TypeKind::BoundProxy {
                wrapped: wrapped.clone(),
            },
            bases,
            mro,
            IndexMap::new(),
            specialization.constructor.clone(),
        )
    }

    /// Slot wrapper a bound proxy type advertises for `name`, if the wrapped type supports it.
    fn forwarded_slot(&self, name: &str) -> Option<Value> {
        let TypeKind::BoundProxy { wrapped } = &self.kind else {
            return None;
        };
        let dunder: Dunder = name.parse().ok()?;
        wrapped.lookup(name).filter(|attr| !attr.is_none())?;
        Some(Value::new(SlotWrapper::new(dunder)))
    }

    fn forwarded_slots(&self) -> Vec<(String, Value)> {
        if !matches!(self.kind, TypeKind::BoundProxy { .. }) {
            return Vec::new();
        }
        Dunder::iter()
            .filter_map(|dunder| {
                let slot = self.forwarded_slot(dunder.as_str())?;
                Some((dunder.as_str().to_owned(), slot))
            })
            .collect()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique identifier, stable for the life of the type.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    #[must_use]
    pub fn bases(&self) -> &[TypeRef] {
        &self.bases
    }

    /// The exception type this type object stands for, if any.
    #[must_use]
    pub fn exc_type(&self) -> Option<ExcType> {
        match self.kind {
            TypeKind::Exception(exc_type) => Some(exc_type),
            _ => None,
        }
    }

    /// For a bound proxy type, the type of the wrapped objects.
    #[must_use]
    pub fn wrapped(&self) -> Option<&TypeRef> {
        match &self.kind {
            TypeKind::BoundProxy { wrapped } => Some(wrapped),
            _ => None,
        }
    }

    /// A shared handle to this type.
    pub fn type_ref(&self) -> RunResult<TypeRef> {
        self.me
            .upgrade()
            .ok_or_else(|| ExcType::runtime_error(format!("type '{}' is being dropped", self.name)))
    }

    /// The type as a value.
    pub fn to_value(&self) -> RunResult<Value> {
        Ok(Value::from_arc(self.type_ref()?))
    }

    fn read_namespace(&self) -> RwLockReadGuard<'_, IndexMap<String, Value>> {
        self.namespace.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up `name` in this type's own namespace only.
    #[must_use]
    pub fn own_attr(&self, name: &str) -> Option<Value> {
        let own = self.read_namespace().get(name).cloned();
        own.or_else(|| self.forwarded_slot(name))
    }

    /// The type's own namespace entries, in definition order.
    #[must_use]
    pub fn own_items(&self) -> Vec<(String, Value)> {
        let mut items: Vec<(String, Value)> = self
            .read_namespace()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, slot) in self.forwarded_slots() {
            if !items.iter().any(|(own, _)| *own == name) {
                items.push((name, slot));
            }
        }
        items
    }

    /// Looks up `name` along the method resolution order.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.own_attr(name)
            .or_else(|| self.mro.iter().find_map(|ty| ty.own_attr(name)))
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Every attribute name visible on the type, sorted.
    #[must_use]
    pub fn dir(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_namespace().keys().cloned().collect();
        names.extend(self.forwarded_slots().into_iter().map(|(name, _)| name));
        for ty in &self.mro {
            names.extend(ty.read_namespace().keys().cloned());
        }
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Sets a class attribute. Builtin types are immutable.
    pub fn set_attr(&self, name: &str, value: Value) -> RunResult<()> {
        self.check_mutable(name)?;
        self.namespace
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), value);
        Ok(())
    }

    pub fn del_attr(&self, name: &str) -> RunResult<()> {
        self.check_mutable(name)?;
        let removed = self
            .namespace
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name);
        match removed {
            Some(_) => Ok(()),
            None => Err(ExcType::attribute_error_type(&self.name, name)),
        }
    }

    fn check_mutable(&self, name: &str) -> RunResult<()> {
        if matches!(self.kind, TypeKind::Class) {
            Ok(())
        } else {
            Err(ExcType::type_error(format!(
                "cannot set '{name}' attribute of immutable type '{}'",
                self.name
            )))
        }
    }

    /// Whether instances of this class carry a `__dict__`.
    ///
    /// A class hierarchy that declares `__slots__` on every user class gives up the dict.
    #[must_use]
    pub fn instances_have_dict(&self) -> bool {
        std::iter::once(self)
            .chain(self.mro.iter().map(|ty| &**ty))
            .filter(|ty| matches!(ty.kind, TypeKind::Class))
            .any(|ty| ty.own_attr("__slots__").is_none())
    }

    /// `issubclass(self, other)`.
    ///
    /// A bound proxy type also counts as a subclass of everything its wrapped type is a
    /// subclass of, which is what makes `isinstance(proxy(3), int)` hold.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) || self.mro.iter().any(|ty| std::ptr::eq(&**ty, other)) {
            return true;
        }
        match &self.kind {
            TypeKind::BoundProxy { wrapped } => wrapped.is_subclass_of(other),
            _ => false,
        }
    }
}

/// MRO for single-inheritance chains: the base followed by its own MRO.
fn linear_mro(bases: &[TypeRef]) -> Vec<TypeRef> {
    let mut mro = Vec::new();
    for base in bases {
        for ty in std::iter::once(base).chain(base.mro.iter()) {
            if !mro.iter().any(|seen: &TypeRef| Arc::ptr_eq(seen, ty)) {
                mro.push(ty.clone());
            }
        }
    }
    mro
}

/// C3 linearization of `bases`, excluding the class being created.
fn c3_mro(bases: &[TypeRef]) -> RunResult<Vec<TypeRef>> {
    let mut linearizations: Vec<Vec<TypeRef>> = bases
        .iter()
        .map(|base| std::iter::once(base.clone()).chain(base.mro.iter().cloned()).collect())
        .collect();
    linearizations.push(bases.to_vec());

    let mut result: Vec<TypeRef> = Vec::new();
    loop {
        linearizations.retain(|lin| !lin.is_empty());
        if linearizations.is_empty() {
            return Ok(result);
        }

        // a good head is one that does not appear in the tail of any list
        let head = linearizations
            .iter()
            .map(|lin| &lin[0])
            .find(|candidate| {
                !linearizations
                    .iter()
                    .any(|lin| lin[1..].iter().any(|ty| Arc::ptr_eq(ty, candidate)))
            })
            .cloned()
            .ok_or_else(|| {
                ExcType::type_error("Cannot create a consistent method resolution order (MRO)")
            })?;

        for lin in &mut linearizations {
            if Arc::ptr_eq(&lin[0], &head) {
                lin.remove(0);
            }
        }
        result.push(head);
    }
}

impl PyTrait for PyType {
    fn py_type(&self) -> TypeRef {
        builtins().type_.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(format!("<class '{}'>", self.name))
    }

    fn py_getattr(&self, _this: &Value, name: &str) -> RunResult<Value> {
        match name {
            "__name__" => Ok(Value::str(self.name.as_str())),
            "__bases__" => Ok(Value::tuple(self.bases.iter().map(|ty| Value::from_arc(ty.clone())))),
            "__mro__" => {
                let me = self.type_ref()?;
                Ok(Value::tuple(
                    std::iter::once(me)
                        .chain(self.mro.iter().cloned())
                        .map(|ty| Value::from_arc(ty)),
                ))
            }
            "__dict__" => Ok(Value::new(mapping_proxy::MappingProxy::new(self.type_ref()?))),
            "__class__" => Ok(Value::from_arc(self.py_type())),
            _ => self
                .lookup(name)
                .ok_or_else(|| ExcType::attribute_error_type(&self.name, name)),
        }
    }

    fn py_setattr(&self, name: &str, value: Value) -> RunResult<()> {
        self.set_attr(name, value)
    }

    fn py_dir(&self) -> RunResult<Vec<String>> {
        Ok(self.dir())
    }

    fn py_delattr(&self, name: &str) -> RunResult<()> {
        self.del_attr(name)
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        if let Some(constructor) = &self.constructor {
            return constructor(args);
        }
        match self.kind {
            TypeKind::Class => Instance::create(self.type_ref()?, args),
            _ => Err(ExcType::type_error(format!("cannot create '{}' instances", self.name))),
        }
    }
}

/// Type objects of the builtin types.
pub struct Builtins {
    pub object: TypeRef,
    pub type_: TypeRef,
    pub none: TypeRef,
    pub not_implemented: TypeRef,
    pub int: TypeRef,
    pub bool: TypeRef,
    pub float: TypeRef,
    pub complex: TypeRef,
    pub str: TypeRef,
    pub bytes: TypeRef,
    pub list: TypeRef,
    pub tuple: TypeRef,
    pub dict: TypeRef,
    pub iterator: TypeRef,
    pub function: TypeRef,
    pub method: TypeRef,
    pub slot_wrapper: TypeRef,
    pub method_wrapper: TypeRef,
    pub property: TypeRef,
    pub mapping_proxy: TypeRef,
    exceptions: AHashMap<ExcType, TypeRef>,
}

impl Builtins {
    fn build() -> Self {
        let object = PyType::builtin(
            "object",
            &[],
            singletons::OBJECT_SLOTS,
            Vec::new(),
            Some(native(singletons::construct_object)),
        );
        let with_object = [&object];
        let type_ = PyType::builtin(
            "type",
            &with_object,
            &[Dunder::Repr, Dunder::Call, Dunder::Getattribute, Dunder::Setattr, Dunder::Delattr, Dunder::Dir],
            Vec::new(),
            Some(native(construct_type)),
        );
        let none = PyType::builtin("NoneType", &with_object, &[Dunder::Repr, Dunder::Bool], Vec::new(), None);
        let not_implemented = PyType::builtin("NotImplementedType", &with_object, &[Dunder::Repr], Vec::new(), None);
        let int = PyType::builtin("int", &with_object, int::INT_SLOTS, Vec::new(), Some(native(int::construct)));
        let bool = PyType::builtin("bool", &[&int], int::BOOL_SLOTS, Vec::new(), Some(native(int::construct_bool)));
        let float = PyType::builtin(
            "float",
            &with_object,
            float::FLOAT_SLOTS,
            Vec::new(),
            Some(native(float::construct)),
        );
        let complex = PyType::builtin(
            "complex",
            &with_object,
            complex::COMPLEX_SLOTS,
            Vec::new(),
            Some(native(complex::construct)),
        );
        let str = PyType::builtin("str", &with_object, str::STR_SLOTS, str::methods(), Some(native(str::construct)));
        let bytes = PyType::builtin(
            "bytes",
            &with_object,
            bytes::BYTES_SLOTS,
            bytes::methods(),
            Some(native(bytes::construct)),
        );
        let list = PyType::builtin(
            "list",
            &with_object,
            list::LIST_SLOTS,
            list::methods(),
            Some(native(list::construct)),
        );
        let tuple = PyType::builtin(
            "tuple",
            &with_object,
            tuple::TUPLE_SLOTS,
            tuple::methods(),
            Some(native(tuple::construct)),
        );
        let dict = PyType::builtin(
            "dict",
            &with_object,
            dict::DICT_SLOTS,
            dict::methods(),
            Some(native(dict::construct)),
        );
        for unhashable in [&list, &dict] {
            unhashable
                .namespace
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(Dunder::Hash.as_str().to_owned(), Value::none());
        }
        let iterator = PyType::builtin("iterator", &with_object, iter::ITER_SLOTS, Vec::new(), None);
        let function = PyType::builtin("function", &with_object, function::FUNCTION_SLOTS, Vec::new(), None);
        let method = PyType::builtin("method", &with_object, function::METHOD_SLOTS, Vec::new(), None);
        let slot_wrapper = PyType::builtin(
            "wrapper_descriptor",
            &with_object,
            function::FUNCTION_SLOTS,
            Vec::new(),
            None,
        );
        let method_wrapper = PyType::builtin("method-wrapper", &with_object, function::METHOD_SLOTS, Vec::new(), None);
        let property = PyType::builtin(
            "property",
            &with_object,
            function::PROPERTY_SLOTS,
            Vec::new(),
            Some(native(function::construct_property)),
        );
        let mapping_proxy = PyType::builtin(
            "mappingproxy",
            &with_object,
            mapping_proxy::MAPPING_PROXY_SLOTS,
            mapping_proxy::methods(),
            None,
        );

        let mut exceptions: AHashMap<ExcType, TypeRef> = AHashMap::new();
        for exc_type in ExcType::iter() {
            exception_type(exc_type, &object, &mut exceptions);
        }

        Self {
            object,
            type_,
            none,
            not_implemented,
            int,
            bool,
            float,
            complex,
            str,
            bytes,
            list,
            tuple,
            dict,
            iterator,
            function,
            method,
            slot_wrapper,
            method_wrapper,
            property,
            mapping_proxy,
            exceptions,
        }
    }

    /// The type object of an exception type.
    #[must_use]
    pub fn exception(&self, exc_type: ExcType) -> TypeRef {
        match self.exceptions.get(&exc_type) {
            Some(ty) => ty.clone(),
            // every variant is registered at build time
            None => self.object.clone(),
        }
    }
}

/// Builds (or fetches) the type for `exc_type`, building its parents first.
fn exception_type(exc_type: ExcType, object: &TypeRef, built: &mut AHashMap<ExcType, TypeRef>) -> TypeRef {
    if let Some(ty) = built.get(&exc_type) {
        return ty.clone();
    }
    let parent = match exc_type.parent() {
        Some(parent) => exception_type(parent, object, built),
        None => object.clone(),
    };
    let ty = PyType::exception(exc_type, &parent);
    built.insert(exc_type, ty.clone());
    ty
}

/// `type(x)` with one argument.
fn construct_type(args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("type")?;
    Ok(Value::from_arc(value.py_type()))
}

static BUILTINS: LazyLock<Builtins> = LazyLock::new(Builtins::build);

/// The builtin type registry.
pub fn builtins() -> &'static Builtins {
    &BUILTINS
}

/// Wraps a tuple of types for `isinstance(x, (a, b))` style checks.
pub(crate) fn types_from_value(value: &Value) -> RunResult<Vec<TypeRef>> {
    if let Some(ty) = value.downcast_arc::<PyType>() {
        return Ok(vec![ty]);
    }
    if let Some(tuple) = value.downcast_ref::<Tuple>() {
        let mut types = Vec::new();
        for item in tuple.items() {
            types.extend(types_from_value(item)?);
        }
        return Ok(types);
    }
    Err(ExcType::type_error(
        "isinstance() arg 2 must be a type or tuple of types",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn builtin_hierarchy() {
        let b = builtins();
        assert!(b.bool.is_subclass_of(&b.int));
        assert!(b.int.is_subclass_of(&b.object));
        assert!(!b.int.is_subclass_of(&b.bool));
        assert!(b.exception(ExcType::MaskedKeyError).is_subclass_of(&b.exception(ExcType::KeyError)));
    }

    #[test]
    fn slots_drive_attribute_presence() {
        let b = builtins();
        assert!(b.int.has_attr("__add__"));
        assert!(!b.int.has_attr("__iadd__"));
        assert!(b.list.has_attr("__iadd__"));
        assert!(b.list.has_attr("append"));
        assert!(b.list.lookup("__hash__").is_some_and(|v| v.is_none()));
    }

    #[test]
    fn type_of_type_is_type() {
        let b = builtins();
        assert!(Arc::ptr_eq(&b.type_.py_type(), &b.type_));
        assert_eq!(ops::repr(&Value::from_arc(b.int.clone())).unwrap(), "<class 'int'>");
        assert_eq!(format!("{:?}", b.int), "<class 'int'>");
    }

    #[test]
    fn dir_of_a_class_lists_its_namespace() {
        let mut namespace = IndexMap::new();
        namespace.insert("audit".to_owned(), Value::int(1));
        let class = PyType::class("Ledger", Vec::new(), namespace).unwrap();
        let names = ops::dir(&Value::from_arc(class)).unwrap();
        assert!(names.contains(&"audit".to_owned()));
        assert!(names.contains(&"__repr__".to_owned()));
    }

    #[test]
    fn bound_proxy_slots_track_the_wrapped_class() {
        let class = PyType::class("Plain", Vec::new(), IndexMap::new()).unwrap();
        let spec = PyType::specialization("spec", &builtins().object, native(|_| Ok(Value::none())));
        let bound = PyType::bound_proxy(&spec, &class);
        assert!(!bound.has_attr("__len__"));

        class.set_attr("__len__", Value::int(0)).unwrap();
        assert!(bound.has_attr("__len__"));
        assert!(bound.dir().contains(&"__len__".to_owned()));

        class.set_attr("__len__", Value::none()).unwrap();
        assert!(!bound.has_attr("__len__"));
    }
}
