//! Specializations: proxy types that handle some names themselves.
//!
//! A [`Specialization`] is a named set of [`Declaration`]s layered on a parent
//! specialization (ultimately [`base`], the plain forwarding proxy). Declarations marked
//! direct are resolved on the proxy when accessed by name; every other name is looked up on
//! the wrapped object. A declaration named after a special method (`__repr__`,
//! `__getattribute__`, ...) also takes over that operator slot, direct or not, the way a
//! method on a host class does.
//!
//! Binding a specialization to a wrapped object goes through a process-wide cache of
//! derived types, one per (specialization, wrapped type) pair. The derived type is what
//! `type(proxy)` returns and what makes `isinstance(proxy, WrappedType)` hold.

use std::{
    str::FromStr,
    sync::{Arc, LazyLock, Mutex, PoisonError, Weak},
};

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    args::ArgValues,
    dunder::Dunder,
    exception::{ExcType, RunResult},
    ops,
    proxy::{Proxy, state::ProxyState},
    types::{PyTrait, PyType, TypeRef, builtins, native},
    value::Value,
};

/// Body of a declared method. Receives the proxy and the call's arguments.
pub type DirectFn = Arc<dyn Fn(&Receiver<'_>, ArgValues) -> RunResult<Value> + Send + Sync>;
/// Getter of a declared property.
pub type GetterFn = Arc<dyn Fn(&Receiver<'_>) -> RunResult<Value> + Send + Sync>;
/// Setter of a declared property.
pub type SetterFn = Arc<dyn Fn(&Receiver<'_>, Value) -> RunResult<()> + Send + Sync>;
/// Runs once when a proxy is bound, with the extra construction arguments.
pub type BindHook = Arc<dyn Fn(&Receiver<'_>, ArgValues) -> RunResult<()> + Send + Sync>;

#[derive(Clone)]
pub enum DeclarationKind {
    Method(DirectFn),
    Property { getter: GetterFn, setter: Option<SetterFn> },
    /// A class-level default. Assignments go to the proxy state and shadow it.
    Attr(Value),
}

/// One named member of a specialization.
#[derive(Clone)]
pub struct Declaration {
    name: String,
    kind: DeclarationKind,
    direct: bool,
}

impl Declaration {
    pub fn method(
        name: impl Into<String>,
        body: impl Fn(&Receiver<'_>, ArgValues) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Method(Arc::new(body)),
            direct: false,
        }
    }

    pub fn property(
        name: impl Into<String>,
        getter: impl Fn(&Receiver<'_>) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Property {
                getter: Arc::new(getter),
                setter: None,
            },
            direct: false,
        }
    }

    pub fn attr(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Attr(value.into()),
            direct: false,
        }
    }

    /// Adds a setter. Has no effect on declarations that are not properties.
    #[must_use]
    pub fn with_setter(mut self, setter: impl Fn(&Receiver<'_>, Value) -> RunResult<()> + Send + Sync + 'static) -> Self {
        if let DeclarationKind::Property { setter: slot, .. } = &mut self.kind {
            *slot = Some(Arc::new(setter));
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &DeclarationKind {
        &self.kind
    }

    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.direct
    }
}

/// Marks a declaration as resolved on the proxy instead of the wrapped object.
#[must_use]
pub fn mark_direct(declaration: Declaration) -> Declaration {
    debug!(name = %declaration.name, "declaration marked direct");
    Declaration {
        direct: true,
        ..declaration
    }
}

/// Older name of [`mark_direct`].
#[must_use]
pub fn unproxied(declaration: Declaration) -> Declaration {
    mark_direct(declaration)
}

/// A proxy type: its declarations, its direct names and its type object.
pub struct Specialization {
    name: String,
    parent: Option<Arc<Self>>,
    declarations: IndexMap<String, Declaration>,
    /// Own direct names plus every ancestor's.
    direct: AHashSet<String>,
    on_bind: Option<BindHook>,
    py_type: TypeRef,
}

static BASE: LazyLock<Arc<Specialization>> =
    LazyLock::new(|| Specialization::create("proxy".to_owned(), None, IndexMap::new(), None));

/// Derived types by (specialization type uid, wrapped type uid).
static BOUND_TYPES: LazyLock<Mutex<AHashMap<(u64, u64), TypeRef>>> = LazyLock::new(Mutex::default);

/// The plain forwarding proxy every specialization derives from.
#[must_use]
pub fn base() -> &'static Arc<Specialization> {
    &BASE
}

/// Defines a specialization of `base` with the given declarations.
pub fn make_specialization(
    name: &str,
    base: &Arc<Specialization>,
    declarations: impl IntoIterator<Item = Declaration>,
) -> Arc<Specialization> {
    declarations
        .into_iter()
        .fold(Specialization::builder(name).extends(base), SpecializationBuilder::declare)
        .build()
}

impl Specialization {
    /// Starts a specialization deriving from [`base`].
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SpecializationBuilder {
        SpecializationBuilder {
            name: name.into(),
            parent: base().clone(),
            declarations: IndexMap::new(),
            on_bind: None,
        }
    }

    fn create(
        name: String,
        parent: Option<Arc<Self>>,
        declarations: IndexMap<String, Declaration>,
        on_bind: Option<BindHook>,
    ) -> Arc<Self> {
        let mut direct = parent.as_ref().map(|parent| parent.direct.clone()).unwrap_or_default();
        direct.extend(
            declarations
                .values()
                .filter(|decl| decl.direct)
                .map(|decl| decl.name.clone()),
        );
        let base_type = parent
            .as_ref()
            .map_or_else(|| builtins().object.clone(), |parent| parent.py_type.clone());

        let spec = Arc::new_cyclic(|me: &Weak<Self>| {
            let me = me.clone();
            let constructor = native(move |args| {
                let spec = me
                    .upgrade()
                    .ok_or_else(|| ExcType::runtime_error("proxy specialization has been dropped"))?;
                let (wrapped, rest) = args.split_first(&spec.name)?;
                spec.bind(wrapped, rest)
            });
            Self {
                py_type: PyType::specialization(&name, &base_type, constructor),
                name,
                parent,
                declarations,
                direct,
                on_bind,
            }
        });
        debug!(
            specialization = %spec.name,
            direct = ?spec.direct_names(),
            "created proxy specialization"
        );
        spec
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// The type object of this specialization (the base of all its bound types).
    #[must_use]
    pub fn py_type(&self) -> &TypeRef {
        &self.py_type
    }

    /// Direct names, own and inherited, sorted.
    #[must_use]
    pub fn direct_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.direct.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn is_direct(&self, name: &str) -> bool {
        self.direct.contains(name)
    }

    /// A declaration made by this specialization itself.
    #[must_use]
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    /// This specialization followed by its ancestors.
    fn lineage(self: &Arc<Self>) -> impl Iterator<Item = &Arc<Self>> {
        std::iter::successors(Some(self), |spec| spec.parent.as_ref())
    }

    /// The nearest declaration of `name`, with the specialization that made it.
    pub(crate) fn resolve(self: &Arc<Self>, name: &str) -> Option<(&Arc<Self>, &Declaration)> {
        self.lineage()
            .find_map(|spec| spec.declarations.get(name).map(|decl| (spec, decl)))
    }

    /// The nearest method declaration of `name`.
    pub(crate) fn resolve_method(self: &Arc<Self>, name: &str) -> Option<(&Arc<Self>, &DirectFn)> {
        self.lineage().find_map(|spec| match spec.declarations.get(name) {
            Some(Declaration {
                kind: DeclarationKind::Method(body),
                ..
            }) => Some((spec, body)),
            _ => None,
        })
    }

    fn bind_hook(self: &Arc<Self>) -> Option<(&Arc<Self>, &BindHook)> {
        self.lineage()
            .find_map(|spec| spec.on_bind.as_ref().map(|hook| (spec, hook)))
    }

    /// Wraps `wrapped` in a new proxy of this specialization.
    ///
    /// `args` go to the nearest construction hook. Without one, extra arguments are an error.
    pub fn bind(self: &Arc<Self>, wrapped: Value, args: ArgValues) -> RunResult<Value> {
        let bound = self.bound_type_of(&wrapped.py_type());
        let proxy = Proxy::create(self.clone(), bound, wrapped, Arc::new(ProxyState::new()));
        let this = Value::from_arc(proxy.clone());
        match self.bind_hook() {
            Some((owner, hook)) => hook(&Receiver::new(&this, &proxy, owner), args)?,
            None if args.count() > 0 || args.has_kwargs() => {
                return Err(ExcType::type_error(format!(
                    "{}() takes exactly one argument ({} given)",
                    self.name,
                    args.count() + 1
                )));
            }
            None => {}
        }
        Ok(this)
    }

    /// The derived type this specialization uses for objects of type `wrapped`.
    ///
    /// Lets callers specialize ahead of time for a known type. Raises `InvalidWrappedType`
    /// when `wrapped` is not a type object.
    pub fn bound_type(&self, wrapped: &Value) -> RunResult<TypeRef> {
        let wrapped_type = wrapped
            .downcast_arc::<PyType>()
            .ok_or_else(|| ExcType::invalid_wrapped_type(wrapped.type_name()))?;
        Ok(self.bound_type_of(&wrapped_type))
    }

    pub(crate) fn bound_type_of(&self, wrapped: &TypeRef) -> TypeRef {
        let key = (self.py_type.uid(), wrapped.uid());
        let mut cache = BOUND_TYPES.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(key)
            .or_insert_with(|| {
                debug!(
                    specialization = %self.name,
                    wrapped = wrapped.name(),
                    "bound type cache miss"
                );
                PyType::bound_proxy(&self.py_type, wrapped)
            })
            .clone()
    }
}

/// Builds a [`Specialization`].
pub struct SpecializationBuilder {
    name: String,
    parent: Arc<Specialization>,
    declarations: IndexMap<String, Declaration>,
    on_bind: Option<BindHook>,
}

impl SpecializationBuilder {
    /// Derives from `parent` instead of the base proxy.
    #[must_use]
    pub fn extends(mut self, parent: &Arc<Specialization>) -> Self {
        self.parent = parent.clone();
        self
    }

    /// Adds a declaration. A later declaration of the same name replaces an earlier one.
    #[must_use]
    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.insert(declaration.name.clone(), declaration);
        self
    }

    #[must_use]
    pub fn method(
        self,
        name: &str,
        body: impl Fn(&Receiver<'_>, ArgValues) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.declare(Declaration::method(name, body))
    }

    #[must_use]
    pub fn direct_method(
        self,
        name: &str,
        body: impl Fn(&Receiver<'_>, ArgValues) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.declare(mark_direct(Declaration::method(name, body)))
    }

    #[must_use]
    pub fn direct_property(
        self,
        name: &str,
        getter: impl Fn(&Receiver<'_>) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.declare(mark_direct(Declaration::property(name, getter)))
    }

    #[must_use]
    pub fn on_bind(mut self, hook: impl Fn(&Receiver<'_>, ArgValues) -> RunResult<()> + Send + Sync + 'static) -> Self {
        self.on_bind = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Specialization> {
        Specialization::create(self.name, Some(self.parent), self.declarations, self.on_bind)
    }
}

/// What a declared body sees: the proxy it runs on and the specialization it belongs to.
#[derive(Clone, Copy)]
pub struct Receiver<'a> {
    this: &'a Value,
    proxy: &'a Proxy,
    owner: &'a Arc<Specialization>,
}

impl<'a> Receiver<'a> {
    pub(crate) fn new(this: &'a Value, proxy: &'a Proxy, owner: &'a Arc<Specialization>) -> Self {
        Self { this, proxy, owner }
    }

    /// The proxy itself.
    #[must_use]
    pub fn this(&self) -> &'a Value {
        self.this
    }

    /// The wrapped object.
    #[must_use]
    pub fn original(&self) -> &'a Value {
        self.proxy.original()
    }

    #[must_use]
    pub fn state(&self) -> &'a ProxyState {
        self.proxy.state()
    }

    /// The specialization that declared the running body.
    #[must_use]
    pub fn specialization(&self) -> &'a Arc<Specialization> {
        self.owner
    }

    /// Calls `name` as the parent specialization would.
    ///
    /// Resolves the nearest ancestor method declaration. Without one, special methods get
    /// the base proxy behaviour (forwarding, or the core attribute and in-place rules) and
    /// other names are called on the wrapped object.
    pub fn super_call(&self, name: &str, args: ArgValues) -> RunResult<Value> {
        let inherited = self.owner.parent.as_ref().and_then(|parent| parent.resolve_method(name));
        if let Some((owner, body)) = inherited {
            return body(&Receiver { owner, ..*self }, args);
        }
        match Dunder::from_str(name) {
            Ok(dunder) => self.proxy.forward(self.this, dunder, args),
            Err(_) => ops::call_method(self.original(), name, args),
        }
    }

    /// `super().__getattribute__(name)`.
    pub fn super_getattr(&self, name: &str) -> RunResult<Value> {
        self.super_call(Dunder::Getattribute.as_str(), ArgValues::One(Value::str(name)))
    }
}

/// A declared method looked up by name on a proxy, bound to that proxy.
pub(crate) struct DirectMethod {
    name: String,
    body: DirectFn,
    owner: Arc<Specialization>,
    this: Value,
}

impl DirectMethod {
    pub(crate) fn new(name: &str, body: DirectFn, owner: Arc<Specialization>, this: Value) -> Self {
        Self {
            name: name.to_owned(),
            body,
            owner,
            this,
        }
    }
}

impl PyTrait for DirectMethod {
    fn py_type(&self) -> TypeRef {
        builtins().method.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(format!(
            "<bound method {}.{} of {}>",
            self.owner.name,
            self.name,
            ops::repr(&self.this)?
        ))
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match name {
            "__name__" => Ok(Value::str(self.name.as_str())),
            "__self__" => Ok(self.this.clone()),
            _ => ops::generic_getattr(this, name),
        }
    }

    fn py_call(&self, args: ArgValues) -> RunResult<Value> {
        let proxy = self
            .this
            .downcast_ref::<Proxy>()
            .ok_or_else(|| ExcType::type_error_not_a_proxy(&self.name, self.this.type_name()))?;
        (self.body)(&Receiver::new(&self.this, proxy, &self.owner), args)
    }
}
