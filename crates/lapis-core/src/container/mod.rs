//! Type-directed dependency container.
//!
//! The [`Container`] maps an abstract, identified by its [`TypeId`], to either
//! a stored instance or a factory. Bindings are written during startup and
//! read concurrently while serving; [`Container::freeze`] rejects any later
//! [`bind`](Container::bind).
//!
//! # Example
//!
//! ```rust,ignore
//! use lapis_core::container::{Abstract, Concrete, Container};
//!
//! let container = Container::new();
//! container.bind(
//!     Abstract::contract::<dyn Greeter>(),
//!     Concrete::instance::<dyn Greeter>(Arc::new(English)),
//! )?;
//!
//! let greeter = container.resolve::<dyn Greeter>()?;
//! ```
//!
//! # Rebinding
//!
//! Binding an abstract twice keeps the last concrete and logs a warning.

mod binding;
mod scope;

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

pub use binding::{Abstract, AbstractKind, Args, Concrete};
pub use scope::{Injectable, Scope};

use crate::error::{ContainerError, ContainerResult};
use binding::{Binding, ConcreteKind, erase_factory};

/// Default limit on nested factory evaluations within one resolution.
pub const DEFAULT_MAX_DEPTH: usize = 32;

type Injector = fn(&mut dyn Any, &mut Scope<'_>) -> ContainerResult<()>;

struct Entry {
    name: &'static str,
    binding: Binding,
}

/// The binding registry shared by every request.
pub struct Container {
    bindings: RwLock<HashMap<TypeId, Entry>>,
    injectors: RwLock<HashMap<TypeId, Injector>>,
    frozen: AtomicBool,
    max_depth: usize,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Creates a container whose resolutions may nest at most `max_depth`
    /// factories deep.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            injectors: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    // ─── Binding ─────────────────────────────────────────────────────────────

    /// Binds `concrete` to `abstract_`.
    ///
    /// # Errors
    ///
    /// - [`ContainerError::InvalidConcrete`] for a [`Concrete::value`].
    /// - [`ContainerError::NotImplemented`] when a contract abstract receives a
    ///   concrete for another type.
    /// - [`ContainerError::InvalidStructConcrete`] when a record abstract
    ///   receives anything but that record.
    /// - [`ContainerError::Frozen`] after [`freeze`](Self::freeze).
    pub fn bind(&self, abstract_: Abstract, concrete: Concrete) -> ContainerResult<()> {
        let provides = concrete.provides();
        let concrete_name = concrete.name();
        let binding = match concrete.kind {
            ConcreteKind::Value => {
                return Err(ContainerError::InvalidConcrete {
                    abstract_name: abstract_.name(),
                });
            }
            _ if provides != abstract_.id() => {
                return Err(match abstract_.kind() {
                    AbstractKind::Contract => ContainerError::NotImplemented {
                        contract: abstract_.name(),
                        concrete: concrete_name,
                    },
                    AbstractKind::Record => ContainerError::InvalidStructConcrete {
                        record: abstract_.name(),
                        concrete: concrete_name,
                    },
                });
            }
            ConcreteKind::Instance(value) => Binding::Instance(value),
            ConcreteKind::Factory { arity, build } => Binding::Factory { arity, build },
        };

        self.insert(abstract_.id(), abstract_.name(), binding)
    }

    /// Binds a stored instance under its own type.
    pub fn singleton<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) -> ContainerResult<()> {
        let binding = Binding::Instance(Arc::new(value));
        self.insert(TypeId::of::<T>(), type_name::<T>(), binding)
    }

    /// Binds a factory of the given arity under `T`.
    pub fn factory<T, F>(&self, arity: usize, f: F) -> ContainerResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Scope<'_>, Args) -> ContainerResult<Arc<T>> + Send + Sync + 'static,
    {
        let build = erase_factory::<T, _>(move |scope, args| f(scope, args).map(Some));
        self.insert(TypeId::of::<T>(), type_name::<T>(), Binding::Factory { arity, build })
    }

    /// Binds `A` to a fresh, wired `C` on every resolution.
    ///
    /// `upcast` turns the built component into the abstract, e.g.
    /// `|c| c as Arc<dyn Mailer>`; for a record abstract pass `|c| c`.
    /// The component is also registered for [`inject_any`](Self::inject_any).
    pub fn injectable<A, C>(&self, upcast: fn(Arc<C>) -> Arc<A>) -> ContainerResult<()>
    where
        A: ?Sized + Send + Sync + 'static,
        C: Injectable + Default,
    {
        self.register_injectable::<C>();
        self.factory::<A, _>(0, move |scope, _| {
            let mut component = C::default();
            component.inject(scope)?;
            Ok(upcast(Arc::new(component)))
        })
    }

    /// Makes `T` a valid target for [`inject_any`](Self::inject_any).
    pub fn register_injectable<T: Injectable>(&self) {
        fn inject_erased<T: Injectable>(
            target: &mut dyn Any,
            scope: &mut Scope<'_>,
        ) -> ContainerResult<()> {
            match target.downcast_mut::<T>() {
                Some(target) => target.inject(scope),
                None => Err(ContainerError::InvalidTargetType {
                    target: type_name::<T>(),
                }),
            }
        }

        self.injectors
            .write()
            .insert(TypeId::of::<T>(), inject_erased::<T>);
    }

    fn insert(&self, id: TypeId, name: &'static str, binding: Binding) -> ContainerResult<()> {
        if self.is_frozen() {
            return Err(ContainerError::Frozen {
                abstract_name: name,
            });
        }

        let previous = self.bindings.write().insert(id, Entry { name, binding });
        if previous.is_some() {
            warn!(abstract_type = name, "Abstract rebound, last registration wins");
        } else {
            debug!(abstract_type = name, "Abstract bound");
        }
        Ok(())
    }

    pub(crate) fn binding(&self, id: TypeId) -> Option<Binding> {
        self.bindings.read().get(&id).map(|entry| entry.binding.clone())
    }

    // ─── Resolution ──────────────────────────────────────────────────────────

    /// Opens a fresh resolution scope.
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(self)
    }

    /// Resolves `T` with no factory arguments.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> ContainerResult<Arc<T>> {
        self.scope().resolve::<T>()
    }

    /// Resolves `T`, passing `args` to its factory.
    ///
    /// See [`Scope::resolve_with`] for the error cases.
    pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        args: Args,
    ) -> ContainerResult<Arc<T>> {
        self.scope().resolve_with::<T>(args)
    }

    // ─── Injection ───────────────────────────────────────────────────────────

    /// Wires every declared dependency of `target`.
    ///
    /// Dependencies bound through [`injectable`](Self::injectable) are wired
    /// themselves before assignment, so a whole acyclic graph is populated in
    /// one call. The first failure aborts the injection.
    pub fn inject<T: Injectable>(&self, target: &mut T) -> ContainerResult<()> {
        target.inject(&mut self.scope())
    }

    /// Builds a default `T` and wires it.
    pub fn build<T: Injectable + Default>(&self) -> ContainerResult<T> {
        let mut target = T::default();
        self.inject(&mut target)?;
        Ok(target)
    }

    /// Wires a type-erased target.
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidTargetType`] unless the target's type was
    /// registered with [`register_injectable`](Self::register_injectable).
    pub fn inject_any(&self, target: &mut dyn Any) -> ContainerResult<()> {
        let id = (*target).type_id();
        let injector = self.injectors.read().get(&id).copied().ok_or(
            ContainerError::InvalidTargetType {
                target: "dyn Any",
            },
        )?;
        injector(target, &mut self.scope())
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Rejects every further `bind`.
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::AcqRel) {
            info!(bindings = self.len(), "Container frozen");
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Returns `true` if something is bound to `T`.
    pub fn is_bound<T: ?Sized + 'static>(&self) -> bool {
        self.bindings.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Names of every bound abstract, sorted.
    pub fn bound_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.bindings.read().values().map(|e| e.name).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.len())
            .field("frozen", &self.is_frozen())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
