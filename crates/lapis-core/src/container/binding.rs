//! Binding keys, concretes and factory arguments.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use super::scope::Scope;
use crate::error::{ContainerError, ContainerResult};

/// A resolved value as stored in the container.
///
/// The inner value is always an `Arc<T>` for the abstract `T`, so a contract
/// such as `dyn Greeter` is stored as `Arc<Arc<dyn Greeter>>`.
pub(crate) type ServiceArc = Arc<dyn Any + Send + Sync>;

/// A type-erased factory.
pub(crate) type FactoryFn =
    Arc<dyn Fn(&mut Scope<'_>, Args) -> ContainerResult<Option<ServiceArc>> + Send + Sync>;

// =============================================================================
// Abstract
// =============================================================================

/// How an abstract constrains the concretes that may be bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbstractKind {
    /// A trait object such as `dyn Greeter`.
    Contract,
    /// A plain data record; only the exact same type may be bound.
    Record,
}

/// The key a binding is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abstract {
    id: TypeId,
    name: &'static str,
    kind: AbstractKind,
}

impl Abstract {
    /// Describes a contract abstract, usually `dyn Trait`.
    pub fn contract<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: AbstractKind::Contract,
        }
    }

    /// Describes a record abstract.
    pub fn record<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: AbstractKind::Record,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> AbstractKind {
        self.kind
    }
}

// =============================================================================
// Concrete
// =============================================================================

pub(crate) enum ConcreteKind {
    Instance(ServiceArc),
    Factory { arity: usize, build: FactoryFn },
    Value,
}

/// What an abstract is bound to.
///
/// Only [`instance`](Self::instance) and [`factory`](Self::factory) concretes
/// are accepted by [`Container::bind`](super::Container::bind); a
/// [`value`](Self::value) concrete always fails with
/// [`ContainerError::InvalidConcrete`].
pub struct Concrete {
    provides: TypeId,
    name: &'static str,
    pub(crate) kind: ConcreteKind,
}

impl Concrete {
    /// A stored instance, returned by reference on every resolution.
    pub fn instance<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            provides: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: ConcreteKind::Instance(Arc::new(value)),
        }
    }

    /// A factory invoked on every resolution with exactly `arity` arguments.
    ///
    /// Returning `Ok(None)` reports that the factory produced nothing, which
    /// surfaces as [`ContainerError::NonValuesReturned`].
    pub fn factory<T, F>(arity: usize, f: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Scope<'_>, Args) -> ContainerResult<Option<Arc<T>>> + Send + Sync + 'static,
    {
        Self {
            provides: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: ConcreteKind::Factory {
                arity,
                build: erase_factory(f),
            },
        }
    }

    /// An opaque value that is neither an instance nor a factory.
    pub fn value<V: 'static>(_value: V) -> Self {
        Self {
            provides: TypeId::of::<V>(),
            name: type_name::<V>(),
            kind: ConcreteKind::Value,
        }
    }

    pub(crate) fn provides(&self) -> TypeId {
        self.provides
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ConcreteKind::Instance(_) => "instance",
            ConcreteKind::Factory { .. } => "factory",
            ConcreteKind::Value => "value",
        };
        f.debug_struct("Concrete")
            .field("provides", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

pub(crate) fn erase_factory<T, F>(f: F) -> FactoryFn
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&mut Scope<'_>, Args) -> ContainerResult<Option<Arc<T>>> + Send + Sync + 'static,
{
    Arc::new(move |scope, args| Ok(f(scope, args)?.map(|value| Arc::new(value) as ServiceArc)))
}

/// A validated binding held by the container.
#[derive(Clone)]
pub(crate) enum Binding {
    Instance(ServiceArc),
    Factory { arity: usize, build: FactoryFn },
}

// =============================================================================
// Args
// =============================================================================

/// Positional arguments supplied to a factory.
#[derive(Default)]
pub struct Args {
    values: Vec<Box<dyn Any + Send + Sync>>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument (builder pattern).
    pub fn with<V: Any + Send + Sync>(mut self, value: V) -> Self {
        self.values.push(Box::new(value));
        self
    }

    /// Appends an argument.
    pub fn push<V: Any + Send + Sync>(&mut self, value: V) {
        self.values.push(Box::new(value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrows the argument at `index` as a `V`.
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidArgument`] when the index is out of range or
    /// the argument has another type.
    pub fn get<V: Any>(&self, index: usize) -> ContainerResult<&V> {
        self.values
            .get(index)
            .and_then(|value| value.downcast_ref::<V>())
            .ok_or(ContainerError::InvalidArgument {
                index,
                expected: type_name::<V>(),
            })
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args").field("len", &self.values.len()).finish()
    }
}
