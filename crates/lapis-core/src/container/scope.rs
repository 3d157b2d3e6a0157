//! Resolution scope and the [`Injectable`] contract.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use tracing::trace;

use super::Container;
use super::binding::{Args, Binding};
use crate::error::{ContainerError, ContainerResult};

/// A component whose dependencies are wired by the container.
///
/// Implementations assign every declared dependency from the scope; fields
/// that are not dependencies are left untouched. Most components derive this
/// with `#[derive(Injectable)]` and mark dependencies with `#[inject]`.
///
/// ```rust,ignore
/// #[derive(Default, Injectable)]
/// struct Signup {
///     #[inject]
///     mailer: Option<Arc<dyn Mailer>>,
///     attempts: u32,
/// }
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// Resolves and assigns every declared dependency.
    fn inject(&mut self, scope: &mut Scope<'_>) -> ContainerResult<()>;
}

/// One resolution pass through the container.
///
/// A scope tracks the abstracts currently being built so nested factory and
/// injection calls can detect cycles and bound their depth. Every public
/// entry point of [`Container`] opens a fresh scope; factories receive the
/// scope they run in and must resolve their own dependencies through it.
pub struct Scope<'a> {
    container: &'a Container,
    stack: Vec<(TypeId, &'static str)>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self {
            container,
            stack: Vec::new(),
        }
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Number of factories currently being evaluated.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Resolves `T` with no factory arguments.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&mut self) -> ContainerResult<Arc<T>> {
        self.resolve_with::<T>(Args::new())
    }

    /// Resolves `T`, passing `args` to its factory.
    ///
    /// Stored instances ignore `args` and are returned as-is.
    ///
    /// # Errors
    ///
    /// - [`ContainerError::NotBound`] when nothing is bound to `T`.
    /// - [`ContainerError::InsufficientArguments`] on an arity mismatch.
    /// - [`ContainerError::NonValuesReturned`] when the factory produced nothing.
    /// - [`ContainerError::CyclicDependency`] when `T` is already being built.
    /// - [`ContainerError::DepthExceeded`] past the container's depth limit.
    pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        args: Args,
    ) -> ContainerResult<Arc<T>> {
        let id = TypeId::of::<T>();
        let name = type_name::<T>();

        if self.stack.iter().any(|(seen, _)| *seen == id) {
            let chain = self
                .stack
                .iter()
                .map(|(_, seen)| *seen)
                .chain(std::iter::once(name))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ContainerError::CyclicDependency { chain });
        }

        let binding = self
            .container
            .binding(id)
            .ok_or(ContainerError::NotBound {
                abstract_name: name,
            })?;

        let value = match binding {
            Binding::Instance(value) => value,
            Binding::Factory { arity, build } => {
                if args.len() != arity {
                    return Err(ContainerError::InsufficientArguments {
                        abstract_name: name,
                        expected: arity,
                        got: args.len(),
                    });
                }
                let limit = self.container.max_depth();
                if self.stack.len() >= limit {
                    return Err(ContainerError::DepthExceeded {
                        abstract_name: name,
                        limit,
                    });
                }

                trace!(abstract_type = name, depth = self.stack.len(), "Invoking factory");
                self.stack.push((id, name));
                let produced = build(&mut *self, args);
                self.stack.pop();

                produced?.ok_or(ContainerError::NonValuesReturned {
                    abstract_name: name,
                })?
            }
        };

        value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ContainerError::InvalidConcrete {
                abstract_name: name,
            })
    }

    /// Wires `target` within this scope.
    pub fn inject<T: Injectable>(&mut self, target: &mut T) -> ContainerResult<()> {
        target.inject(self)
    }
}
