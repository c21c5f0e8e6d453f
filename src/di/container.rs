use crate::di::resolver::{self, Resolver};
use crate::di::{InstanceCache, Invocation, Provider, ProviderRegistry, TypeKey};
use crate::error::{LifewireError, Result};
use crate::lifecycle::{ContainerState, LifecycleManager};
use std::collections::HashSet;
use std::sync::Arc;

/// Dependency injection container.
///
/// Holds the registered providers and invocations together with the cache of
/// everything built so far. A container belongs to exactly one
/// [`Application`](crate::lifecycle::Application); separate containers never
/// share instances.
#[derive(Default)]
pub struct Container {
    registry: ProviderRegistry,
    cache: InstanceCache,
    invocations: Vec<Invocation>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&mut self, provider: Provider) -> Result<&mut Self> {
        self.registry.register(provider)?;
        Ok(self)
    }

    pub fn register_invocation(&mut self, invocation: Invocation) -> &mut Self {
        tracing::debug!(invocation = invocation.name(), "Invoke registered");
        self.invocations.push(invocation);
        self
    }

    /// Check that every invocation's dependency graph is complete and acyclic.
    ///
    /// Nothing is constructed.
    pub fn validate(&self) -> Result<()> {
        let mut verified = HashSet::new();
        for invocation in &self.invocations {
            resolver::check_inputs(
                &self.registry,
                invocation.inputs(),
                invocation.name(),
                &mut Vec::new(),
                &mut verified,
            )?;
        }
        Ok(())
    }

    /// Run every invocation, in registration order, stopping at the first
    /// failure.
    pub(crate) fn run_invocations(&self, lifecycle: &mut LifecycleManager) -> Result<()> {
        let mut resolver = Resolver::new(&self.registry, &self.cache, lifecycle, ContainerState::Built);

        for invocation in &self.invocations {
            tracing::debug!(invocation = invocation.name(), "Invoking");
            let mut args = resolver
                .resolve_inputs(invocation.inputs(), invocation.name())
                .inspect_err(|e| {
                    tracing::error!(invocation = invocation.name(), "Invoke failed: {}", e);
                })?;
            invocation.call(&mut args).inspect_err(|e| {
                tracing::error!(invocation = invocation.name(), "Invoke failed: {}", e);
            })?;
            tracing::debug!(invocation = invocation.name(), "Invoked");
        }

        Ok(())
    }

    pub(crate) fn resolve<T: Send + Sync + 'static>(
        &self,
        lifecycle: &mut LifecycleManager,
        state: ContainerState,
    ) -> Result<Arc<T>> {
        let key = TypeKey::of::<T>();
        let instance = Resolver::new(&self.registry, &self.cache, lifecycle, state)
            .resolve(key, "eager resolution")?;
        instance
            .downcast::<T>()
            .map_err(|_| LifewireError::DowncastFailed {
                type_name: key.name().to_string(),
            })
    }

    /// Whether a provider is registered for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.registry.contains(&TypeKey::of::<T>())
    }

    /// Whether `T` has already been constructed.
    pub fn is_materialized<T: 'static>(&self) -> bool {
        self.cache.has(&TypeKey::of::<T>())
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    pub fn instance_count(&self) -> usize {
        self.cache.len()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub(crate) fn clear_instances(&self) {
        self.cache.clear();
    }
}
