use crate::di::provider::{Args, Input};
use crate::di::{Instance, InstanceCache, Provider, ProviderRegistry, TypeKey};
use crate::error::{LifewireError, Result};
use crate::lifecycle::{ContainerState, Lifecycle, LifecycleManager};
use std::collections::HashSet;

/// Depth-first, on-demand construction of the dependency graph.
///
/// Types currently being built sit on `path`; meeting one of them again is a
/// cycle. Hooks appended by a constructor reach the lifecycle manager only
/// once that constructor has succeeded.
pub(crate) struct Resolver<'a> {
    registry: &'a ProviderRegistry,
    cache: &'a InstanceCache,
    lifecycle: &'a mut LifecycleManager,
    state: ContainerState,
    path: Vec<TypeKey>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        registry: &'a ProviderRegistry,
        cache: &'a InstanceCache,
        lifecycle: &'a mut LifecycleManager,
        state: ContainerState,
    ) -> Self {
        Self {
            registry,
            cache,
            lifecycle,
            state,
            path: Vec::new(),
        }
    }

    /// Resolve every input in declaration order.
    pub(crate) fn resolve_inputs(&mut self, inputs: &[Input], required_by: &str) -> Result<Args> {
        let mut slots = Vec::with_capacity(inputs.len());
        for input in inputs {
            if input.optional && !self.cache.has(&input.key) && !self.registry.contains(&input.key) {
                slots.push(None);
                continue;
            }
            slots.push(Some(self.resolve(input.key, required_by)?));
        }
        Ok(Args::new(slots))
    }

    pub(crate) fn resolve(&mut self, key: TypeKey, required_by: &str) -> Result<Instance> {
        if let Some(instance) = self.cache.get(&key) {
            return Ok(instance);
        }

        if let Some(start) = self.path.iter().position(|k| *k == key) {
            return Err(LifewireError::CyclicDependency {
                cycle: describe_cycle(&self.path[start..], key),
            });
        }

        let registry = self.registry;
        let provider = registry.lookup(&key, required_by)?;

        // Construction is only allowed before the application starts.
        if self.state != ContainerState::Built {
            return Err(LifewireError::invalid_transition(self.state, "construct new instances"));
        }

        self.path.push(key);
        let constructed = self.construct(provider);
        self.path.pop();
        constructed?;

        self.cache.get(&key).ok_or_else(|| LifewireError::DowncastFailed {
            type_name: key.name().to_string(),
        })
    }

    fn construct(&mut self, provider: &Provider) -> Result<()> {
        let mut args = self.resolve_inputs(provider.inputs(), provider.name())?;
        let mut lifecycle = Lifecycle::new(provider.name());

        tracing::debug!(provider = provider.name(), "Executing constructor");
        let instances = provider.construct(&mut args, &mut lifecycle)?;

        for (key, instance) in provider.outputs().iter().zip(instances) {
            self.cache.put(*key, instance);
        }
        self.lifecycle.append_from(lifecycle);
        Ok(())
    }
}

/// Walk the declared graph without constructing anything.
pub(crate) fn check_inputs(
    registry: &ProviderRegistry,
    inputs: &[Input],
    required_by: &str,
    path: &mut Vec<TypeKey>,
    verified: &mut HashSet<TypeKey>,
) -> Result<()> {
    for input in inputs {
        if input.optional && !registry.contains(&input.key) {
            continue;
        }
        check(registry, input.key, required_by, path, verified)?;
    }
    Ok(())
}

fn check(
    registry: &ProviderRegistry,
    key: TypeKey,
    required_by: &str,
    path: &mut Vec<TypeKey>,
    verified: &mut HashSet<TypeKey>,
) -> Result<()> {
    if verified.contains(&key) {
        return Ok(());
    }
    if let Some(start) = path.iter().position(|k| *k == key) {
        return Err(LifewireError::CyclicDependency {
            cycle: describe_cycle(&path[start..], key),
        });
    }

    let provider = registry.lookup(&key, required_by)?;
    path.push(key);
    let checked = check_inputs(registry, provider.inputs(), provider.name(), path, verified);
    path.pop();
    checked?;

    verified.extend(provider.outputs().iter().copied());
    Ok(())
}

fn describe_cycle(path: &[TypeKey], back_to: TypeKey) -> String {
    path.iter()
        .chain(std::iter::once(&back_to))
        .map(TypeKey::name)
        .collect::<Vec<_>>()
        .join(" -> ")
}
