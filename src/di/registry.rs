use crate::di::{Provider, TypeKey};
use crate::error::{LifewireError, Result};
use std::collections::HashMap;

/// Constructors indexed by the types they produce.
///
/// Each type has at most one provider. Registration order carries no meaning:
/// what gets built, and when, is decided by demand during resolution.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
    by_type: HashMap<TypeKey, usize>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for all of its outputs.
    ///
    /// # Errors
    /// `DuplicateProvider` if any output already has a provider, including
    /// one declared twice by the same provider. Nothing is registered then.
    pub fn register(&mut self, provider: Provider) -> Result<()> {
        for (position, key) in provider.outputs().iter().enumerate() {
            if let Some(&index) = self.by_type.get(key) {
                return Err(LifewireError::DuplicateProvider {
                    type_name: key.name().to_string(),
                    existing: self.providers[index].name().to_string(),
                });
            }
            if provider.outputs()[..position].contains(key) {
                return Err(LifewireError::DuplicateProvider {
                    type_name: key.name().to_string(),
                    existing: provider.name().to_string(),
                });
            }
        }

        let index = self.providers.len();
        for key in provider.outputs() {
            self.by_type.insert(*key, index);
        }
        tracing::debug!(
            provider = provider.name(),
            outputs = ?provider.outputs(),
            "Provided"
        );
        self.providers.push(provider);
        Ok(())
    }

    pub fn get(&self, key: &TypeKey) -> Option<&Provider> {
        self.by_type.get(key).map(|&index| &self.providers[index])
    }

    /// Like [`get`](Self::get), but a missing provider is an `UnknownType`
    /// error attributed to `required_by`.
    pub fn lookup(&self, key: &TypeKey, required_by: &str) -> Result<&Provider> {
        self.get(key).ok_or_else(|| LifewireError::UnknownType {
            type_name: key.name().to_string(),
            required_by: required_by.to_string(),
        })
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.by_type.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter()
    }
}
