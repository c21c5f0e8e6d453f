use crate::di::{Instance, TypeKey};
use dashmap::DashMap;

/// One materialized value per type.
///
/// Pure storage: it never evicts on its own and is only emptied when the
/// owning application tears down.
#[derive(Default)]
pub struct InstanceCache {
    instances: DashMap<TypeKey, Instance>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TypeKey) -> Option<Instance> {
        self.instances.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: TypeKey, instance: Instance) {
        self.instances.insert(key, instance);
    }

    pub fn has(&self, key: &TypeKey) -> bool {
        self.instances.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub(crate) fn clear(&self) {
        self.instances.clear();
    }
}
