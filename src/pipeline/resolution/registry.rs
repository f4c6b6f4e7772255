use std::collections::HashMap;
use std::sync::Arc;

use super::LookupProvider;
use crate::models::EntityType;

/// Maps each entity type to the provider that resolves it.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<EntityType, Arc<dyn LookupProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for `entity_type`.
    pub fn register(&mut self, entity_type: EntityType, provider: Arc<dyn LookupProvider>) {
        tracing::debug!(%entity_type, provider = provider.name(), "Registered lookup provider");
        self.providers.insert(entity_type, provider);
    }

    pub fn with(mut self, entity_type: EntityType, provider: Arc<dyn LookupProvider>) -> Self {
        self.register(entity_type, provider);
        self
    }

    pub fn get(&self, entity_type: EntityType) -> Option<Arc<dyn LookupProvider>> {
        self.providers.get(&entity_type).cloned()
    }

    /// Types with a provider, in declaration order.
    pub fn registered_types(&self) -> Vec<EntityType> {
        EntityType::ALL
            .into_iter()
            .filter(|t| self.providers.contains_key(t))
            .collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for entity_type in EntityType::ALL {
            if let Some(p) = self.providers.get(&entity_type) {
                map.entry(&entity_type.as_str(), &p.name());
            }
        }
        map.finish()
    }
}
