//! Provider registry keyed by [`ExternalSystem`].
//!
//! Registration is an administrative operation done at startup; lookups are
//! the hot path, hence the read-mostly lock.

use bridge_traits::{ExternalSystem, SyncProvider};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<ExternalSystem, Arc<dyn SyncProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under its own system, replacing any previous one.
    ///
    /// Returns the replaced provider, if any.
    pub fn register(&self, provider: Arc<dyn SyncProvider>) -> Option<Arc<dyn SyncProvider>> {
        let system = provider.system();
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = providers.insert(system, provider);

        info!(
            system = %system,
            replaced = previous.is_some(),
            "Registered sync provider"
        );
        previous
    }

    pub fn get(&self, system: ExternalSystem) -> Option<Arc<dyn SyncProvider>> {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&system)
            .cloned()
    }

    pub fn contains(&self, system: ExternalSystem) -> bool {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&system)
    }

    /// Registered systems in declaration order
    pub fn systems(&self) -> Vec<ExternalSystem> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ExternalSystem::ALL
            .into_iter()
            .filter(|system| providers.contains_key(system))
            .collect()
    }
}
