use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::traits::Provider;
use super::unified::UnifiedProvider;
use crate::app::ProvidersConfig;
use crate::backend::HttpBackend;

/// Provider implementations keyed by provider id.
///
/// Adding a provider means registering another implementation; callers
/// resolve once per request and dispatch through the trait.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the provider's own key, replacing any previous entry
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.key().to_string(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    pub fn resolve(&self, provider_id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// One relay provider per enabled key, all sharing the same backend client
    pub fn from_config(config: &ProvidersConfig, backend: Arc<HttpBackend>) -> Self {
        config
            .enabled
            .iter()
            .fold(Self::new(), |registry, key| {
                registry.with(Arc::new(UnifiedProvider::new(key.clone(), Arc::clone(&backend))))
            })
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.keys())
            .finish()
    }
}
