use std::collections::BTreeMap;

use providers::{BackendAdapter, HeadlessBackend, MapAdapter, ProviderId, ProviderInitError};

pub type AdapterFactory = Box<dyn Fn() -> Box<dyn MapAdapter>>;

/// Which adapter to build for each provider.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<ProviderId, AdapterFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provider backed by one shared headless backend.
    pub fn headless(backend: HeadlessBackend) -> Self {
        let mut registry = Self::new();
        for provider in ProviderId::ALL {
            let backend = backend.clone();
            registry.register(provider, move || -> Box<dyn MapAdapter> {
                Box::new(BackendAdapter::new(provider, backend.clone()))
            });
        }
        registry
    }

    pub fn register(
        &mut self,
        provider: ProviderId,
        factory: impl Fn() -> Box<dyn MapAdapter> + 'static,
    ) {
        self.factories.insert(provider, Box::new(factory));
    }

    pub fn contains(&self, provider: ProviderId) -> bool {
        self.factories.contains_key(&provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.factories.keys().copied()
    }

    pub fn create(&self, provider: ProviderId) -> Result<Box<dyn MapAdapter>, ProviderInitError> {
        self.factories
            .get(&provider)
            .map(|factory| factory())
            .ok_or_else(|| ProviderInitError::Backend {
                provider,
                message: "no adapter registered".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderRegistry;
    use providers::{HeadlessBackend, ProviderId};

    #[test]
    fn headless_registry_builds_every_provider() {
        let registry = ProviderRegistry::headless(HeadlessBackend::new());
        for provider in ProviderId::ALL {
            assert_eq!(registry.create(provider).unwrap().provider(), provider);
        }
    }

    #[test]
    fn missing_provider_is_an_init_error() {
        let registry = ProviderRegistry::new();
        let err = registry.create(ProviderId::Yandex).err().unwrap();
        assert_eq!(err.provider(), ProviderId::Yandex);
    }
}
