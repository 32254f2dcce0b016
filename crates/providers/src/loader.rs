//! One-time SDK loading per provider.
//!
//! Mount attempts that race each other await the same in-flight load
//! instead of injecting the SDK twice. A failed load is forgotten on the
//! next request so the user can retry.

use std::cell::RefCell;
use std::collections::BTreeMap;

use futures_util::future::{self, FutureExt, LocalBoxFuture, Shared};

use crate::catalog::ProviderId;
use crate::error::ProviderInitError;

pub type LoadFuture = LocalBoxFuture<'static, Result<(), ProviderInitError>>;
pub type SharedLoad = Shared<LoadFuture>;

type ScriptFetch = Box<dyn Fn(ProviderId, String) -> LoadFuture>;

pub struct ProviderLoader {
    fetch: ScriptFetch,
    api_keys: BTreeMap<ProviderId, String>,
    loads: RefCell<BTreeMap<ProviderId, SharedLoad>>,
}

impl ProviderLoader {
    /// `fetch` receives the resolved script URL and resolves once the SDK is
    /// usable.
    pub fn new(fetch: impl Fn(ProviderId, String) -> LoadFuture + 'static) -> Self {
        Self {
            fetch: Box::new(fetch),
            api_keys: BTreeMap::new(),
            loads: RefCell::new(BTreeMap::new()),
        }
    }

    /// For hosts that ship every SDK up front.
    pub fn bundled() -> Self {
        Self::new(|_, _| future::ready(Ok(())).boxed_local())
    }

    pub fn with_api_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider, key.into());
        self
    }

    pub fn load(&self, provider: ProviderId) -> SharedLoad {
        let mut loads = self.loads.borrow_mut();
        if let Some(existing) = loads.get(&provider) {
            if !matches!(existing.peek(), Some(Err(_))) {
                return existing.clone();
            }
            tracing::info!(%provider, "retrying failed provider load");
        }

        let shared = self.start(provider).shared();
        loads.insert(provider, shared.clone());
        shared
    }

    pub fn is_loaded(&self, provider: ProviderId) -> bool {
        self.loads
            .borrow()
            .get(&provider)
            .is_some_and(|l| matches!(l.peek(), Some(Ok(()))))
    }

    fn start(&self, provider: ProviderId) -> LoadFuture {
        let spec = provider.spec();
        let api_key = self.api_keys.get(&provider).map(String::as_str);
        if spec.needs_credentials && api_key.is_none() {
            tracing::warn!(%provider, "provider needs an API key; none configured");
            return future::ready(Err(ProviderInitError::MissingCredentials { provider }))
                .boxed_local();
        }
        let Some(url) = spec.resolved_script_url(api_key) else {
            return future::ready(Ok(())).boxed_local();
        };

        tracing::info!(%provider, "loading provider script");
        let fetch = (self.fetch)(provider, url);
        async move {
            let result = fetch.await;
            if let Err(err) = &result {
                tracing::warn!(%provider, error = %err, "provider script failed to load");
            }
            result
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadFuture, ProviderLoader};
    use crate::catalog::ProviderId;
    use crate::error::ProviderInitError;
    use futures_util::future::{self, FutureExt};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counting_loader(results: Vec<Result<(), ProviderInitError>>) -> (ProviderLoader, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let queue = RefCell::new(results.into_iter());
        let counter = Rc::clone(&calls);
        let loader = ProviderLoader::new(move |_, _| -> LoadFuture {
            counter.set(counter.get() + 1);
            let next = queue.borrow_mut().next().unwrap_or(Ok(()));
            future::ready(next).boxed_local()
        });
        (loader, calls)
    }

    #[test]
    fn concurrent_mounts_share_one_load() {
        let (loader, calls) = counting_loader(vec![Ok(())]);
        let a = loader.load(ProviderId::TwoGis);
        let b = loader.load(ProviderId::TwoGis);
        let (ra, rb) = pollster::block_on(future::join(a, b));
        assert_eq!(ra, Ok(()));
        assert_eq!(rb, Ok(()));
        assert_eq!(calls.get(), 1);

        pollster::block_on(loader.load(ProviderId::TwoGis)).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(loader.is_loaded(ProviderId::TwoGis));
    }

    #[test]
    fn failed_load_can_be_retried() {
        let failure = ProviderInitError::ScriptUnavailable {
            provider: ProviderId::TwoGis,
            reason: "blocked".to_string(),
        };
        let (loader, calls) = counting_loader(vec![Err(failure.clone()), Ok(())]);

        assert_eq!(pollster::block_on(loader.load(ProviderId::TwoGis)), Err(failure));
        assert!(!loader.is_loaded(ProviderId::TwoGis));
        assert_eq!(pollster::block_on(loader.load(ProviderId::TwoGis)), Ok(()));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn bundled_providers_skip_fetching() {
        let (loader, calls) = counting_loader(vec![]);
        pollster::block_on(loader.load(ProviderId::Raster)).unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn yandex_without_key_fails_without_fetching() {
        let (loader, calls) = counting_loader(vec![]);
        let result = pollster::block_on(loader.load(ProviderId::Yandex));
        assert_eq!(
            result,
            Err(ProviderInitError::MissingCredentials {
                provider: ProviderId::Yandex
            })
        );
        assert_eq!(calls.get(), 0);

        let (loader, calls) = counting_loader(vec![]);
        let loader = loader.with_api_key(ProviderId::Yandex, "key");
        pollster::block_on(loader.load(ProviderId::Yandex)).unwrap();
        assert_eq!(calls.get(), 1);
    }
}
