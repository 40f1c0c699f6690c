//! Single-flight service initialization.
//!
//! Each registered service boots in its own task exactly once. The task's
//! handle is wrapped in a shared, memoized future: every `instance` call
//! awaits the same computation, including after it settles. A failed boot is
//! logged and memoized as absent, so later lookups fail fast instead of
//! re-scraping.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use scraping::ScrapeEnv;
use search::SearchCache;

/// A long-lived controller initialized from scraped data at startup.
#[async_trait]
pub trait Service: Send + Sync + Sized + 'static {
    /// Short name used in logs.
    fn name() -> &'static str;

    /// Obtain the service's data and register its search corpus.
    async fn boot(env: ScrapeEnv, cache: Arc<SearchCache>) -> anyhow::Result<Self>;
}

/// Memoized outcome of one boot task. The error carries the panic message of
/// an aborted task; a clean boot failure is `Ok(None)` (already logged).
type SharedInit<S> = Shared<BoxFuture<'static, Result<Option<Arc<S>>, String>>>;

type Waiter = Box<dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// The service was launched but its boot failed, or it was never launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unavailable;

pub struct Bootstrap {
    env: ScrapeEnv,
    cache: Arc<SearchCache>,
    slots: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    waiters: Mutex<Vec<(&'static str, Waiter)>>,
}

impl Bootstrap {
    pub fn new(env: ScrapeEnv, cache: Arc<SearchCache>) -> Self {
        Self { env, cache, slots: Mutex::new(HashMap::new()), waiters: Mutex::new(Vec::new()) }
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    /// Spawn the boot task for `S` unless one is already registered.
    /// Must be called from within the runtime.
    pub fn launch<S: Service>(&self) {
        let mut slots = self.slots.lock();
        if slots.contains_key(&TypeId::of::<S>()) {
            return;
        }

        let env = self.env.clone();
        let cache = self.cache.clone();
        let handle = tokio::spawn(async move {
            match S::boot(env, cache).await {
                Ok(service) => Some(Arc::new(service)),
                Err(error) => {
                    tracing::error!(service = S::name(), %error, "service initialization failed");
                    None
                }
            }
        });
        let shared: SharedInit<S> =
            async move { handle.await.map_err(|join| join.to_string()) }.boxed().shared();

        slots.insert(TypeId::of::<S>(), Box::new(shared.clone()));
        self.waiters.lock().push((
            S::name(),
            Box::new(move || {
                let shared = shared.clone();
                async move { shared.await.map(|_| ()) }.boxed()
            }),
        ));
    }

    /// Register an already-built service instance, bypassing its boot task.
    pub fn install<S: Service>(&self, service: S) {
        let shared: SharedInit<S> =
            futures::future::ready(Ok(Some(Arc::new(service)))).boxed().shared();
        self.slots.lock().insert(TypeId::of::<S>(), Box::new(shared.clone()));
        self.waiters.lock().push((
            S::name(),
            Box::new(move || {
                let shared = shared.clone();
                async move { shared.await.map(|_| ()) }.boxed()
            }),
        ));
    }

    /// Await the service's boot task. Every concurrent caller observes the
    /// same outcome.
    pub async fn instance<S: Service>(&self) -> Result<Arc<S>, Unavailable> {
        let shared = {
            let slots = self.slots.lock();
            slots
                .get(&TypeId::of::<S>())
                .and_then(|slot| slot.downcast_ref::<SharedInit<S>>())
                .cloned()
        };
        match shared {
            Some(shared) => match shared.await {
                Ok(Some(service)) => Ok(service),
                Ok(None) | Err(_) => Err(Unavailable),
            },
            None => Err(Unavailable),
        }
    }

    /// Await every pending boot task in launch order; the first aborted task
    /// stops the wait and surfaces its panic.
    pub async fn wait_all(&self) -> anyhow::Result<()> {
        let pending: Vec<(&'static str, BoxFuture<'static, Result<(), String>>)> = {
            let waiters = self.waiters.lock();
            waiters.iter().map(|(name, waiter)| (*name, waiter())).collect()
        };
        for (name, waiter) in pending {
            waiter
                .await
                .map_err(|panic| anyhow!("initialization task for {name} aborted: {panic}"))?;
        }
        Ok(())
    }

    /// Run `wait_all` on the runtime and block the calling thread on it.
    /// Only for startup code running outside the runtime's workers.
    pub fn wait_all_blocking(
        self: &Arc<Self>,
        handle: &tokio::runtime::Handle,
    ) -> anyhow::Result<()> {
        let (sender, receiver) = std::sync::mpsc::channel();
        let boot = Arc::clone(self);
        handle.spawn(async move {
            let _ = sender.send(boot.wait_all().await);
        });
        receiver.recv().map_err(|_| anyhow!("initialization wait task dropped"))?
    }
}
