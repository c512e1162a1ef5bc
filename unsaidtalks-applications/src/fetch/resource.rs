//! Resource Fetch Controller
//!
//! Runs a producer on mount, on explicit refetch and whenever its dependency
//! identity changes, exposing `{data, error, loading}` through a watch
//! channel.

use super::cell::FetchCell;
use super::{FetchOptions, FetchState, Producer};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use unsaidtalks_core::{maybe_timeout, DashboardError, DashboardResult};

/// Spawns invocations against a shared cell and tracks their tasks
pub(crate) struct Invocations<T> {
    cell: Arc<FetchCell<T>>,
    options: FetchOptions,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Clone + Send + Sync + 'static> Invocations<T> {
    pub(crate) fn new(options: FetchOptions) -> Self {
        Self {
            cell: Arc::new(FetchCell::new(options.label.clone())),
            options,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn cell(&self) -> &FetchCell<T> {
        &self.cell
    }

    pub(crate) fn run(&self, producer: Producer<T>, reason: &'static str) {
        let Some(token) = self.cell.begin(self.options.retain_data) else {
            debug!(resource = %self.options.label, reason, "Ignoring invocation after dispose");
            return;
        };
        debug!(resource = %self.options.label, reason, token, "Starting fetch");

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.cell.settle(
                    token,
                    Err(DashboardError::internal(format!("No async runtime: {}", e))),
                );
                return;
            }
        };

        let cell = Arc::clone(&self.cell);
        let timeout = self.options.timeout;
        let handle = runtime.spawn(async move {
            let outcome = maybe_timeout(producer(), timeout, cell.label()).await;
            if let Err(e) = &outcome {
                warn!(resource = %cell.label(), error = %e, "Fetch failed");
            }
            cell.settle(token, outcome);
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    pub(crate) fn dispose(&self) {
        self.cell.dispose();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            task.abort();
        }
    }
}

/// Fetch controller for one resource
///
/// ```ignore
/// let stats = ResourceFetch::new(producer(|| async { api.stats().await }));
/// stats.mount();
/// let mut updates = stats.subscribe();
/// ```
pub struct ResourceFetch<T: Clone + Send + Sync + 'static> {
    invocations: Invocations<T>,
    producer: Mutex<Producer<T>>,
}

impl<T: Clone + Send + Sync + 'static> ResourceFetch<T> {
    pub fn new(producer: Producer<T>) -> Self {
        Self::with_options(producer, FetchOptions::default())
    }

    pub fn with_options(producer: Producer<T>, options: FetchOptions) -> Self {
        Self {
            invocations: Invocations::new(options),
            producer: Mutex::new(producer),
        }
    }

    /// First invocation, when the owning view appears
    pub fn mount(&self) {
        self.invocations.run(self.current_producer(), "mount");
    }

    /// Re-run the current producer
    pub fn refetch(&self) {
        self.invocations.run(self.current_producer(), "refetch");
    }

    /// Switch to a new dependency identity and run it.
    ///
    /// Anything still in flight for the previous identity is discarded when
    /// it resolves.
    pub fn restart_with(&self, producer: Producer<T>) {
        *self.producer.lock().unwrap_or_else(PoisonError::into_inner) = producer.clone();
        self.invocations.run(producer, "identity change");
    }

    /// Stop all future state updates. Idempotent.
    pub fn dispose(&self) {
        self.invocations.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.invocations.cell().is_disposed()
    }

    pub fn state(&self) -> FetchState<T> {
        self.invocations.cell().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.invocations.cell().subscribe()
    }

    /// Edit the loaded data in place, e.g. after a successful mutation.
    /// Returns false when there is no data or the controller is disposed.
    pub fn update_data<F: FnOnce(&mut T)>(&self, f: F) -> bool {
        self.invocations.cell().update_data(f)
    }

    fn current_producer(&self) -> Producer<T> {
        self.producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for ResourceFetch<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

type KeyedFetcher<K, T> = Arc<dyn Fn(K) -> BoxFuture<'static, DashboardResult<T>> + Send + Sync>;

/// Fetch controller whose identity is an optional key, such as a session id.
///
/// With no key it settles immediately with `No {label} ID provided`. A key
/// change clears the previous data.
pub struct KeyedResource<K, T>
where
    K: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    invocations: Invocations<T>,
    fetcher: KeyedFetcher<K, T>,
    key: Mutex<Option<K>>,
}

impl<K, T> KeyedResource<K, T>
where
    K: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(label: impl Into<String>, fetcher: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DashboardResult<T>> + Send + 'static,
    {
        Self::with_options(FetchOptions::labeled(label), fetcher)
    }

    pub fn with_options<F, Fut>(options: FetchOptions, fetcher: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DashboardResult<T>> + Send + 'static,
    {
        Self {
            invocations: Invocations::new(options.clear_on_restart()),
            fetcher: Arc::new(move |key| fetcher(key).boxed()),
            key: Mutex::new(None),
        }
    }

    /// Mount with an initial key
    pub fn mount(&self, key: Option<K>) {
        *self.key.lock().unwrap_or_else(PoisonError::into_inner) = key.clone();
        self.run(key, "mount");
    }

    /// Change the key; unchanged keys are a no-op
    pub fn set_key(&self, key: Option<K>) {
        {
            let mut current = self.key.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == key {
                return;
            }
            *current = key.clone();
        }
        self.run(key, "identity change");
    }

    pub fn refetch(&self) {
        let key = self.key();
        self.run(key, "refetch");
    }

    pub fn key(&self) -> Option<K> {
        self.key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn dispose(&self) {
        self.invocations.dispose();
    }

    pub fn state(&self) -> FetchState<T> {
        self.invocations.cell().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.invocations.cell().subscribe()
    }

    pub fn update_data<F: FnOnce(&mut T)>(&self, f: F) -> bool {
        self.invocations.cell().update_data(f)
    }

    fn run(&self, key: Option<K>, reason: &'static str) {
        match key {
            Some(key) => {
                let fetcher = Arc::clone(&self.fetcher);
                let producer: Producer<T> = Arc::new(move || fetcher(key.clone()));
                self.invocations.run(producer, reason);
            }
            None => {
                let cell = self.invocations.cell();
                cell.reject(format!("No {} ID provided", cell.label()));
            }
        }
    }
}

impl<K, T> Drop for KeyedResource<K, T>
where
    K: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}
