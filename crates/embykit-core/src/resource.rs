//! Fetch-once remote resource.
//!
//! A `RemoteResource` mirrors one piece of server-owned state. Any number of
//! consumers may call [`RemoteResource::load`]; the fetcher runs at most once
//! concurrently and, after the first success, not again until the resource is
//! invalidated or a forced refresh is requested.
//!
//! A flight runs on its own tokio task, so it completes and records its
//! outcome even when every caller awaiting it has been dropped.

use crate::error::{SyncError, SyncResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

type Flight<T> = Shared<BoxFuture<'static, SyncResult<T>>>;

struct ResourceInner<T> {
    value: Option<T>,
    loaded_once: bool,
    last_error: Option<SyncError>,
    /// The pending load, joined by every caller that arrives while it runs.
    in_flight: Option<Flight<T>>,
    /// Incremented for every started load so a finished flight never clears
    /// the slot of a newer one.
    generation: u64,
}

/// Clears the in-flight slot when a load finishes, including on panic or drop.
struct FlightGuard<T> {
    inner: Arc<Mutex<ResourceInner<T>>>,
    generation: u64,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.generation == self.generation {
            inner.in_flight = None;
        }
    }
}

/// Shared, idempotent mirror of a server value.
pub struct RemoteResource<T> {
    name: &'static str,
    inner: Arc<Mutex<ResourceInner<T>>>,
}

impl<T> RemoteResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(ResourceInner {
                value: None,
                loaded_once: false,
                last_error: None,
                in_flight: None,
                generation: 0,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last successfully loaded value, if any.
    pub fn value(&self) -> Option<T> {
        self.inner.lock().value.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().in_flight.is_some()
    }

    pub fn has_loaded_once(&self) -> bool {
        self.inner.lock().loaded_once
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.inner.lock().last_error.clone()
    }

    /// Drop the fetch-once gate so the next `load` refetches.
    ///
    /// The cached value stays readable while the refetch runs.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        if inner.loaded_once {
            log::debug!("{}: invalidated", self.name);
        }
        inner.loaded_once = false;
    }

    /// Replace the cached value after the owner reconciled it with the server
    /// through another route (e.g. a successful write-back).
    pub(crate) fn replace_value(&self, value: T) {
        let mut inner = self.inner.lock();
        inner.value = Some(value);
        inner.loaded_once = true;
        inner.last_error = None;
    }

    /// Load the resource.
    ///
    /// - A load already in flight is joined; `fetcher` is not called.
    /// - After a successful load, the cached value is returned unless `force`.
    /// - Otherwise `fetcher` runs. Success caches the value and closes the
    ///   gate; failure records the error and leaves the gate open so the next
    ///   call retries. The previous value is kept on failure.
    pub async fn load<F, Fut>(&self, force: bool, fetcher: F) -> SyncResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SyncResult<T>> + Send + 'static,
    {
        let flight = {
            let mut inner = self.inner.lock();
            if let Some(flight) = inner.in_flight.clone() {
                log::debug!("{}: joining in-flight load", self.name);
                flight
            } else {
                if inner.loaded_once && !force {
                    if let Some(value) = inner.value.clone() {
                        return Ok(value);
                    }
                }
                inner.generation += 1;
                let flight = self.start_flight(inner.generation, fetcher());
                inner.in_flight = Some(flight.clone());
                flight
            }
        };
        flight.await
    }

    fn start_flight<Fut>(&self, generation: u64, fetch: Fut) -> Flight<T>
    where
        Fut: Future<Output = SyncResult<T>> + Send + 'static,
    {
        let state = Arc::clone(&self.inner);
        let name = self.name;
        let task = tokio::spawn(async move {
            let _guard = FlightGuard {
                inner: Arc::clone(&state),
                generation,
            };
            log::debug!("{}: fetching", name);
            let result = fetch.await;
            {
                let mut inner = state.lock();
                match &result {
                    Ok(value) => {
                        inner.value = Some(value.clone());
                        inner.loaded_once = true;
                        inner.last_error = None;
                        log::info!("{}: loaded", name);
                    }
                    Err(err) => {
                        inner.last_error = Some(err.clone());
                        inner.loaded_once = false;
                        log::warn!("{}: load failed: {}", name, err);
                    }
                }
            }
            result
        });
        async move {
            task.await.unwrap_or_else(|err| {
                log::error!("{}: load task failed: {}", name, err);
                Err(SyncError::transport(format!("{} load task failed", name)))
            })
        }
        .boxed()
        .shared()
    }
}
