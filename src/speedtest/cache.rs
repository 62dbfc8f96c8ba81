//! Single-flight memoization of remote resources.
//!
//! A [`ResourceCache`] holds at most one decoded resource. The first caller
//! that finds the cache empty launches the load; every caller arriving while
//! that load is in flight awaits the same shared future, so the loader runs
//! once per wave and all waiters observe the identical outcome. A successful
//! value is kept for the lifetime of the cache. A failed load leaves the cache
//! empty so a later call may try again.

use crate::speedtest::error::FetchError;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type PendingLoad<T> = Shared<BoxFuture<'static, Result<Arc<T>, FetchError>>>;

enum Slot<T> {
    Empty,
    Loading { generation: u64, pending: PendingLoad<T> },
    Ready(Arc<T>),
}

struct State<T> {
    slot: Slot<T>,
    /// Loads launched so far; doubles as the generation of the current wave.
    loads: u64,
}

pub struct ResourceCache<T> {
    name: &'static str,
    state: Mutex<State<T>>,
}

impl<T: Send + Sync + 'static> ResourceCache<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, state: Mutex::new(State { slot: Slot::Empty, loads: 0 }) }
    }

    /// Return the cached resource, loading it with `load` if nobody has yet.
    ///
    /// `load` is only invoked when the cache is empty and no other load is in
    /// flight.
    pub async fn fetch<F, Fut>(&self, load: F) -> Result<Arc<T>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (generation, pending) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            let in_flight = match &state.slot {
                Slot::Ready(value) => return Ok(Arc::clone(value)),
                Slot::Loading { generation, pending } => {
                    Some((*generation, pending.clone()))
                }
                Slot::Empty => None,
            };

            match in_flight {
                Some(in_flight) => {
                    debug!("{}: joining in-flight load", self.name);
                    in_flight
                }
                None => {
                    state.loads += 1;
                    let generation = state.loads;
                    debug!("{}: starting load #{}", self.name, generation);

                    let pending = load().map(|r| r.map(Arc::new)).boxed().shared();
                    state.slot =
                        Slot::Loading { generation, pending: pending.clone() };
                    (generation, pending)
                }
            }
        };

        let outcome = pending.await;

        let mut state = self.lock();
        let current = matches!(
            &state.slot,
            Slot::Loading { generation: g, .. } if *g == generation
        );
        if current {
            state.slot = match &outcome {
                Ok(value) => Slot::Ready(Arc::clone(value)),
                Err(e) => {
                    debug!("{}: load #{} failed: {}", self.name, generation, e);
                    Slot::Empty
                }
            };
        }

        outcome
    }

    /// The cached resource, if a load has already succeeded.
    #[cfg(test)]
    pub fn get(&self) -> Option<Arc<T>> {
        match &self.lock().slot {
            Slot::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// How many underlying loads have been launched.
    pub fn loads(&self) -> u64 {
        self.lock().loads
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const WAITERS: usize = 16;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let cache = Arc::new(ResourceCache::<u32>::new("test"));
        let invocations = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..WAITERS)
            .map(|_| {
                let cache = cache.clone();
                let invocations = invocations.clone();
                tokio::spawn(async move {
                    cache
                        .fetch(move || async move {
                            invocations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(42)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap(), 42);
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loads(), 1);
        assert_eq!(cache.get().map(|v| *v), Some(42));
    }

    #[tokio::test]
    async fn test_cached_value_is_reused() {
        let cache = ResourceCache::<String>::new("test");

        let first = cache.fetch(|| async { Ok("config".to_string()) }).await.unwrap();
        let second = cache
            .fetch(|| async { Err(FetchError::NoServersAvailable) })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.loads(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_broadcast_then_retryable() {
        let cache = Arc::new(ResourceCache::<u32>::new("test"));
        let invocations = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..WAITERS)
            .map(|_| {
                let cache = cache.clone();
                let invocations = invocations.clone();
                tokio::spawn(async move {
                    cache
                        .fetch(move || async move {
                            invocations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Err(FetchError::NoServersAvailable)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(
                handle.await.unwrap().unwrap_err(),
                FetchError::NoServersAvailable
            );
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(cache.get().is_none());

        let value = cache.fetch(|| async { Ok(7) }).await.unwrap();
        assert_eq!(*value, 7);
        assert_eq!(cache.loads(), 2);
    }
}
