// SPDX-License-Identifier: MPL-2.0

//! Cache of containers already fetched from the provider, with optional
//! background prefetching.
//!
//! The solver itself is single threaded; this cache is the only place
//! where concurrency appears. A request for a container either returns the
//! cached result, waits for an in-flight prefetch to complete, or performs
//! the fetch synchronously. Prefetching is purely an optimization: results
//! are only ever consumed after the lock-acquired handoff, so completion
//! order cannot change the outcome of a solve.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{ProviderError, SolverError};
use crate::package::PackageRef;
use crate::provider::{Container, ContainerProvider};
use crate::type_aliases::Map;

/// Upper bound on threads draining the prefetch queue.
const PREFETCH_WORKERS: usize = 4;

pub(crate) struct ContainerCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    provider: Arc<dyn ContainerProvider>,
    state: Mutex<CacheState>,
    changed: Condvar,
}

#[derive(Default)]
struct CacheState {
    slots: Map<PackageRef, Slot>,
    jobs: VecDeque<PackageRef>,
    workers: usize,
}

enum Slot {
    /// A fetch is in flight.
    Pending,
    Ready(Arc<dyn Container>),
    Failed(Arc<ProviderError>),
}

impl ContainerCache {
    pub(crate) fn new(provider: Arc<dyn ContainerProvider>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                provider,
                state: Mutex::new(CacheState::default()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Hint that the given packages will be needed. Unknown packages are
    /// queued and fetched by background workers.
    pub(crate) fn prefetch(&self, packages: impl IntoIterator<Item = PackageRef>) {
        let mut spawn = 0;
        {
            let mut state = self.inner.state.lock();
            for package in packages {
                if state.slots.contains_key(&package) {
                    continue;
                }
                state.slots.insert(package.clone(), Slot::Pending);
                state.jobs.push_back(package);
            }
            while state.workers < PREFETCH_WORKERS && state.workers < state.jobs.len() {
                state.workers += 1;
                spawn += 1;
            }
        }
        for _ in 0..spawn {
            let inner = Arc::clone(&self.inner);
            std::thread::spawn(move || inner.drain_jobs());
        }
    }

    /// The container for a package: cached, awaited, or fetched on the
    /// calling thread.
    pub(crate) fn get(&self, package: &PackageRef) -> Result<Arc<dyn Container>, SolverError> {
        let fetch_here = {
            let mut state = self.inner.state.lock();
            if state.slots.contains_key(package) {
                false
            } else {
                state.slots.insert(package.clone(), Slot::Pending);
                true
            }
        };
        if fetch_here {
            log::debug!("fetching container of {}", package);
            self.inner.fetch(package.clone());
        }
        let mut state = self.inner.state.lock();
        loop {
            match state
                .slots
                .get(package)
                .expect("a slot exists for every awaited package")
            {
                Slot::Pending => self.inner.changed.wait(&mut state),
                Slot::Ready(container) => return Ok(Arc::clone(container)),
                Slot::Failed(error) => {
                    return Err(SolverError::Provider {
                        package: package.clone(),
                        error: Arc::clone(error),
                    })
                }
            }
        }
    }
}

impl CacheInner {
    /// Worker loop: fetch queued packages until the queue is drained.
    fn drain_jobs(self: Arc<Self>) {
        loop {
            let job = {
                let mut state = self.state.lock();
                match state.jobs.pop_front() {
                    Some(job) => job,
                    None => {
                        state.workers -= 1;
                        return;
                    }
                }
            };
            log::debug!("prefetching container of {}", job);
            self.fetch(job);
        }
    }

    /// Start one fetch; the provider's completion fills the slot.
    fn fetch(self: &Arc<Self>, package: PackageRef) {
        let inner = Arc::clone(self);
        let slot_package = package.clone();
        self.provider.get_container(
            &package,
            true,
            Box::new(move |result| {
                let slot = match result {
                    Ok(container) => Slot::Ready(container),
                    Err(error) => Slot::Failed(Arc::new(error)),
                };
                let mut state = inner.state.lock();
                state.slots.insert(slot_package, slot);
                inner.changed.notify_all();
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ContainerCompletion, OfflineProvider};

    #[test]
    fn get_returns_the_cached_container() {
        let mut provider = OfflineProvider::new();
        provider.add_dependencies("a", (1, 0, 0), []);
        let cache = ContainerCache::new(Arc::new(provider));
        let package = PackageRef::new("a");
        let first = cache.get(&package).unwrap();
        let second = cache.get(&package).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn prefetched_containers_are_awaited_not_refetched() {
        struct CountingProvider {
            fetches: std::sync::atomic::AtomicUsize,
            inner: OfflineProvider,
        }
        impl ContainerProvider for CountingProvider {
            fn get_container(
                &self,
                package: &PackageRef,
                skip_update: bool,
                completion: ContainerCompletion,
            ) {
                self.fetches
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                self.inner.get_container(package, skip_update, completion);
            }
        }

        let mut inner = OfflineProvider::new();
        inner.add_dependencies("a", (1, 0, 0), []);
        let provider = Arc::new(CountingProvider {
            fetches: std::sync::atomic::AtomicUsize::new(0),
            inner,
        });
        let cache = ContainerCache::new(provider.clone());
        let package = PackageRef::new("a");
        cache.prefetch([package.clone()]);
        cache.get(&package).unwrap();
        cache.get(&package).unwrap();
        assert_eq!(
            provider.fetches.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn provider_failures_surface_to_every_waiter() {
        struct FailingProvider;
        impl ContainerProvider for FailingProvider {
            fn get_container(
                &self,
                _package: &PackageRef,
                _skip_update: bool,
                completion: ContainerCompletion,
            ) {
                completion(Err("registry unreachable".into()));
            }
        }

        let cache = ContainerCache::new(Arc::new(FailingProvider));
        let package = PackageRef::new("a");
        for _ in 0..2 {
            match cache.get(&package) {
                Err(SolverError::Provider { package, error }) => {
                    assert_eq!(package.name(), "a");
                    assert_eq!(error.to_string(), "registry unreachable");
                }
                other => panic!("expected a provider error, got {:?}", other.map(|_| ())),
            }
        }
    }
}
