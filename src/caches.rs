//! Lifetime cache stores
//!
//! Each caching lifetime gets its own store with its own concurrency
//! discipline:
//!
//! - Singleton: per-key `OnceCell` inside a `DashMap`. The cell is the
//!   double-checked lock: initialized cells are read without blocking, and
//!   racing first resolutions block on the cell until the single winner has
//!   finished constructing.
//! - WeakReference: per-key slot holding a `Weak` behind an `RwLock`. A live
//!   instance only needs the read lock; construction takes the write lock and
//!   re-checks before building.
//! - ThreadLocal: a `thread_local!` map partitioned by container id. No
//!   cross-thread synchronization at all.
//!
//! Transient has no store. In every store the map shard lock is released
//! before the factory runs, so a construction that recursively resolves other
//! keys re-enters the container safely. A factory failure propagates to the
//! caller and never leaves a cache entry behind.

use crate::construct::Erased;
use crate::error::Result;
use crate::key::Key;
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

#[cfg(feature = "logging")]
use tracing::trace;

// =============================================================================
// Singleton store
// =============================================================================

/// Strongly-held lazy singletons; entries live until the container drops.
pub(crate) struct SingletonStore {
    cells: DashMap<Key, Arc<OnceCell<Erased>>, RandomState>,
}

impl SingletonStore {
    pub(crate) fn new() -> Self {
        Self {
            cells: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Store a pre-built instance, replacing any previous entry for the key.
    pub(crate) fn seed(&self, key: Key, instance: Erased) {
        self.cells.insert(key, Arc::new(OnceCell::with_value(instance)));
    }

    pub(crate) fn get_or_create(
        &self,
        key: &Key,
        create: impl FnOnce() -> Result<Erased>,
    ) -> Result<Erased> {
        // Fast path: an initialized cell needs no shard write lock.
        if let Some(cell) = self.cells.get(key) {
            if let Some(instance) = cell.get() {
                #[cfg(feature = "logging")]
                trace!(target: "keyed_injector", key = %key, "singleton cache hit");
                return Ok(Arc::clone(instance));
            }
        }

        let cell = {
            let entry = self.cells.entry(key.clone()).or_default();
            Arc::clone(&*entry)
        };
        // Shard guard released; the cell alone serializes construction, so a
        // factory that resolves other singletons can re-enter the map.
        cell.get_or_try_init(create).map(Arc::clone)
    }
}

// =============================================================================
// Weak-reference store
// =============================================================================

#[derive(Default)]
struct WeakSlot {
    cached: RwLock<Option<Weak<dyn Any + Send + Sync>>>,
}

/// Weakly-held singletons; an entry dies with its last external strong owner
/// and is reconstructed transparently on the next resolve.
pub(crate) struct WeakStore {
    slots: DashMap<Key, Arc<WeakSlot>, RandomState>,
}

impl WeakStore {
    pub(crate) fn new() -> Self {
        Self {
            slots: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub(crate) fn get_or_create(
        &self,
        key: &Key,
        create: impl FnOnce() -> Result<Erased>,
    ) -> Result<Erased> {
        let slot = {
            let entry = self.slots.entry(key.clone()).or_default();
            Arc::clone(&*entry)
        };

        // Fast path: a live instance only needs the read lock.
        if let Some(live) = slot
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
        {
            #[cfg(feature = "logging")]
            trace!(target: "keyed_injector", key = %key, "weak cache hit");
            return Ok(live);
        }

        let mut cached = slot.cached.write().unwrap_or_else(PoisonError::into_inner);
        // Double check: another thread may have finished constructing while
        // we waited for the write lock.
        if let Some(live) = cached.as_ref().and_then(Weak::upgrade) {
            return Ok(live);
        }

        #[cfg(feature = "logging")]
        trace!(target: "keyed_injector", key = %key, "weak entry dead, reconstructing");
        let instance = create()?;
        *cached = Some(Arc::downgrade(&instance));
        Ok(instance)
    }
}

// =============================================================================
// Thread-local store
// =============================================================================

thread_local! {
    // Shared by every container on the thread; partitioned by container id.
    static THREAD_INSTANCES: RefCell<HashMap<(u64, Key), Erased, RandomState>> =
        RefCell::new(HashMap::default());
}

/// Per-thread singletons. Entries constructed on one thread are never visible
/// to another and live for the thread's lifetime.
pub(crate) struct ThreadLocalStore {
    container_id: u64,
}

impl ThreadLocalStore {
    pub(crate) fn new(container_id: u64) -> Self {
        Self { container_id }
    }

    pub(crate) fn get_or_create(
        &self,
        key: &Key,
        create: impl FnOnce() -> Result<Erased>,
    ) -> Result<Erased> {
        let slot = (self.container_id, key.clone());
        if let Some(hit) = THREAD_INSTANCES.with(|map| map.borrow().get(&slot).cloned()) {
            #[cfg(feature = "logging")]
            trace!(target: "keyed_injector", key = %key, "thread-local cache hit");
            return Ok(hit);
        }

        // The borrow is released during construction so nested resolutions
        // can populate their own entries on this thread.
        let instance = create()?;
        THREAD_INSTANCES.with(|map| {
            map.borrow_mut().insert(slot, Arc::clone(&instance));
        });
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn value(n: u32) -> Erased {
        Arc::new(n) as Erased
    }

    fn as_u32(erased: &Erased) -> u32 {
        *erased.downcast_ref::<u32>().unwrap()
    }

    #[test]
    fn test_singleton_constructs_once() {
        let store = SingletonStore::new();
        let key = Key::name("counter");
        let built = AtomicUsize::new(0);

        let create = || {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(value(7))
        };
        let first = store.get_or_create(&key, create).unwrap();
        let second = store
            .get_or_create(&key, || panic!("must not rebuild"))
            .unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_singleton_race_has_one_winner() {
        let store = SingletonStore::new();
        let key = Key::name("raced");
        let built = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        store
                            .get_or_create(&key, || {
                                built.fetch_add(1, Ordering::SeqCst);
                                std::thread::sleep(Duration::from_millis(5));
                                Ok(value(1))
                            })
                            .unwrap()
                    })
                })
                .collect();

            let instances: Vec<Erased> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            for instance in &instances[1..] {
                assert!(Arc::ptr_eq(&instances[0], instance));
            }
        });

        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_singleton_failure_leaves_no_entry() {
        let store = SingletonStore::new();
        let key = Key::name("flaky");

        let err = store
            .get_or_create(&key, || Err(DiError::creation_failed::<u32>("nope")))
            .unwrap_err();
        assert!(matches!(err, DiError::CreationFailed { .. }));

        // The next attempt constructs normally.
        let ok = store.get_or_create(&key, || Ok(value(9))).unwrap();
        assert_eq!(as_u32(&ok), 9);
    }

    #[test]
    fn test_seed_overwrites() {
        let store = SingletonStore::new();
        let key = Key::name("seeded");

        store.seed(key.clone(), value(1));
        store.seed(key.clone(), value(2));

        let got = store
            .get_or_create(&key, || panic!("seeded key must not construct"))
            .unwrap();
        assert_eq!(as_u32(&got), 2);
    }

    #[test]
    fn test_weak_entry_lives_while_referenced() {
        let store = WeakStore::new();
        let key = Key::name("weak");

        let first = store.get_or_create(&key, || Ok(value(3))).unwrap();
        let second = store
            .get_or_create(&key, || panic!("still alive"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_weak_entry_reconstructs_after_drop() {
        let store = WeakStore::new();
        let key = Key::name("weak");
        let built = AtomicUsize::new(0);

        let first = store
            .get_or_create(&key, || {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(value(4))
            })
            .unwrap();
        drop(first);

        let second = store
            .get_or_create(&key, || {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(value(5))
            })
            .unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(as_u32(&second), 5);
    }

    #[test]
    fn test_weak_failure_leaves_no_entry() {
        let store = WeakStore::new();
        let key = Key::name("weak");

        store
            .get_or_create(&key, || Err(DiError::creation_failed::<u32>("nope")))
            .unwrap_err();

        let ok = store.get_or_create(&key, || Ok(value(6))).unwrap();
        assert_eq!(as_u32(&ok), 6);
    }

    #[test]
    fn test_thread_local_isolated_per_thread() {
        let store = ThreadLocalStore::new(u64::MAX);
        let key = Key::name("tls");

        let here = store.get_or_create(&key, || Ok(value(1))).unwrap();
        let here_again = store
            .get_or_create(&key, || panic!("cached on this thread"))
            .unwrap();
        assert!(Arc::ptr_eq(&here, &here_again));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                // A different thread sees an empty partition.
                let there = store.get_or_create(&key, || Ok(value(2))).unwrap();
                assert_eq!(as_u32(&there), 2);
            });
        });

        assert_eq!(as_u32(&here), 1);
    }

    #[test]
    fn test_thread_local_partitioned_by_container() {
        let a = ThreadLocalStore::new(u64::MAX - 1);
        let b = ThreadLocalStore::new(u64::MAX - 2);
        let key = Key::name("tls");

        let in_a = a.get_or_create(&key, || Ok(value(1))).unwrap();
        let in_b = b.get_or_create(&key, || Ok(value(2))).unwrap();
        assert!(!Arc::ptr_eq(&in_a, &in_b));
    }
}
