//! The dependency injection container
//!
//! The `Container` is both registry and resolver. It stores registrations
//! under string or type keys and builds object graphs by binding constructor
//! parameters recursively.

use crate::caches::{SingletonStore, ThreadLocalStore, WeakStore};
use crate::construct::{Args, Construct, Erased, Parameter};
use crate::error::{DiError, Result};
use crate::key::Key;
use crate::registration::{Lifetime, Registration};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Downcast an `Arc<dyn Any + Send + Sync>` to `Arc<T>` without a runtime
/// type check.
///
/// # Safety
///
/// The erased value must have been created from a value of type `T`. In this
/// crate that holds on the `resolve_by_type` path, where the producing
/// registration is built from `T` itself.
#[inline]
unsafe fn downcast_unchecked<T: Send + Sync + 'static>(erased: Erased) -> Arc<T> {
    let ptr = Arc::into_raw(erased);
    // SAFETY: ptr came from Arc::into_raw and the caller guarantees the
    // allocation holds a T.
    unsafe { Arc::from_raw(ptr as *const T) }
}

/// Container used for registering and resolving components.
///
/// Registration is expected to finish before concurrent resolution traffic
/// starts; resolution itself is safe from any number of threads. The
/// container is an explicitly owned value with no global state beyond the
/// per-thread instance partitions, which are keyed by a unique container id.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{Args, Construct, Container, Lifetime, Parameter, Result};
/// use std::sync::Arc;
///
/// struct Database;
///
/// impl Construct for Database {
///     fn build(_args: &mut Args) -> Result<Self> {
///         Ok(Database)
///     }
/// }
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// impl Construct for UserService {
///     fn parameters() -> Vec<Parameter> {
///         vec![Parameter::keyed("db", "database")]
///     }
///
///     fn build(args: &mut Args) -> Result<Self> {
///         Ok(UserService { db: args.take()? })
///     }
/// }
///
/// let container = Container::new();
/// container.register::<Database>().set_lifetime(Lifetime::Singleton);
/// container.register::<UserService>();
///
/// let users = container.resolve_by_key::<UserService>("userservice")?;
/// let db = container.resolve_by_key::<Database>("database")?;
/// assert!(Arc::ptr_eq(&users.db, &db));
/// # Ok::<(), keyed_injector::DiError>(())
/// ```
pub struct Container {
    registry: DashMap<Key, Arc<Registration>, RandomState>,
    singletons: SingletonStore,
    weak_refs: WeakStore,
    thread_locals: ThreadLocalStore,
    id: u64,
}

impl Container {
    /// Create a new, empty container.
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "logging")]
        debug!(target: "keyed_injector", container = id, "creating container");

        Self {
            registry: DashMap::with_hasher(RandomState::new()),
            singletons: SingletonStore::new(),
            weak_refs: WeakStore::new(),
            thread_locals: ThreadLocalStore::new(id),
            id,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register `T` under its default key: the type's simple name, lowercased.
    ///
    /// The returned registration starts Transient; adjust it via
    /// [`Registration::set_lifetime`] before the first resolution.
    pub fn register<T: Construct>(&self) -> Arc<Registration> {
        self.insert_registration(Key::default_for::<T>(), Registration::of::<T>())
    }

    /// Register `T` under an explicit string key (lowercased).
    pub fn register_keyed<T: Construct>(&self, key: &str) -> Arc<Registration> {
        self.insert_registration(Key::name(key), Registration::of::<T>())
    }

    /// Register `T` under its type key, the target of
    /// [`Parameter::typed`] constructor parameters.
    pub fn register_typed<T: Construct>(&self) -> Arc<Registration> {
        self.insert_registration(Key::of_type::<T>(), Registration::of::<T>())
    }

    /// Register a pre-built instance under its default key.
    ///
    /// The instance becomes an implicit Singleton: every resolution of the
    /// key returns this exact value.
    pub fn register_instance<T: Send + Sync + 'static>(&self, instance: T) {
        self.seed_instance(Key::default_for::<T>(), instance);
    }

    /// Register a pre-built instance under an explicit string key.
    pub fn register_instance_keyed<T: Send + Sync + 'static>(&self, instance: T, key: &str) {
        self.seed_instance(Key::name(key), instance);
    }

    fn insert_registration(&self, key: Key, registration: Registration) -> Arc<Registration> {
        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            container = self.id,
            key = %key,
            service = registration.type_name(),
            lifetime = ?registration.lifetime(),
            "registering"
        );

        let registration = Arc::new(registration);
        // Last registration for a key wins, silently.
        self.registry.insert(key, Arc::clone(&registration));
        registration
    }

    fn seed_instance<T: Send + Sync + 'static>(&self, key: Key, instance: T) {
        #[cfg(feature = "logging")]
        debug!(
            target: "keyed_injector",
            container = self.id,
            key = %key,
            service = std::any::type_name::<T>(),
            "registering pre-built instance"
        );

        self.registry
            .insert(key.clone(), Arc::new(Registration::instance::<T>()));
        self.singletons.seed(key, Arc::new(instance) as Erased);
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the registration stored under `key` (lowercased).
    ///
    /// Fails with [`DiError::NotFound`] when no registration matches, or
    /// [`DiError::TypeMismatch`] when the key produces something other than
    /// `T`.
    pub fn resolve_by_key<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        let key = Key::name(key);
        let erased = self.resolve_key_erased(&key)?;
        erased
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>())
    }

    /// Construct a fresh `T`, resolving its constructor parameters through
    /// the registry.
    ///
    /// Type-based resolution deliberately bypasses the registry: it uses a
    /// synthetic key in its own namespace and a throwaway Transient
    /// registration, so a stored lifetime for the same type is never
    /// consulted and every call constructs anew.
    pub fn resolve_by_type<T: Construct>(&self) -> Result<Arc<T>> {
        let key = Key::synthetic::<T>();

        #[cfg(feature = "logging")]
        trace!(
            target: "keyed_injector",
            container = self.id,
            key = %key,
            "resolving by type"
        );

        let registration = Registration::of::<T>();
        let erased = self.produce_for(&key, &registration)?;
        // SAFETY: the registration was built from T, so the erased value
        // holds a T.
        Ok(unsafe { downcast_unchecked(erased) })
    }

    /// Resolve a key to a type-erased instance. Shared by the typed public
    /// entry points and by parameter binding, where the target type is not
    /// known statically.
    pub(crate) fn resolve_key_erased(&self, key: &Key) -> Result<Erased> {
        let registration = match self.registry.get(key) {
            Some(entry) => Arc::clone(&*entry),
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "keyed_injector",
                    container = self.id,
                    key = %key,
                    "no registration for key"
                );
                return Err(DiError::not_found(key.clone()));
            }
        };
        // The registry guard is dropped before production; nested parameter
        // resolutions re-enter the registry.
        self.produce_for(key, &registration)
    }

    /// Dispatch production to the cache strategy selected by the
    /// registration's lifetime.
    fn produce_for(&self, key: &Key, registration: &Registration) -> Result<Erased> {
        let create = || {
            #[cfg(feature = "logging")]
            trace!(
                target: "keyed_injector",
                container = self.id,
                key = %key,
                service = registration.type_name(),
                "constructing instance"
            );
            registration.produce(self)
        };

        match registration.lifetime() {
            Lifetime::Transient => create(),
            Lifetime::Singleton => self.singletons.get_or_create(key, create),
            Lifetime::WeakReference => self.weak_refs.get_or_create(key, create),
            Lifetime::ThreadLocal => self.thread_locals.get_or_create(key, create),
        }
    }

    // =========================================================================
    // Parameter binding
    // =========================================================================

    /// Bind a constructor's parameters, in declaration order.
    pub(crate) fn bind_parameters(&self, parameters: Vec<Parameter>) -> Result<Args> {
        let mut values = Vec::with_capacity(parameters.len());
        for parameter in &parameters {
            values.push(self.bind_parameter(parameter)?);
        }
        Ok(Args::new(values))
    }

    /// Bind one parameter: annotation key, else lowercased name, falling back
    /// to the declared default only when resolution fails with NotFound.
    fn bind_parameter(&self, parameter: &Parameter) -> Result<Erased> {
        let key = parameter.lookup_key();
        match self.resolve_key_erased(&key) {
            Ok(value) => Ok(value),
            Err(err @ DiError::NotFound { .. }) => match parameter.default_value() {
                Some(default) => {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "keyed_injector",
                        container = self.id,
                        parameter = ?parameter,
                        "registration not found, using declared default"
                    );
                    Ok(default)
                }
                // The propagated error may come from a nested resolution, so
                // keep the original key instead of synthesizing a new one.
                None => Err(err),
            },
            Err(other) => Err(other),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check whether a string key has a registration.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.registry.contains_key(&Key::name(key))
    }

    /// Number of registrations.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check whether the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("registrations", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Foo;

    impl Construct for Foo {
        fn build(_args: &mut Args) -> Result<Self> {
            Ok(Foo)
        }
    }

    #[derive(Debug)]
    struct Bar;

    impl Construct for Bar {
        fn build(_args: &mut Args) -> Result<Self> {
            Ok(Bar)
        }
    }

    #[allow(dead_code)]
    #[derive(Debug)]
    struct Target {
        foo: Arc<Foo>,
        bar: Arc<Bar>,
    }

    impl Construct for Target {
        fn parameters() -> Vec<Parameter> {
            vec![Parameter::new("foo"), Parameter::new("bar")]
        }

        fn build(args: &mut Args) -> Result<Self> {
            Ok(Target {
                foo: args.take()?,
                bar: args.take()?,
            })
        }
    }

    #[test]
    fn test_resolve_unregistered_key_fails() {
        let container = Container::new();
        let err = container.resolve_by_key::<Foo>("missing").unwrap_err();
        match err {
            DiError::NotFound { key } => assert_eq!(key.to_string(), "missing"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_register_uses_lowercased_simple_name() {
        let container = Container::new();
        container.register::<Foo>();
        assert!(container.contains_key("foo"));
        assert!(container.contains_key("FOO"));
        container.resolve_by_key::<Foo>("foo").unwrap();
    }

    #[test]
    fn test_reregistering_overwrites_silently() {
        let container = Container::new();
        container.register_keyed::<Foo>("svc");
        container.register_keyed::<Bar>("svc");
        assert_eq!(container.len(), 1);

        container.resolve_by_key::<Bar>("svc").unwrap();
        let err = container.resolve_by_key::<Foo>("svc").unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_transient_yields_fresh_instances() {
        let container = Container::new();
        container.register_keyed::<Foo>("foo");

        let a = container.resolve_by_key::<Foo>("foo").unwrap();
        let b = container.resolve_by_key::<Foo>("foo").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_singleton_yields_same_instance() {
        let container = Container::new();
        container
            .register_keyed::<Foo>("foo")
            .set_lifetime(Lifetime::Singleton);

        let a = container.resolve_by_key::<Foo>("foo").unwrap();
        let b = container.resolve_by_key::<Foo>("foo").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_transitive_resolution_by_name() {
        let container = Container::new();
        container.register_keyed::<Foo>("foo");
        container.register::<Bar>();
        container.register_keyed::<Target>("target");

        let target = container.resolve_by_key::<Target>("target").unwrap();
        let again = container.resolve_by_key::<Target>("target").unwrap();
        // Transient all the way down: nothing is shared between calls.
        assert!(!Arc::ptr_eq(&target.foo, &again.foo));
        assert!(!Arc::ptr_eq(&target.bar, &again.bar));
    }

    #[test]
    fn test_missing_dependency_propagates_original_key() {
        let container = Container::new();
        // Target needs "foo" and "bar"; neither is registered.
        container.register_keyed::<Target>("target");

        let err = container.resolve_by_key::<Target>("target").unwrap_err();
        match err {
            DiError::NotFound { key } => assert_eq!(key.to_string(), "foo"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_construction_not_cached() {
        static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Flaky;

        impl Construct for Flaky {
            fn build(_args: &mut Args) -> Result<Self> {
                if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(DiError::creation_failed::<Flaky>("first attempt fails"));
                }
                Ok(Flaky)
            }
        }

        let container = Container::new();
        container
            .register_keyed::<Flaky>("flaky")
            .set_lifetime(Lifetime::Singleton);

        container.resolve_by_key::<Flaky>("flaky").unwrap_err();
        container.resolve_by_key::<Flaky>("flaky").unwrap();
        assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolve_by_type_ignores_stored_lifetime() {
        let container = Container::new();
        // Registered as Singleton under its name key...
        container.register::<Foo>().set_lifetime(Lifetime::Singleton);

        // ...but type-based resolution always constructs fresh.
        let a = container.resolve_by_type::<Foo>().unwrap();
        let b = container.resolve_by_type::<Foo>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        // The keyed singleton is unaffected.
        let c = container.resolve_by_key::<Foo>("foo").unwrap();
        let d = container.resolve_by_key::<Foo>("foo").unwrap();
        assert!(Arc::ptr_eq(&c, &d));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_type_annotated_parameters() {
        #[allow(dead_code)]
        struct TypeAnnotated {
            foo: Arc<Foo>,
            bar: Arc<Bar>,
        }

        impl Construct for TypeAnnotated {
            fn parameters() -> Vec<Parameter> {
                vec![Parameter::typed::<Foo>("foo"), Parameter::typed::<Bar>("bar")]
            }

            fn build(args: &mut Args) -> Result<Self> {
                Ok(TypeAnnotated {
                    foo: args.take()?,
                    bar: args.take()?,
                })
            }
        }

        let container = Container::new();
        container.register_typed::<Foo>();
        container.register_typed::<Bar>();

        let resolved = container.resolve_by_type::<TypeAnnotated>().unwrap();
        drop(resolved);
    }

    #[test]
    fn test_string_annotated_parameters() {
        #[allow(dead_code)]
        struct StringAnnotated {
            foo: Arc<Foo>,
        }

        impl Construct for StringAnnotated {
            fn parameters() -> Vec<Parameter> {
                vec![Parameter::keyed("anything", "foo")]
            }

            fn build(args: &mut Args) -> Result<Self> {
                Ok(StringAnnotated { foo: args.take()? })
            }
        }

        let container = Container::new();
        container.register_keyed::<Foo>("foo");

        container.resolve_by_type::<StringAnnotated>().unwrap();
    }

    #[test]
    fn test_type_key_and_name_key_do_not_collide() {
        let container = Container::new();
        container.register::<Foo>(); // key "foo"
        container.register_typed::<Foo>(); // key type:Foo
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_default_fallback() {
        struct WithDefault {
            retries: Arc<u32>,
        }

        impl Construct for WithDefault {
            fn parameters() -> Vec<Parameter> {
                vec![Parameter::new("retries").with_default(|| 3u32)]
            }

            fn build(args: &mut Args) -> Result<Self> {
                Ok(WithDefault {
                    retries: args.take()?,
                })
            }
        }

        let container = Container::new();
        let resolved = container.resolve_by_type::<WithDefault>().unwrap();
        assert_eq!(*resolved.retries, 3);
    }

    #[test]
    fn test_default_not_used_when_registered() {
        struct WithDefault {
            retries: Arc<u32>,
        }

        impl Construct for WithDefault {
            fn parameters() -> Vec<Parameter> {
                vec![Parameter::new("retries").with_default(|| 3u32)]
            }

            fn build(args: &mut Args) -> Result<Self> {
                Ok(WithDefault {
                    retries: args.take()?,
                })
            }
        }

        let container = Container::new();
        container.register_instance_keyed(7u32, "retries");

        let resolved = container.resolve_by_type::<WithDefault>().unwrap();
        assert_eq!(*resolved.retries, 7);
    }

    #[test]
    fn test_register_instance_identity() {
        let container = Container::new();
        container.register_instance_keyed(Foo, "foo");

        let a = container.resolve_by_key::<Foo>("foo").unwrap();
        let b = container.resolve_by_key::<Foo>("foo").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_register_instance_default_key() {
        let container = Container::new();
        container.register_instance(Bar);
        container.resolve_by_key::<Bar>("bar").unwrap();
    }

    #[test]
    fn test_resolve_wrong_type_fails() {
        let container = Container::new();
        container.register_keyed::<Foo>("foo");
        let err = container.resolve_by_key::<Bar>("foo").unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }
}
