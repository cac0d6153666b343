//! Registration records and lifetime policies

use crate::construct::{Construct, Erased};
use crate::container::Container;
use crate::error::{DiError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// How instances produced for a key are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Lifetime {
    /// Fresh instance on every resolve
    #[default]
    Transient = 0,

    /// One lazily constructed instance for the container's life
    Singleton = 1,

    /// One instance while strongly referenced somewhere else; reconstructed
    /// after the last owner drops
    WeakReference = 2,

    /// One lazily constructed instance per calling thread
    ThreadLocal = 3,
}

impl Lifetime {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Lifetime::Singleton,
            2 => Lifetime::WeakReference,
            3 => Lifetime::ThreadLocal,
            _ => Lifetime::Transient,
        }
    }
}

pub(crate) type ProduceFn = Arc<dyn Fn(&Container) -> Result<Erased> + Send + Sync>;

/// How to produce instances for one key.
///
/// The `register*` methods return the stored `Registration` so the caller can
/// adjust its lifetime before the first resolution:
///
/// ```rust
/// use keyed_injector::{Args, Construct, Container, Lifetime, Result};
///
/// struct Cache;
///
/// impl Construct for Cache {
///     fn build(_args: &mut Args) -> Result<Self> {
///         Ok(Cache)
///     }
/// }
///
/// let container = Container::new();
/// container.register::<Cache>().set_lifetime(Lifetime::Singleton);
/// ```
///
/// Changing the lifetime after a key has already been resolved leaves any
/// previously cached instance in place; cache consistency across such a
/// change is undefined.
pub struct Registration {
    produce: ProduceFn,
    lifetime: AtomicU8,
    type_name: &'static str,
}

impl Registration {
    /// A registration that constructs `T` through its declared parameters.
    pub(crate) fn of<T: Construct>() -> Self {
        Self {
            produce: Arc::new(|container: &Container| {
                let mut args = container.bind_parameters(T::parameters())?;
                let value = T::build(&mut args)?;
                Ok(Arc::new(value) as Erased)
            }),
            lifetime: AtomicU8::new(Lifetime::Transient as u8),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// A registration backing a pre-built instance.
    ///
    /// The singleton cache is seeded at registration time, so this produce
    /// function is unreachable unless the caller later switches the lifetime
    /// away from Singleton; an instance registration cannot construct new
    /// values, so that misuse surfaces as a CreationFailed error.
    pub(crate) fn instance<T: Send + Sync + 'static>() -> Self {
        Self {
            produce: Arc::new(|_: &Container| {
                Err(DiError::creation_failed::<T>(
                    "instance registrations cannot construct new values",
                ))
            }),
            lifetime: AtomicU8::new(Lifetime::Singleton as u8),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The current lifetime policy.
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        Lifetime::from_u8(self.lifetime.load(Ordering::Relaxed))
    }

    /// Change the lifetime policy. Intended to be called between registration
    /// and the first resolution of the key.
    #[inline]
    pub fn set_lifetime(&self, lifetime: Lifetime) {
        self.lifetime.store(lifetime as u8, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn produce(&self, container: &Container) -> Result<Erased> {
        (self.produce)(container)
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("type_name", &self.type_name)
            .field("lifetime", &self.lifetime())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::Args;

    struct Widget;

    impl Construct for Widget {
        fn build(_args: &mut Args) -> Result<Self> {
            Ok(Widget)
        }
    }

    #[test]
    fn test_default_lifetime_is_transient() {
        let registration = Registration::of::<Widget>();
        assert_eq!(registration.lifetime(), Lifetime::Transient);
    }

    #[test]
    fn test_set_lifetime() {
        let registration = Registration::of::<Widget>();
        registration.set_lifetime(Lifetime::ThreadLocal);
        assert_eq!(registration.lifetime(), Lifetime::ThreadLocal);
    }

    #[test]
    fn test_instance_registration_is_singleton() {
        let registration = Registration::instance::<Widget>();
        assert_eq!(registration.lifetime(), Lifetime::Singleton);
    }

    #[test]
    fn test_instance_registration_cannot_produce() {
        let registration = Registration::instance::<Widget>();
        let container = Container::new();
        let err = registration.produce(&container).unwrap_err();
        assert!(matches!(err, DiError::CreationFailed { .. }));
    }

    #[test]
    fn test_lifetime_round_trips_through_u8() {
        for lifetime in [
            Lifetime::Transient,
            Lifetime::Singleton,
            Lifetime::WeakReference,
            Lifetime::ThreadLocal,
        ] {
            assert_eq!(Lifetime::from_u8(lifetime as u8), lifetime);
        }
    }
}
