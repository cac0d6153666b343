//! Registry and cache keys
//!
//! Registrations and cached instances share one key space made of three
//! disjoint namespaces: plain string keys, type keys, and the synthetic keys
//! used by type-based resolution. Keeping them in one enum means a
//! string-keyed registration can never collide with a type-keyed one.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::discriminant;
use std::sync::Arc;

/// A key identifying one registration (and its cache entries).
///
/// String keys are case-normalized to lowercase on construction, so
/// `"Database"` and `"database"` address the same registration.
#[derive(Clone, Debug)]
pub enum Key {
    /// A plain string key (lowercased)
    Name(Arc<str>),
    /// A registration stored under a type itself (the target of
    /// type-annotated constructor parameters)
    Type(TypeId, &'static str),
    /// The internal namespace used by type-based resolution; never reachable
    /// from string or type keys
    Synthetic(TypeId, &'static str),
}

impl Key {
    /// A string key, normalized to lowercase.
    #[inline]
    pub fn name(key: &str) -> Self {
        Key::Name(Arc::from(key.to_lowercase()))
    }

    /// The key a type is stored under when registered by type.
    #[inline]
    pub fn of_type<T: 'static>() -> Self {
        Key::Type(TypeId::of::<T>(), simple_name(std::any::type_name::<T>()))
    }

    /// The default string key for a type: its simple name, lowercased.
    #[inline]
    pub fn default_for<T: 'static>() -> Self {
        Key::name(simple_name(std::any::type_name::<T>()))
    }

    /// The internal cache key synthesized by `resolve_by_type`.
    #[inline]
    pub(crate) fn synthetic<T: 'static>() -> Self {
        Key::Synthetic(TypeId::of::<T>(), simple_name(std::any::type_name::<T>()))
    }
}

// The carried type name is display-only; identity is the TypeId.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Name(a), Key::Name(b)) => a == b,
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Synthetic(a, _), Key::Synthetic(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        match self {
            Key::Name(name) => name.hash(state),
            Key::Type(id, _) | Key::Synthetic(id, _) => id.hash(state),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Type(_, name) => write!(f, "type:{name}"),
            Key::Synthetic(_, name) => write!(f, "type::{}", name.to_lowercase()),
        }
    }
}

/// Strip the module path and generic arguments from a full type name.
///
/// `std::any::type_name` yields names like `my_app::services::Database` or
/// `alloc::vec::Vec<u32>`; the registry only wants the `Database` part.
pub(crate) fn simple_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
