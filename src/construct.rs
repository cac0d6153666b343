//! Constructor descriptors for container-built types
//!
//! Rust has no runtime constructor introspection, so types describe their own
//! constructor shape: an ordered list of [`Parameter`] descriptors plus a
//! [`Construct::build`] function that consumes the arguments the container
//! resolved. The binding precedence (annotation, then parameter name, then
//! declared default) lives in the container, not here.

use crate::error::{DiError, Result};
use crate::key::{Key, simple_name};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// A type-erased instance as it moves through the container and its caches.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

type DefaultFn = Box<dyn Fn() -> Erased + Send + Sync>;

/// A type the container can construct.
///
/// # Examples
///
/// ```rust
/// use keyed_injector::{Args, Construct, Parameter, Result};
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
///         vec![Parameter::new("db")]
///     }
///
///     fn build(args: &mut Args) -> Result<Self> {
///         Ok(UserService { db: args.take()? })
///     }
/// }
/// ```
pub trait Construct: Send + Sync + Sized + 'static {
    /// Constructor parameters, in declaration order.
    ///
    /// Defaults to a parameterless constructor.
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    /// Invoke the constructor with the arguments the container bound.
    ///
    /// Arguments arrive in the same order as [`Construct::parameters`].
    fn build(args: &mut Args) -> Result<Self>;
}

/// How one constructor parameter is looked up.
pub(crate) enum Bind {
    /// Annotated with an explicit string key
    Key(&'static str),
    /// Annotated with a type; resolves against the type-keyed registration
    Type(TypeId, &'static str),
}

/// One constructor parameter: a name, an optional binding annotation, and an
/// optional default value used when no registration matches.
pub struct Parameter {
    name: &'static str,
    bind: Option<Bind>,
    default: Option<DefaultFn>,
}

impl Parameter {
    /// An unannotated parameter; resolves by its own name, lowercased.
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            bind: None,
            default: None,
        }
    }

    /// A parameter annotated with an explicit string key.
    #[inline]
    pub fn keyed(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            bind: Some(Bind::Key(key)),
            default: None,
        }
    }

    /// A parameter annotated with a type; resolves against the registration
    /// stored by [`Container::register_typed`](crate::Container::register_typed).
    #[inline]
    pub fn typed<T: Send + Sync + 'static>(name: &'static str) -> Self {
        Self {
            name,
            bind: Some(Bind::Type(
                TypeId::of::<T>(),
                simple_name(std::any::type_name::<T>()),
            )),
            default: None,
        }
    }

    /// Attach a default value, used only when resolution fails with NotFound.
    pub fn with_default<T, F>(mut self, default: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(Box::new(move || Arc::new(default()) as Erased));
        self
    }

    /// The registry key this parameter resolves through.
    pub(crate) fn lookup_key(&self) -> Key {
        match &self.bind {
            Some(Bind::Key(key)) => Key::name(key),
            Some(Bind::Type(id, name)) => Key::Type(*id, *name),
            None => Key::name(self.name),
        }
    }

    pub(crate) fn default_value(&self) -> Option<Erased> {
        self.default.as_ref().map(|default| default())
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("key", &self.lookup_key())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// The resolved constructor arguments handed to [`Construct::build`], in
/// parameter declaration order.
pub struct Args {
    values: std::vec::IntoIter<Erased>,
}

impl Args {
    pub(crate) fn new(values: Vec<Erased>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// Take the next argument, downcast to the parameter's type.
    pub fn take<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>> {
        let value = self
            .values
            .next()
            .ok_or_else(DiError::missing_argument::<T>)?;
        value
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>())
    }

    /// Number of arguments not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}
