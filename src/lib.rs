//! # Keyed Injector - Key-Based Dependency Injection for Rust
//!
//! An IoC container that maps logical string keys (and types) to
//! instantiation rules and resolves whole object graphs by binding
//! constructor parameters recursively.
//!
//! ## Features
//!
//! - 🔑 **Keyed registry** - services live under lowercased string keys or type keys
//! - 🏗️ **Constructor wiring** - parameters resolve by annotation, by name, or fall back to defaults
//! - ♻️ **Transient** - fresh instance on every resolve
//! - 🏭 **Lazy singletons** - one instance per container, created on first access
//! - 🪶 **Weak references** - singleton while referenced, reconstructed after the last owner drops
//! - 🧵 **Thread-local** - one instance per calling thread, no cross-thread locking
//! - 📊 **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use keyed_injector::{Args, Construct, Container, Lifetime, Parameter, Result};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! impl Construct for Database {
//!     fn build(_args: &mut Args) -> Result<Self> {
//!         Ok(Database { url: "postgres://localhost".into() })
//!     }
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Construct for UserService {
//!     fn parameters() -> Vec<Parameter> {
//!         // Unannotated: binds to the key "db"
//!         vec![Parameter::new("db")]
//!     }
//!
//!     fn build(args: &mut Args) -> Result<Self> {
//!         Ok(UserService { db: args.take()? })
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_keyed::<Database>("db").set_lifetime(Lifetime::Singleton);
//! container.register::<UserService>();
//!
//! let users = container.resolve_by_key::<UserService>("userservice")?;
//! assert_eq!(users.db.url, "postgres://localhost");
//! # Ok::<(), keyed_injector::DiError>(())
//! ```
//!
//! ## Service Lifetimes
//!
//! ```rust
//! use keyed_injector::{Args, Construct, Container, Lifetime, Result};
//!
//! struct Config;
//!
//! impl Construct for Config {
//!     fn build(_args: &mut Args) -> Result<Self> {
//!         Ok(Config)
//!     }
//! }
//!
//! let container = Container::new();
//!
//! // Transient (the default) - new instance every call
//! container.register_keyed::<Config>("fresh");
//!
//! // Singleton - one instance for the container's life
//! container.register_keyed::<Config>("shared").set_lifetime(Lifetime::Singleton);
//!
//! // WeakReference - shared while some caller holds it
//! container.register_keyed::<Config>("cached").set_lifetime(Lifetime::WeakReference);
//!
//! // ThreadLocal - one instance per calling thread
//! container.register_keyed::<Config>("local").set_lifetime(Lifetime::ThreadLocal);
//! ```
//!
//! ## Parameter Binding
//!
//! Each constructor parameter resolves independently, in declaration order:
//!
//! 1. [`Parameter::keyed`] - annotated with an explicit string key
//! 2. [`Parameter::typed`] - annotated with a type, resolved against the
//!    type-keyed registration
//! 3. [`Parameter::new`] - unannotated, resolved by its own name, lowercased
//! 4. A default attached via [`Parameter::with_default`] is used only when
//!    resolution fails with [`DiError::NotFound`]
//!
//! Resolution is recursive; registering a dependency cycle recurses until the
//! stack runs out, by design - cycle detection is out of scope.

mod caches;
mod construct;
mod container;
mod error;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod registration;

pub use construct::{Args, Construct, Parameter};
pub use container::Container;
pub use error::{DiError, Result};
pub use key::Key;
pub use registration::{Lifetime, Registration};

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Args, Construct, Container, DiError, Lifetime, Parameter, Result};
    pub use std::sync::Arc;
}
