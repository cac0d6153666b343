#![no_main]

//! Fuzz target for registration and resolution sequences
//!
//! Drives the container through arbitrary op sequences and checks the
//! lifetime invariants that must hold regardless of ordering. Dependent
//! registrations only ever land on keys disjoint from their dependencies, so
//! the generated graphs are acyclic (cycle detection is out of scope for the
//! container itself).

use arbitrary::Arbitrary;
use keyed_injector::{Args, Construct, Container, Lifetime, Parameter, Result};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

// Leaves and instances land on the first three keys, dependents on the rest.
const LEAF_KEYS: [&str; 3] = ["alpha", "beta", "gamma"];
const DEPENDENT_KEYS: [&str; 3] = ["delta", "epsilon", "zeta"];

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzLifetime {
    Transient,
    Singleton,
    WeakReference,
    ThreadLocal,
}

impl From<FuzzLifetime> for Lifetime {
    fn from(lifetime: FuzzLifetime) -> Self {
        match lifetime {
            FuzzLifetime::Transient => Lifetime::Transient,
            FuzzLifetime::Singleton => Lifetime::Singleton,
            FuzzLifetime::WeakReference => Lifetime::WeakReference,
            FuzzLifetime::ThreadLocal => Lifetime::ThreadLocal,
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    RegisterLeaf { key: u8, lifetime: FuzzLifetime },
    RegisterDependent { key: u8, dependency: u8 },
    RegisterInstance { key: u8, value: u32 },
    Resolve { key: u8 },
    ResolveTwiceAndCompare { key: u8 },
    ResolveByType,
}

/// What the harness last registered under a leaf key.
#[derive(Clone, Copy)]
enum Registered {
    Nothing,
    Leaf(FuzzLifetime),
    Instance,
}

struct Leaf;

impl Construct for Leaf {
    fn build(_args: &mut Args) -> Result<Self> {
        Ok(Leaf)
    }
}

// Type-based resolution routed through a default: it must succeed no matter
// what the op sequence registered.
struct Fallback {
    _value: Arc<u32>,
}

impl Construct for Fallback {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::new("nowhere").with_default(|| 0u32)]
    }

    fn build(args: &mut Args) -> Result<Self> {
        Ok(Fallback {
            _value: args.take()?,
        })
    }
}

macro_rules! dependent_on {
    ($name:ident, $key:expr) => {
        struct $name {
            _inner: Arc<Leaf>,
        }

        impl Construct for $name {
            fn parameters() -> Vec<Parameter> {
                vec![Parameter::keyed("inner", $key)]
            }

            fn build(args: &mut Args) -> Result<Self> {
                Ok($name {
                    _inner: args.take()?,
                })
            }
        }
    };
}

dependent_on!(DependsAlpha, "alpha");
dependent_on!(DependsBeta, "beta");
dependent_on!(DependsGamma, "gamma");

fuzz_target!(|ops: Vec<Op>| {
    let container = Container::new();
    let mut registered = [Registered::Nothing; 3];

    for op in ops.into_iter().take(64) {
        match op {
            Op::RegisterLeaf { key, lifetime } => {
                let slot = key as usize % LEAF_KEYS.len();
                container
                    .register_keyed::<Leaf>(LEAF_KEYS[slot])
                    .set_lifetime(lifetime.into());
                registered[slot] = Registered::Leaf(lifetime);
            }
            Op::RegisterDependent { key, dependency } => {
                let key = DEPENDENT_KEYS[key as usize % DEPENDENT_KEYS.len()];
                match dependency as usize % LEAF_KEYS.len() {
                    0 => drop(container.register_keyed::<DependsAlpha>(key)),
                    1 => drop(container.register_keyed::<DependsBeta>(key)),
                    _ => drop(container.register_keyed::<DependsGamma>(key)),
                }
            }
            Op::RegisterInstance { key, value } => {
                let slot = key as usize % LEAF_KEYS.len();
                container.register_instance_keyed(value, LEAF_KEYS[slot]);
                registered[slot] = Registered::Instance;
            }
            Op::Resolve { key } => {
                // Errors are expected (unregistered keys, mismatched types,
                // missing dependencies); panics are not.
                let all_keys = [LEAF_KEYS.as_slice(), DEPENDENT_KEYS.as_slice()].concat();
                let _ = container.resolve_by_key::<Leaf>(all_keys[key as usize % all_keys.len()]);
            }
            Op::ResolveTwiceAndCompare { key } => {
                let slot = key as usize % LEAF_KEYS.len();
                let key = LEAF_KEYS[slot];
                let Registered::Leaf(lifetime) = registered[slot] else {
                    continue;
                };
                // An overwritten registration can leave a stale cache entry
                // behind (cache consistency across re-registration is
                // undefined), so failed resolves are skipped, not asserted.
                let (Ok(a), Ok(b)) = (
                    container.resolve_by_key::<Leaf>(key),
                    container.resolve_by_key::<Leaf>(key),
                ) else {
                    continue;
                };
                match lifetime {
                    // Both results are held, so every caching lifetime must
                    // hand back the same instance on this thread.
                    FuzzLifetime::Singleton
                    | FuzzLifetime::WeakReference
                    | FuzzLifetime::ThreadLocal => assert!(Arc::ptr_eq(&a, &b)),
                    FuzzLifetime::Transient => assert!(!Arc::ptr_eq(&a, &b)),
                }
            }
            Op::ResolveByType => {
                let fallback = container
                    .resolve_by_type::<Fallback>()
                    .expect("defaulted parameter cannot fail");
                drop(fallback);
            }
        }
    }
});
