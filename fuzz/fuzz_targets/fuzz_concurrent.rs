#![no_main]

//! Fuzz target for concurrent resolution
//!
//! Registers keys with arbitrary lifetimes up front, then hammers the
//! container from several threads. Checks that caching lifetimes never hand
//! two racing resolvers different instances.

use arbitrary::Arbitrary;
use keyed_injector::{Args, Construct, Container, Lifetime, Result};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const KEYS: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

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
struct Scenario {
    lifetimes: [FuzzLifetime; 4],
    thread_count: u8,
    rounds: u8,
}

struct Service;

impl Construct for Service {
    fn build(_args: &mut Args) -> Result<Self> {
        Ok(Service)
    }
}

fuzz_target!(|scenario: Scenario| {
    let container = Container::new();
    let mut singleton_keys = Vec::new();

    for (key, lifetime) in KEYS.iter().zip(scenario.lifetimes) {
        container
            .register_keyed::<Service>(key)
            .set_lifetime(lifetime.into());
        if matches!(lifetime, FuzzLifetime::Singleton) {
            singleton_keys.push(*key);
        }
    }

    let threads = (scenario.thread_count % 4).max(1) as usize;
    let rounds = (scenario.rounds % 16).max(1) as usize;

    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                for round in 0..rounds {
                    let key = KEYS[round % KEYS.len()];
                    let a = container.resolve_by_key::<Service>(key).unwrap();
                    let b = container.resolve_by_key::<Service>(key).unwrap();
                    drop((a, b));
                }
            });
        }
    });

    // Singletons must be stable across the whole run: every thread that raced
    // above observed some instance, and the survivor is the one cached now.
    for key in singleton_keys {
        let a = container.resolve_by_key::<Service>(key).unwrap();
        let b = container.resolve_by_key::<Service>(key).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
});
