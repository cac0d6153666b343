//! Example demonstrating the four service lifetimes
//!
//! ```bash
//! cargo run --example lifetimes
//! ```

use keyed_injector::{Args, Construct, Container, Lifetime, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static SERIAL: AtomicUsize = AtomicUsize::new(0);

struct Service {
    serial: usize,
}

impl Construct for Service {
    fn build(_args: &mut Args) -> Result<Self> {
        Ok(Service {
            serial: SERIAL.fetch_add(1, Ordering::SeqCst),
        })
    }
}

fn main() {
    let container = Container::new();

    container.register_keyed::<Service>("fresh");
    container
        .register_keyed::<Service>("shared")
        .set_lifetime(Lifetime::Singleton);
    container
        .register_keyed::<Service>("cached")
        .set_lifetime(Lifetime::WeakReference);
    container
        .register_keyed::<Service>("local")
        .set_lifetime(Lifetime::ThreadLocal);

    println!("=== Keyed Injector Lifetimes Demo ===\n");

    // Transient: a new serial every resolve
    let a = container.resolve_by_key::<Service>("fresh").unwrap();
    let b = container.resolve_by_key::<Service>("fresh").unwrap();
    println!("transient:      {} then {}", a.serial, b.serial);

    // Singleton: one serial forever
    let a = container.resolve_by_key::<Service>("shared").unwrap();
    let b = container.resolve_by_key::<Service>("shared").unwrap();
    println!("singleton:      {} then {}", a.serial, b.serial);

    // WeakReference: stable while held, reconstructed after release
    let held = container.resolve_by_key::<Service>("cached").unwrap();
    let alias = container.resolve_by_key::<Service>("cached").unwrap();
    println!("weak (held):    {} then {}", held.serial, alias.serial);
    drop(held);
    drop(alias);
    let fresh = container.resolve_by_key::<Service>("cached").unwrap();
    println!("weak (dropped): reconstructed as {}", fresh.serial);

    // ThreadLocal: each thread gets its own instance
    let here = container.resolve_by_key::<Service>("local").unwrap();
    let there: Arc<Service> = std::thread::scope(|scope| {
        scope
            .spawn(|| container.resolve_by_key::<Service>("local").unwrap())
            .join()
            .unwrap()
    });
    println!("thread-local:   {} here, {} on the other thread", here.serial, there.serial);
}
