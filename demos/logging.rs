//! Example demonstrating logging output during registration and resolution
//!
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use keyed_injector::{Args, Construct, Container, Lifetime, Parameter, Result};
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

impl Construct for Database {
    fn build(_args: &mut Args) -> Result<Self> {
        Ok(Database {
            url: "postgres://localhost/mydb".into(),
        })
    }
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
}

impl Construct for UserService {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::keyed("db", "database")]
    }

    fn build(args: &mut Args) -> Result<Self> {
        Ok(UserService { db: args.take()? })
    }
}

fn main() {
    keyed_injector::logging::builder()
        .trace()
        .di_only()
        .pretty()
        .init();

    println!("=== Keyed Injector Logging Demo ===\n");

    // Each of these emits a debug event under the keyed_injector target
    let container = Container::new();
    container
        .register::<Database>()
        .set_lifetime(Lifetime::Singleton);
    container.register::<UserService>();

    // First resolution logs the construction; the second logs a cache hit
    // for the singleton database
    let _users = container.resolve_by_key::<UserService>("userservice").unwrap();
    let _users = container.resolve_by_key::<UserService>("userservice").unwrap();

    // Misses are logged too
    let _ = container.resolve_by_key::<Database>("missing");

    println!("\ndone - see the events above");
}
