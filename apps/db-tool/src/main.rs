//! CLI tool for schema management and data inspection.
//!
//! Provides commands for:
//! - Schema migration and validation
//! - Data import/export
//! - Database inspection and debugging

fn main() {
    println!("db-tool starting...");
}
