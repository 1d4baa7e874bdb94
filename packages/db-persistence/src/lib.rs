//! Disk persistence and schema serialization.
//!
//! This crate handles binary snapshots to disk and JSON schema serialization.

pub mod serialization;
pub mod snapshot;
