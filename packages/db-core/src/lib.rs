//! Core storage engine for in-memory relational database.
//!
//! This crate provides the foundational storage layer with zero-copy access,
//! cache-efficient layout, and atomic operations.

pub mod schema;
pub mod storage;
