//! # Store
//!
//! Persistence and cache for events, rounds, blocks, and frames.
//!
//! `ports` defines the `Store` trait the rest of the engine depends on;
//! `adapters` provides an in-memory LRU-cached backend (used for tests
//! and as the read cache in front of the persistent backend) and a
//! RocksDB-backed persistent backend.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use domain::keys;
pub use ports::Store;
