//! # Consensus integration test suite
//!
//! Cross-node tests for the poset engine: multiple `Core`/`Poset` pairs,
//! each over its own store, gossiping with each other the way the node
//! binary's gossip driver does but driven directly from test code.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs      # multi-node test network builder
//! └── integration/     # one file per tested property
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
