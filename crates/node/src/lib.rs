//! # Node library
//!
//! Exposes the gossip driver, state machine, and startup plumbing for the
//! `node` binary. Split into a library so the integration test suite can
//! build a [`handler::CoreSyncHandler`] and a [`gossip::GossipDriver`] the
//! same way `main.rs` does, over real `Core`/`Poset`/`Store` instances,
//! instead of re-deriving the wiring in test code.

pub mod commit;
pub mod config;
pub mod default_app;
pub mod fatal;
pub mod gossip;
pub mod handler;
pub mod intake;
pub mod keys;
pub mod peers;
pub mod state;
