//! # Cross-node property tests
//!
//! One file per tested property. Most drive a [`crate::harness::TestNetwork`]
//! directly rather than going over the wire, since the properties under
//! test live in `Core`/`Poset`, not in the transport; `gossip_driver_catch_up`
//! is the exception, exercising the real sync transport and gossip driver.

mod add_transaction;
mod bootstrap_all_nodes;
mod catch_up;
mod fast_forward;
mod gossip_driver_catch_up;
mod process_sync;
mod sync_limit;
