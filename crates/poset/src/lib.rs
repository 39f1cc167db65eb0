//! # Poset
//!
//! The DAG/virtual-voting consensus core: event insertion, round
//! assignment, strongly-see, fame election, round-received and
//! consensus ordering, block assembly, fork bookkeeping, and
//! fast-forward/reset.
//!
//! Poset owns the in-memory cached decorations for every event (round,
//! witness flag, fame, flag table); [`store::Store`] owns the durable
//! representation of the raw event. Poset never calls back into Core;
//! the commit channel (`tokio::sync::mpsc::Sender<Block>`) is its only
//! output boundary.

mod ancestry;
mod ordering;
mod poset;
mod voting;

pub use poset::{InsertOutcome, Poset, PosetConfig};
pub use shared_types::PosetError;
