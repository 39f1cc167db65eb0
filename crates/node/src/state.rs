//! # Node state handle
//!
//! A shared, lock-guarded [`NodeState`] read by every loop and written
//! by whichever one observes a transition (the gossip loop on
//! `sync_limit`/successful fast-forward, `main` on shutdown).

use parking_lot::RwLock;
use shared_types::NodeState;
use std::sync::Arc;

#[derive(Clone)]
pub struct NodeStateHandle(Arc<RwLock<NodeState>>);

impl NodeStateHandle {
    pub fn new(initial: NodeState) -> Self {
        Self(Arc::new(RwLock::new(initial)))
    }

    pub fn get(&self) -> NodeState {
        *self.0.read()
    }

    pub fn set(&self, state: NodeState) {
        *self.0.write() = state;
    }
}
