//! # Sync handler
//!
//! Implements `sync::SyncHandler` over a running [`Core`], the seam that
//! lets the `sync` crate stay ignorant of `node-core`.

use node_core::Core;
use shared_types::{Block, BlockSignature, Frame, WireEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use store::Store;
use sync::SyncHandler;

pub struct CoreSyncHandler {
    core: Arc<Core>,
    store: Arc<dyn Store>,
}

impl CoreSyncHandler {
    pub fn new(core: Arc<Core>, store: Arc<dyn Store>) -> Self {
        Self { core, store }
    }
}

impl SyncHandler for CoreSyncHandler {
    fn self_id(&self) -> u64 {
        self.core.self_id()
    }

    fn known_events(&self) -> Result<BTreeMap<u64, u64>, String> {
        self.core.known_events().map_err(|err| err.to_string())
    }

    fn event_diff(&self, known: &BTreeMap<u64, u64>) -> Result<Vec<WireEvent>, String> {
        self.core.event_diff(known).map_err(|err| err.to_string())
    }

    fn insert_events(&self, events: Vec<WireEvent>) -> bool {
        match self.core.sync(events) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "eager-sync push could not be fully applied");
                false
            }
        }
    }

    fn fast_forward_snapshot(&self) -> Option<(Block, Frame)> {
        let index = self.store.last_block_index().ok()??;
        let block = self.store.get_block(index).ok()?;
        let frame = self.store.get_frame(block.round_received).ok()?;
        Some((block, frame))
    }

    fn block_signatures(&self, from_index: u64, to_index: u64) -> Vec<(u64, BlockSignature)> {
        (from_index..=to_index)
            .filter_map(|index| self.store.get_block(index).ok())
            .flat_map(|block| {
                block
                    .signatures
                    .into_iter()
                    .map(move |sig| (block.index, sig))
            })
            .collect()
    }
}
