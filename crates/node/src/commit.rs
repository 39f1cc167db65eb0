//! # Commit loop
//!
//! Drains Poset's block-commit channel, hands each block to the
//! application via [`Proxy::commit_block`], and gossips the resulting
//! signature by enqueueing it for the next self-event. The application
//! dropping its side (`ProxyError::Closed`) is logged and the block
//! skipped rather than treated as fatal: consensus itself isn't at risk,
//! only this node's ability to report an application-level state hash.

use node_core::Core;
use shared_types::Block;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

pub async fn run(
    mut blocks: mpsc::Receiver<Block>,
    proxy: Arc<proxy::Proxy>,
    core: Arc<Core>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let block = tokio::select! {
            block = blocks.recv() => match block {
                Some(block) => block,
                None => break,
            },
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        let index = block.index;
        match proxy.commit_block(block.clone()).await {
            Ok(state_hash) => {
                info!(index, "block committed");
                let signature = core.sign_block(index, state_hash);
                if let Err(err) = core.submit_block_signature(signature) {
                    warn!(index, %err, "block-signature pool full, signature dropped");
                }
            }
            Err(err) => warn!(index, %err, "application did not acknowledge committed block"),
        }
    }
}
