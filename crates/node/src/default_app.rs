//! # Reference application
//!
//! A minimal state machine driving the application side of [`proxy`] so
//! the binary runs standalone: committed blocks are hashed into a state
//! hash, snapshots are opaque empty payloads, restores are acknowledged
//! unconditionally. A real deployment holds `AppHandle` itself instead of
//! spawning this task.

use proxy::{AppHandle, DownstreamMessage};
use tracing::{info, warn};

pub async fn run(mut app: AppHandle) {
    while let Some(message) = app.recv().await {
        let (uid, payload) = match message {
            DownstreamMessage::CommitBlock { uid, block } => {
                info!(index = block.index, "reference application applying block");
                let mut bytes = Vec::new();
                for tx in &block.transactions {
                    bytes.extend_from_slice(tx);
                }
                let state_hash = blake3::hash(&bytes).as_bytes().to_vec();
                (uid, state_hash)
            }
            DownstreamMessage::GetSnapshot { uid, .. } => (uid, Vec::new()),
            DownstreamMessage::RestoreSnapshot { uid, .. } => (uid, Vec::new()),
        };
        if app.answer(uid, payload).await.is_err() {
            warn!("node side of the proxy dropped, stopping reference application");
            break;
        }
    }
}
