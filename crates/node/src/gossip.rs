//! # Gossip driver
//!
//! Ticks on an interval: while [`NodeState::Babbling`], picks a partner
//! via [`PeerSelector`], exchanges `Sync`/`EagerSync` calls, and folds
//! the result into a new self-event. A `sync_limit` response moves the
//! node to [`NodeState::CatchingUp`]; the next tick then tries
//! `FastForward` against a peer instead of the normal push-pull exchange,
//! backing off on consecutive failures, and backfills the signatures the
//! adopted snapshot doesn't cover via `RequestBlockSignatures` once it
//! lands.

use crate::fatal::FatalHandle;
use crate::state::NodeStateHandle;
use node_core::Core;
use parking_lot::Mutex as SyncMutex;
use peer_selector::PeerSelector;
use poset::Poset;
use shared_types::{NodeState, Participant, ParticipantSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use store::Store;
use sync::{RpcRequest, RpcResponse, SyncClient};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Upper bound on consecutive-failure backoff: after this many failed
/// catch-up attempts in a row, the driver still waits this many ticks
/// (not more) before trying again.
const MAX_CATCH_UP_BACKOFF_TICKS: u32 = 10;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

pub struct GossipDriver {
    core: Arc<Core>,
    poset: Arc<Poset>,
    store: Arc<dyn Store>,
    participants: ParticipantSet,
    self_id: u64,
    selector: PeerSelector,
    client: SyncClient,
    state: NodeStateHandle,
    fatal: FatalHandle,
    tick: Duration,
    last_synced: Mutex<BTreeMap<u64, u64>>,
    catch_up_failures: SyncMutex<u32>,
    catch_up_skip: SyncMutex<u32>,
}

impl GossipDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        core: Arc<Core>,
        poset: Arc<Poset>,
        store: Arc<dyn Store>,
        participants: ParticipantSet,
        self_id: u64,
        client: SyncClient,
        state: NodeStateHandle,
        fatal: FatalHandle,
        tick: Duration,
    ) -> Self {
        Self {
            core,
            poset,
            store,
            participants,
            self_id,
            selector: PeerSelector::new(),
            client,
            state,
            fatal,
            tick,
            last_synced: Mutex::new(BTreeMap::new()),
            catch_up_failures: SyncMutex::new(0),
            catch_up_skip: SyncMutex::new(0),
        }
    }

    fn candidates(&self) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| p.id != self.self_id)
            .cloned()
            .collect()
    }

    /// Runs until `shutdown` fires.
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.state.get() {
                        NodeState::Babbling => self.gossip_tick().await,
                        NodeState::CatchingUp => self.fast_forward_tick().await,
                        NodeState::Shutdown => break,
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn gossip_tick(&self) {
        let candidates = self.candidates();
        let Some(peer) = ({
            let last_synced = self.last_synced.lock().await;
            let flag_table = self
                .core
                .head()
                .and_then(|head| self.poset.flag_table_of(head))
                .unwrap_or_default();
            self.selector.select(&candidates, &last_synced, &flag_table)
        }) else {
            return;
        };

        let own_known = match self.core.known_events() {
            Ok(known) => known,
            Err(err) => {
                self.fatal.report(format!("reading known-events snapshot: {err}"));
                return;
            }
        };

        let response = match self
            .client
            .call(&peer.net_addr, RpcRequest::Sync { known: own_known })
            .await
        {
            Ok(response) => response,
            Err(err) => {
                debug!(peer = peer.id, error = %err, "sync call failed, will retry next tick");
                return;
            }
        };

        let (events, peer_known, sync_limit) = match response {
            RpcResponse::Sync { events, known, sync_limit, .. } => (events, known, sync_limit),
            RpcResponse::Error { message } => {
                warn!(peer = peer.id, %message, "peer rejected sync call");
                return;
            }
            other => {
                warn!(peer = peer.id, response = ?other, "unexpected response to sync call");
                return;
            }
        };

        if sync_limit {
            warn!(peer = peer.id, "peer reports sync_limit exceeded, catching up");
            self.state.set(NodeState::CatchingUp);
            return;
        }

        if let Err(err) = self.core.sync(events) {
            warn!(peer = peer.id, error = %err, "could not insert synced events");
            return;
        }

        let other_parent = peer_known
            .get(&peer.id)
            .and_then(|&index| self.store.event_hash_at(peer.id, index).ok());

        if let Err(err) = self.core.add_self_event(other_parent) {
            warn!(peer = peer.id, error = %err, "could not create self-event after sync");
            return;
        }

        let push_diff = match self.core.event_diff(&peer_known) {
            Ok(diff) => diff,
            Err(err) => {
                self.fatal.report(format!("computing push diff: {err}"));
                return;
            }
        };
        if !push_diff.is_empty() {
            if let Err(err) = self
                .client
                .call(&peer.net_addr, RpcRequest::EagerSync { events: push_diff })
                .await
            {
                debug!(peer = peer.id, error = %err, "eager-sync push failed, peer will pull it next round");
            }
        }

        self.last_synced.lock().await.insert(peer.id, now_millis());
    }

    async fn fast_forward_tick(&self) {
        {
            let mut skip = self.catch_up_skip.lock();
            if *skip > 0 {
                *skip -= 1;
                return;
            }
        }

        let candidates = self.candidates();
        let Some(peer) = candidates.first() else {
            return;
        };

        match self.client.call(&peer.net_addr, RpcRequest::FastForward).await {
            Ok(RpcResponse::FastForward { block, frame, .. }) => {
                let block_index = block.index;
                match self.core.fast_forward(frame, block) {
                    Ok(()) => {
                        warn!(peer = peer.id, "fast-forwarded, resuming normal gossip");
                        self.backfill_block_signatures(peer, block_index).await;
                        self.note_catch_up_success();
                        self.state.set(NodeState::Babbling);
                    }
                    Err(err) => {
                        warn!(peer = peer.id, error = %err, "fast-forward snapshot rejected");
                        self.note_catch_up_failure();
                    }
                }
            }
            Ok(RpcResponse::Error { message }) => {
                debug!(peer = peer.id, %message, "peer has no snapshot to offer yet");
                self.note_catch_up_failure();
            }
            Ok(other) => {
                warn!(peer = peer.id, response = ?other, "unexpected response to fast-forward call");
                self.note_catch_up_failure();
            }
            Err(err) => {
                debug!(peer = peer.id, error = %err, "fast-forward call failed, will retry next tick");
                self.note_catch_up_failure();
            }
        }
    }

    /// Requests signatures for the block range the adopted snapshot
    /// doesn't cover (`reset` wipes every earlier block, so the new
    /// frame's own adopted block is the only one this node now holds)
    /// and folds them into the pool the next self-event drains.
    async fn backfill_block_signatures(&self, peer: &Participant, block_index: u64) {
        let request = RpcRequest::RequestBlockSignatures { from_index: block_index, to_index: block_index };
        match self.client.call(&peer.net_addr, request).await {
            Ok(RpcResponse::BlockSignatures { signatures, .. }) => {
                for (_, signature) in signatures {
                    if let Err(err) = self.core.submit_block_signature(signature) {
                        warn!(peer = peer.id, %err, "block-signature pool full while backfilling");
                    }
                }
            }
            Ok(other) => warn!(peer = peer.id, response = ?other, "unexpected response to block-signature backfill"),
            Err(err) => debug!(peer = peer.id, error = %err, "block-signature backfill failed, will retry via normal gossip"),
        }
    }

    fn note_catch_up_success(&self) {
        *self.catch_up_failures.lock() = 0;
        *self.catch_up_skip.lock() = 0;
    }

    /// Linear backoff: the Nth consecutive failure skips the next N
    /// ticks, capped at `MAX_CATCH_UP_BACKOFF_TICKS`.
    fn note_catch_up_failure(&self) {
        let mut failures = self.catch_up_failures.lock();
        *failures = (*failures + 1).min(MAX_CATCH_UP_BACKOFF_TICKS);
        *self.catch_up_skip.lock() = *failures;
    }
}
