//! # Proxy
//!
//! `Proxy::new` builds three handles: the node-side [`Proxy`], the
//! application-side [`AppHandle`], and a [`ProxyDriver`] the caller
//! spawns to demultiplex the upstream channel (answers complete pending
//! calls by `uid`; submitted transactions are forwarded to the intake
//! channel [`Proxy::recv_transaction`] reads). Splitting construction
//! from driving mirrors a subscribe-then-separately-`run`-it handle.

use crate::messages::{DownstreamMessage, UpstreamMessage};
use parking_lot::Mutex as SyncMutex;
use shared_types::{Block, Hash, Transaction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The application side dropped its handle; no reply will ever come.
    #[error("proxy channel closed")]
    Closed,
    /// The application answered with a payload of the wrong shape.
    #[error("malformed answer payload")]
    MalformedAnswer,
}

type PendingAnswers = Arc<SyncMutex<HashMap<u64, oneshot::Sender<Vec<u8>>>>>;

/// The node's side of the bridge: calls into the application and reads
/// submitted transactions back.
pub struct Proxy {
    downstream_tx: mpsc::Sender<DownstreamMessage>,
    transaction_rx: AsyncMutex<mpsc::Receiver<Transaction>>,
    pending: PendingAnswers,
    next_uid: AtomicU64,
}

/// The application's side of the bridge.
pub struct AppHandle {
    downstream_rx: mpsc::Receiver<DownstreamMessage>,
    upstream_tx: mpsc::Sender<UpstreamMessage>,
}

impl AppHandle {
    /// Receives the next message from the node, or `None` once the node
    /// side has dropped.
    pub async fn recv(&mut self) -> Option<DownstreamMessage> {
        self.downstream_rx.recv().await
    }

    /// Answers a downstream call by `uid`.
    pub async fn answer(&self, uid: u64, payload: Vec<u8>) -> Result<(), ProxyError> {
        self.upstream_tx
            .send(UpstreamMessage::Answer { uid, payload })
            .await
            .map_err(|_| ProxyError::Closed)
    }

    /// Submits a new transaction to the node.
    pub async fn submit_transaction(&self, transaction: Transaction) -> Result<(), ProxyError> {
        self.upstream_tx
            .send(UpstreamMessage::SubmitTransaction(transaction))
            .await
            .map_err(|_| ProxyError::Closed)
    }
}

/// Demultiplexes the upstream channel: completes pending calls on
/// `Answer`, forwards `SubmitTransaction` to the transaction intake
/// channel. Must be spawned (`tokio::spawn(driver.run())`) once.
pub struct ProxyDriver {
    upstream_rx: mpsc::Receiver<UpstreamMessage>,
    transaction_tx: mpsc::Sender<Transaction>,
    pending: PendingAnswers,
}

impl ProxyDriver {
    /// Runs until the application side drops its upstream sender.
    pub async fn run(mut self) {
        while let Some(message) = self.upstream_rx.recv().await {
            match message {
                UpstreamMessage::SubmitTransaction(tx) => {
                    if self.transaction_tx.send(tx).await.is_err() {
                        warn!("transaction intake closed, dropping submitted transaction");
                    }
                }
                UpstreamMessage::Answer { uid, payload } => {
                    match self.pending.lock().remove(&uid) {
                        Some(sender) => {
                            let _ = sender.send(payload);
                        }
                        None => warn!(uid, "answer for unknown or expired uid"),
                    }
                }
            }
        }
    }
}

impl Proxy {
    /// Builds the bridge. `buffer` bounds each of the three internal
    /// channels (downstream, upstream, transaction intake).
    pub fn new(buffer: usize) -> (Self, AppHandle, ProxyDriver) {
        let (downstream_tx, downstream_rx) = mpsc::channel(buffer);
        let (upstream_tx, upstream_rx) = mpsc::channel(buffer);
        let (transaction_tx, transaction_rx) = mpsc::channel(buffer);
        let pending = Arc::new(SyncMutex::new(HashMap::new()));

        let proxy = Self {
            downstream_tx,
            transaction_rx: AsyncMutex::new(transaction_rx),
            pending: Arc::clone(&pending),
            next_uid: AtomicU64::new(0),
        };
        let app = AppHandle {
            downstream_rx,
            upstream_tx,
        };
        let driver = ProxyDriver {
            upstream_rx,
            transaction_tx,
            pending,
        };
        (proxy, app, driver)
    }

    async fn call(&self, build: impl FnOnce(u64) -> DownstreamMessage) -> Result<Vec<u8>, ProxyError> {
        let uid = self.next_uid.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(uid, tx);
        if self.downstream_tx.send(build(uid)).await.is_err() {
            self.pending.lock().remove(&uid);
            return Err(ProxyError::Closed);
        }
        rx.await.map_err(|_| ProxyError::Closed)
    }

    /// Delivers a committed block and awaits the application's state
    /// hash.
    pub async fn commit_block(&self, block: Block) -> Result<Hash, ProxyError> {
        let payload = self.call(|uid| DownstreamMessage::CommitBlock { uid, block }).await?;
        let hash: Hash = payload.try_into().map_err(|_| ProxyError::MalformedAnswer)?;
        Ok(hash)
    }

    /// Requests a snapshot of application state as of `block_index`.
    pub async fn get_snapshot(&self, block_index: u64) -> Result<Vec<u8>, ProxyError> {
        self.call(|uid| DownstreamMessage::GetSnapshot { uid, block_index }).await
    }

    /// Asks the application to restore state from a previously taken
    /// snapshot.
    pub async fn restore_snapshot(&self, snapshot: Vec<u8>) -> Result<(), ProxyError> {
        self.call(|uid| DownstreamMessage::RestoreSnapshot { uid, snapshot })
            .await
            .map(|_| ())
    }

    /// Receives the next application-submitted transaction, or `None`
    /// once the application side has dropped.
    pub async fn recv_transaction(&self) -> Option<Transaction> {
        self.transaction_rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            index: 0,
            round_received: 1,
            state_hash: None,
            frame_hash: [0u8; 32],
            transactions: vec![],
            signatures: vec![],
        }
    }

    #[tokio::test]
    async fn commit_block_round_trips_through_answer() {
        let (proxy, mut app, driver) = Proxy::new(4);
        tokio::spawn(driver.run());

        let app_task = tokio::spawn(async move {
            let message = app.recv().await.unwrap();
            match message {
                DownstreamMessage::CommitBlock { uid, .. } => {
                    app.answer(uid, vec![9u8; 32]).await.unwrap();
                }
                other => panic!("unexpected message: {other:?}"),
            }
        });

        let hash = proxy.commit_block(sample_block()).await.unwrap();
        assert_eq!(hash, [9u8; 32]);
        app_task.await.unwrap();
    }

    #[tokio::test]
    async fn submitted_transaction_reaches_recv_transaction() {
        let (proxy, app, driver) = Proxy::new(4);
        tokio::spawn(driver.run());

        app.submit_transaction(b"hello".to_vec()).await.unwrap();
        let received = proxy.recv_transaction().await.unwrap();
        assert_eq!(received, b"hello".to_vec());
    }

    #[tokio::test]
    async fn dropped_application_side_fails_pending_calls() {
        let (proxy, app, driver) = Proxy::new(4);
        tokio::spawn(driver.run());
        drop(app);

        let result = proxy.commit_block(sample_block()).await;
        assert!(matches!(result, Err(ProxyError::Closed)));
    }

    #[tokio::test]
    async fn answer_for_unknown_uid_does_not_panic() {
        let (proxy, app, driver) = Proxy::new(4);
        tokio::spawn(driver.run());
        app.answer(999, vec![]).await.unwrap();
        // No pending call was registered for uid 999; the driver should
        // log and move on rather than panicking. Give it a tick to run.
        tokio::task::yield_now().await;
        drop(proxy);
    }
}
