//! # Transaction and block-signature pools
//!
//! Bounded FIFO queues drained atomically into a self-event and restored
//! to the front if that event fails to insert, so a failed `AddSelfEvent`
//! never loses a submitted transaction or signature.
//!
//! Grounded in the propose/rollback shape of a mempool's two-phase
//! commit: `drain` is the propose half (items leave the pool but aren't
//! discarded), `restore` is the rollback half.

use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;

/// A submission was rejected because the pool is at capacity.
#[derive(Debug, Error)]
#[error("pool is full (capacity {capacity})")]
pub struct PoolFull {
    /// The pool's configured capacity.
    pub capacity: usize,
}

/// A bounded FIFO queue with atomic drain/restore.
///
/// Shared by [`TransactionPool`] and [`BlockSignaturePool`] — both are
/// "things Core accumulates until the next self-event, then empties in
/// one shot."
struct BoundedPool<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
}

impl<T> BoundedPool<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::new()),
        }
    }

    fn submit(&self, item: T) -> Result<(), PoolFull> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(PoolFull {
                capacity: self.capacity,
            });
        }
        items.push_back(item);
        Ok(())
    }

    fn drain(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }

    /// Puts items back at the front, in their original relative order,
    /// ahead of anything submitted while they were out.
    fn restore(&self, items: Vec<T>) {
        let mut guard = self.items.lock();
        for item in items.into_iter().rev() {
            guard.push_front(item);
        }
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

/// Pending application payloads awaiting inclusion in a self-event.
pub struct TransactionPool {
    inner: BoundedPool<shared_types::Transaction>,
}

impl TransactionPool {
    /// Creates an empty pool bounded at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: BoundedPool::new(capacity),
        }
    }

    /// Submits a transaction from the application. `Err` if the pool is
    /// at capacity; the caller is expected to log and drop it.
    pub fn submit(&self, tx: shared_types::Transaction) -> Result<(), PoolFull> {
        self.inner.submit(tx)
    }

    /// Drains all pending transactions for inclusion in a self-event.
    pub fn drain(&self) -> Vec<shared_types::Transaction> {
        self.inner.drain()
    }

    /// Restores previously drained transactions after a failed self-event.
    pub fn restore(&self, txs: Vec<shared_types::Transaction>) {
        self.inner.restore(txs)
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if no transactions are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Block signatures gossiped by this node but not yet embedded into a
/// self-event.
pub struct BlockSignaturePool {
    inner: BoundedPool<shared_types::BlockSignature>,
}

impl BlockSignaturePool {
    /// Creates an empty pool bounded at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: BoundedPool::new(capacity),
        }
    }

    /// Enqueues a signature produced by the commit loop.
    pub fn submit(&self, signature: shared_types::BlockSignature) -> Result<(), PoolFull> {
        self.inner.submit(signature)
    }

    /// Drains all pending signatures for inclusion in a self-event.
    pub fn drain(&self) -> Vec<shared_types::BlockSignature> {
        self.inner.drain()
    }

    /// Restores previously drained signatures after a failed self-event.
    pub fn restore(&self, signatures: Vec<shared_types::BlockSignature>) {
        self.inner.restore(signatures)
    }

    /// Number of pending signatures.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if no signatures are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
