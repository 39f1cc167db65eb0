//! # In-Memory Store
//!
//! A bounded-LRU-over-events, unbounded-for-rounds/blocks backend. Used
//! directly in tests, and as the read-through cache layered in front of
//! [`crate::adapters::rocksdb::RocksDbStore`].

use crate::ports::{Store, StoreError};
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{Block, Event, Frame, Hash, RoundInfo};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

struct Inner {
    events: LruCache<Hash, Event>,
    /// Index-ordered event hashes per creator, so a cache eviction of the
    /// event body doesn't lose the ability to answer `participant_events`
    /// — the hash list is small and kept unbounded.
    by_creator: BTreeMap<u64, Vec<Hash>>,
    rounds: BTreeMap<u64, RoundInfo>,
    blocks: BTreeMap<u64, Block>,
    frames: BTreeMap<u64, Frame>,
}

/// In-memory [`Store`] implementation.
///
/// `cache_size` bounds the event cache; round/block/frame maps are
/// unbounded (small relative to event volume, and needed in full for
/// fame election and block assembly).
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Creates a store with the given event cache capacity.
    pub fn new(cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).unwrap();
        Self {
            inner: Mutex::new(Inner {
                events: LruCache::new(capacity),
                by_creator: BTreeMap::new(),
                rounds: BTreeMap::new(),
                blocks: BTreeMap::new(),
                frames: BTreeMap::new(),
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Store for InMemoryStore {
    fn get_event(&self, hash: &Hash) -> Result<Event, StoreError> {
        let mut inner = self.inner.lock();
        inner
            .events
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("event {:x?}", hash)))
    }

    fn set_event(&self, event: Event) -> Result<(), StoreError> {
        let hash = event.hash();
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.events.peek(&hash) {
            if existing != &event {
                return Err(StoreError::EventMismatch);
            }
            return Ok(());
        }
        let creator_id = shared_types::Participant::derive_id(&event.body.creator);
        inner
            .by_creator
            .entry(creator_id)
            .or_default()
            .push(hash);
        inner.events.put(hash, event);
        Ok(())
    }

    fn participant_events(&self, creator: &[u8; 32], skip_index: u64) -> Result<Vec<Hash>, StoreError> {
        let creator_id = shared_types::Participant::derive_id(creator);
        let mut inner = self.inner.lock();
        let hashes = inner.by_creator.get(&creator_id).cloned().unwrap_or_default();
        let mut result = Vec::new();
        for hash in hashes {
            if let Some(event) = inner.events.peek(&hash) {
                if event.body.index > skip_index {
                    result.push(hash);
                }
            }
        }
        Ok(result)
    }

    fn event_hash_at(&self, creator_id: u64, index: u64) -> Result<Hash, StoreError> {
        let inner = self.inner.lock();
        let hashes = inner.by_creator.get(&creator_id).cloned().unwrap_or_default();
        for hash in hashes {
            if let Some(event) = inner.events.peek(&hash) {
                if event.body.index == index {
                    return Ok(hash);
                }
            }
        }
        Err(StoreError::NotFound(format!("creator {} index {}", creator_id, index)))
    }

    fn last_event_from(&self, creator_id: u64) -> Result<(Hash, bool), StoreError> {
        let inner = self.inner.lock();
        let hashes = inner
            .by_creator
            .get(&creator_id)
            .ok_or_else(|| StoreError::NotFound(format!("creator {}", creator_id)))?;
        let hash = *hashes
            .last()
            .ok_or_else(|| StoreError::NotFound(format!("creator {}", creator_id)))?;
        Ok((hash, hashes.len() == 1))
    }

    fn known_events(&self) -> Result<BTreeMap<u64, u64>, StoreError> {
        let mut inner = self.inner.lock();
        let mut result = BTreeMap::new();
        let creators: Vec<u64> = inner.by_creator.keys().copied().collect();
        for creator_id in creators {
            let hashes = inner.by_creator.get(&creator_id).cloned().unwrap_or_default();
            if let Some(last) = hashes.last() {
                if let Some(event) = inner.events.get(last) {
                    result.insert(creator_id, event.body.index);
                }
            }
        }
        Ok(result)
    }

    fn get_round(&self, round: u64) -> Result<RoundInfo, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.rounds.get(&round).cloned().unwrap_or_default())
    }

    fn set_round(&self, round: u64, info: RoundInfo) -> Result<(), StoreError> {
        self.inner.lock().rounds.insert(round, info);
        Ok(())
    }

    fn get_block(&self, index: u64) -> Result<Block, StoreError> {
        let inner = self.inner.lock();
        inner
            .blocks
            .get(&index)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("block {}", index)))
    }

    fn set_block(&self, block: Block) -> Result<(), StoreError> {
        self.inner.lock().blocks.insert(block.index, block);
        Ok(())
    }

    fn last_block_index(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().blocks.keys().next_back().copied())
    }

    fn get_frame(&self, round: u64) -> Result<Frame, StoreError> {
        let inner = self.inner.lock();
        inner
            .frames
            .get(&round)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("frame {}", round)))
    }

    fn set_frame(&self, frame: Frame) -> Result<(), StoreError> {
        self.inner.lock().frames.insert(frame.round, frame);
        Ok(())
    }

    fn reset(&self, frame: Frame) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.events.clear();
        inner.by_creator.clear();
        inner.rounds.clear();
        inner.blocks.clear();
        for event in &frame.events {
            let hash = event.hash();
            let creator_id = shared_types::Participant::derive_id(&event.body.creator);
            inner.by_creator.entry(creator_id).or_default().push(hash);
            inner.events.put(hash, event.clone());
        }
        inner.frames.insert(frame.round, frame);
        Ok(())
    }

    fn need_bootstrap(&self) -> Result<bool, StoreError> {
        Ok(self.inner.lock().by_creator.is_empty())
    }

    fn store_path(&self) -> Option<String> {
        None
    }

    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
