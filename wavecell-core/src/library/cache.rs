//! Bounded asset lookup cache
//!
//! Size-limited accelerator mapping identifier to a weak back-reference
//! into the tree-owned record. Entries never own or copy records: a
//! reference that no longer upgrades (the record was deleted) counts as
//! a miss and is pruned.
//!
//! Eviction is by insertion order, oldest first. Re-inserting a present
//! identifier refreshes the reference but keeps its original queue
//! position; lookups do not reorder anything. This is deliberately FIFO
//! rather than least-recently-used.

use crate::library::record::AssetRecord;
use crate::library::tree::RecordHandle;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, Weak};
use tracing::trace;

type WeakRecord = Weak<RwLock<AssetRecord>>;

/// FIFO-bounded map of identifier to record back-reference
pub struct BoundedCache {
    capacity: usize,
    entries: HashMap<String, WeakRecord>,
    /// Insertion order, oldest at the front
    order: VecDeque<String>,
}

impl BoundedCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Insert or refresh an entry, evicting the oldest beyond capacity
    pub fn insert(&mut self, file_id: &str, record: &RecordHandle) {
        if self.capacity == 0 {
            return;
        }

        if let Some(slot) = self.entries.get_mut(file_id) {
            // Refresh in place; queue position is unchanged
            *slot = Arc::downgrade(record);
            return;
        }

        self.entries.insert(file_id.to_string(), Arc::downgrade(record));
        self.order.push_back(file_id.to_string());

        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    trace!("Cache evicted oldest entry {}", oldest);
                }
                None => break,
            }
        }
    }

    /// Look up an entry; dead references are pruned and miss
    pub fn get(&mut self, file_id: &str) -> Option<RecordHandle> {
        if let Some(weak) = self.entries.get(file_id) {
            if let Some(record) = weak.upgrade() {
                return Some(record);
            }
            // Record was deleted out from under the cache
            self.remove(file_id);
        }
        None
    }

    /// Drop an entry if present
    pub fn remove(&mut self, file_id: &str) {
        if self.entries.remove(file_id).is_some() {
            self.order.retain(|id| id != file_id);
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
