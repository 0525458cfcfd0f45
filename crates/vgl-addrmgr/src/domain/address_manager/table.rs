//! Address storage: one arena of records plus the bucket tables that
//! reference them by handle.

use std::collections::HashMap;

use super::types::AddressHandle;
use crate::domain::KnownAddress;

/// Owns every known-address record, indexed by address key.
#[derive(Debug, Default)]
pub struct AddressArena {
    slots: Vec<Option<KnownAddress>>,
    free: Vec<usize>,
    index: HashMap<String, AddressHandle>,
}

impl AddressArena {
    /// Store a record under `key`.
    pub fn insert(&mut self, key: String, ka: KnownAddress) -> AddressHandle {
        let handle = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(ka);
                AddressHandle(slot)
            }
            None => {
                self.slots.push(Some(ka));
                AddressHandle(self.slots.len() - 1)
            }
        };
        self.index.insert(key, handle);
        handle
    }

    /// Look up a handle by address key.
    pub fn find(&self, key: &str) -> Option<AddressHandle> {
        self.index.get(key).copied()
    }

    /// Borrow a record.
    pub fn get(&self, handle: AddressHandle) -> Option<&KnownAddress> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    /// Mutably borrow a record.
    pub fn get_mut(&mut self, handle: AddressHandle) -> Option<&mut KnownAddress> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    /// Drop a record and its index entry.
    pub fn remove(&mut self, handle: AddressHandle) -> Option<KnownAddress> {
        let ka = self.slots.get_mut(handle.0)?.take()?;
        self.index.remove(&ka.na().key());
        self.free.push(handle.0);
        Some(ka)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate over live records.
    pub fn iter(&self) -> impl Iterator<Item = (AddressHandle, &KnownAddress)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|ka| (AddressHandle(i), ka)))
    }
}

/// A single bucket: an ordered list of handles.
#[derive(Debug, Default, Clone)]
pub struct AddressBucket {
    entries: Vec<AddressHandle>,
}

impl AddressBucket {
    /// Entries in insertion order.
    pub fn entries(&self) -> &[AddressHandle] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `handle` is present.
    pub fn contains(&self, handle: AddressHandle) -> bool {
        self.entries.contains(&handle)
    }
}

/// A fixed number of buckets (either New or Tried).
#[derive(Debug, Clone)]
pub struct AddressTable {
    buckets: Vec<AddressBucket>,
    total: usize,
}

impl AddressTable {
    /// Create a new table with specified bucket count
    pub fn new(bucket_count: usize) -> Self {
        Self {
            buckets: vec![AddressBucket::default(); bucket_count],
            total: 0,
        }
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Borrow bucket `idx`.
    pub fn bucket(&self, idx: usize) -> &AddressBucket {
        &self.buckets[idx]
    }

    /// Iterate over buckets in index order.
    pub fn buckets(&self) -> impl Iterator<Item = &AddressBucket> {
        self.buckets.iter()
    }

    /// Total entries across all buckets.
    pub fn len(&self) -> usize {
        self.total
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Append `handle` to bucket `idx`.
    pub fn push(&mut self, idx: usize, handle: AddressHandle) {
        self.buckets[idx].entries.push(handle);
        self.total += 1;
    }

    /// Remove `handle` from bucket `idx`, keeping order. Returns whether it was present.
    pub fn remove(&mut self, idx: usize, handle: AddressHandle) -> bool {
        let entries = &mut self.buckets[idx].entries;
        match entries.iter().position(|h| *h == handle) {
            Some(pos) => {
                entries.remove(pos);
                self.total -= 1;
                true
            }
            None => false,
        }
    }

    /// Overwrite slot `pos` of bucket `idx`, returning the previous handle.
    pub fn replace(&mut self, idx: usize, pos: usize, handle: AddressHandle) -> AddressHandle {
        std::mem::replace(&mut self.buckets[idx].entries[pos], handle)
    }

    /// Indices of every bucket holding `handle`, ascending.
    pub fn buckets_containing(&self, handle: AddressHandle) -> Vec<usize> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.contains(handle))
            .map(|(i, _)| i)
            .collect()
    }
}
