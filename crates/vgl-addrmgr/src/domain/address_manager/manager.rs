//! The address book: new and tried tables plus the rules that move
//! addresses between them.
//!
//! Reference: Bitcoin Core's `addrman.h`

use tracing::trace;

use super::bucketer::Bucketer;
use super::config::{
    NEW_BUCKETS_PER_ADDRESS, NEW_BUCKET_COUNT, NEW_BUCKET_SIZE, TRIED_BUCKET_COUNT,
};
use super::table::{AddressArena, AddressTable};
use super::types::{AddressHandle, AddressManagerStats};
use crate::domain::net_address::{NetAddress, ServiceFlag};
use crate::domain::{AddressManagerError, KnownAddress, Timestamp};
use crate::ports::RandomSource;

/// Seconds an address may go unrefreshed before `connected` bumps it.
const CONNECTED_REFRESH_SECS: u64 = 20 * 60;

/// New/Tried address tables
///
/// # Anti-Eclipse Defense
///
/// 1. Gossiped addresses land in the New table, bucketed by the keyed hash
///    of address group and source group
/// 2. Only `good` moves an address to the Tried table
/// 3. A full tried bucket demotes its oldest entry back to New rather than
///    dropping it
///
/// Every record lives in one arena; buckets hold handles into it. An
/// address is in the Tried table xor referenced by 1..=8 New buckets.
pub struct AddressBook {
    pub(crate) bucketer: Bucketer,
    pub(crate) arena: AddressArena,
    pub(crate) new_table: AddressTable,
    pub(crate) tried_table: AddressTable,
    pub(crate) n_new: usize,
    pub(crate) n_tried: usize,
    pub(crate) tried_bucket_size: usize,
    pub(crate) rng: Box<dyn RandomSource>,
    changes: u64,
    persisted: u64,
}

impl AddressBook {
    /// Empty book with a freshly generated bucket key.
    pub fn new(tried_bucket_size: usize, rng: Box<dyn RandomSource>) -> Self {
        let mut book = Self {
            bucketer: Bucketer::new([0u8; 32]),
            arena: AddressArena::default(),
            new_table: AddressTable::new(NEW_BUCKET_COUNT),
            tried_table: AddressTable::new(TRIED_BUCKET_COUNT),
            n_new: 0,
            n_tried: 0,
            tried_bucket_size,
            rng,
            changes: 0,
            persisted: 0,
        };
        book.reset();
        book
    }

    /// Forget everything and pick a new bucket key.
    pub fn reset(&mut self) {
        let mut key = [0u8; 32];
        self.rng.fill_bytes(&mut key);
        self.bucketer = Bucketer::new(key);
        self.arena = AddressArena::default();
        self.new_table = AddressTable::new(NEW_BUCKET_COUNT);
        self.tried_table = AddressTable::new(TRIED_BUCKET_COUNT);
        self.n_new = 0;
        self.n_tried = 0;
        self.mark_dirty();
    }

    // =========================================================================
    // Dirty tracking
    // =========================================================================

    /// Record that the tables differ from what was last persisted.
    pub fn mark_dirty(&mut self) {
        self.changes = self.changes.wrapping_add(1);
    }

    /// Whether there are changes not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.changes != self.persisted
    }

    /// Change counter, captured alongside a snapshot.
    pub fn generation(&self) -> u64 {
        self.changes
    }

    /// Mark the state as of `generation` persisted. Later changes stay dirty.
    pub fn mark_persisted(&mut self, generation: u64) {
        self.persisted = generation;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.persisted = self.changes;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Addresses known to the book.
    pub fn num_addresses(&self) -> usize {
        self.n_new + self.n_tried
    }

    /// Table counts. `local_count` is left for the caller to fill in.
    pub fn stats(&self) -> AddressManagerStats {
        AddressManagerStats {
            new_count: self.n_new,
            tried_count: self.n_tried,
            local_count: 0,
        }
    }

    /// Secret bucket key.
    pub fn key(&self) -> &[u8; 32] {
        self.bucketer.key()
    }

    /// Record for `addr`, if known.
    pub fn find(&self, addr: &NetAddress) -> Option<&KnownAddress> {
        self.arena
            .find(&addr.key())
            .and_then(|handle| self.arena.get(handle))
    }

    fn lookup(&self, addr: &NetAddress) -> Result<AddressHandle, AddressManagerError> {
        let key = addr.key();
        self.arena
            .find(&key)
            .ok_or(AddressManagerError::AddressNotFound(key))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Record `addr` as reported by `src`.
    ///
    /// Unroutable addresses are ignored. A known address has its timestamp
    /// and services refreshed, and may gain another New bucket reference
    /// with probability 1/(2*refs).
    pub fn add_or_update(&mut self, addr: &NetAddress, src: &NetAddress, now: Timestamp) {
        if !addr.is_routable() {
            return;
        }

        let key = addr.key();
        let handle = match self.arena.find(&key) {
            Some(handle) => {
                let Some(ka) = self.arena.get_mut(handle) else {
                    return;
                };

                let current = ka.na();
                let newer = addr.timestamp() > current.timestamp();
                let more_services = !current.services().contains(addr.services());
                let changed = newer || more_services;
                if changed {
                    let mut refreshed =
                        current.with_timestamp(current.timestamp().max(addr.timestamp()));
                    refreshed.add_service(addr.services());
                    ka.replace_net_address(refreshed);
                }

                let (tried, refs) = (ka.is_tried(), ka.refs());
                if changed {
                    self.mark_dirty();
                }

                if tried || refs >= NEW_BUCKETS_PER_ADDRESS {
                    return;
                }

                // Stochastic test: the more buckets already holding it, the
                // less likely another one is added.
                let factor = 2 * refs as usize;
                if self.rng.random_usize(factor) != 0 {
                    return;
                }
                handle
            }
            None => {
                let handle = self
                    .arena
                    .insert(key.clone(), KnownAddress::new(addr.clone(), src.clone()));
                self.n_new += 1;
                self.mark_dirty();
                handle
            }
        };

        let bucket = self.bucketer.new_bucket(addr, src);
        if self.new_table.bucket(bucket).contains(handle) {
            return;
        }

        if self.new_table.bucket(bucket).len() >= NEW_BUCKET_SIZE {
            trace!("[addrmgr] new bucket {} is full, expiring old entries", bucket);
            self.expire_new(bucket, now);
        }

        self.new_table.push(bucket, handle);
        if let Some(ka) = self.arena.get_mut(handle) {
            ka.inc_refs();
        }
        self.mark_dirty();

        trace!(
            "[addrmgr] Added new address {} for a total of {} addresses",
            key,
            self.num_addresses()
        );
    }

    /// Make room in a full New bucket.
    ///
    /// Every bad entry is dropped; if none were bad, the entry with the
    /// oldest timestamp goes instead.
    pub(crate) fn expire_new(&mut self, bucket: usize, now: Timestamp) {
        let entries = self.new_table.bucket(bucket).entries().to_vec();
        let mut oldest: Option<(AddressHandle, Timestamp)> = None;
        let mut expired_any = false;

        for handle in entries {
            let Some(ka) = self.arena.get(handle) else {
                continue;
            };
            if ka.is_bad(now) {
                trace!("[addrmgr] expiring bad address {}", ka.na());
                self.remove_from_new(bucket, handle);
                expired_any = true;
                continue;
            }
            let ts = ka.na().timestamp();
            match oldest {
                Some((_, oldest_ts)) if oldest_ts <= ts => {}
                _ => oldest = Some((handle, ts)),
            }
        }

        if expired_any {
            return;
        }
        if let Some((handle, _)) = oldest {
            if let Some(ka) = self.arena.get(handle) {
                trace!(
                    "[addrmgr] expiring oldest address {} from new bucket {}",
                    ka.na(),
                    bucket
                );
            }
            self.remove_from_new(bucket, handle);
        }
    }

    fn remove_from_new(&mut self, bucket: usize, handle: AddressHandle) {
        if !self.new_table.remove(bucket, handle) {
            return;
        }
        let remaining = match self.arena.get_mut(handle) {
            Some(ka) => ka.dec_refs(),
            None => return,
        };
        if remaining == 0 {
            self.arena.remove(handle);
            self.n_new = self.n_new.saturating_sub(1);
        }
        self.mark_dirty();
    }

    /// Record a connection attempt to `addr`.
    pub fn attempt(
        &mut self,
        addr: &NetAddress,
        now: Timestamp,
    ) -> Result<(), AddressManagerError> {
        let handle = self.lookup(addr)?;
        if let Some(ka) = self.arena.get_mut(handle) {
            ka.record_attempt(now);
        }
        self.mark_dirty();
        Ok(())
    }

    /// Refresh the timestamp of a currently connected address.
    ///
    /// Only rewrites the timestamp once it is more than twenty minutes old,
    /// so chatty connections do not churn the tables.
    pub fn connected(
        &mut self,
        addr: &NetAddress,
        now: Timestamp,
    ) -> Result<(), AddressManagerError> {
        let handle = self.lookup(addr)?;
        let Some(ka) = self.arena.get_mut(handle) else {
            return Ok(());
        };
        if now > ka.na().timestamp().add_secs(CONNECTED_REFRESH_SECS) {
            let refreshed = ka.na().with_timestamp(now);
            ka.replace_net_address(refreshed);
            self.mark_dirty();
        }
        Ok(())
    }

    /// Replace the advertised services of a known address.
    pub fn set_services(
        &mut self,
        addr: &NetAddress,
        services: ServiceFlag,
    ) -> Result<(), AddressManagerError> {
        let handle = self.lookup(addr)?;
        let Some(ka) = self.arena.get_mut(handle) else {
            return Ok(());
        };
        if ka.na().services() != services {
            let updated = ka.na().with_services(services);
            ka.replace_net_address(updated);
            self.mark_dirty();
        }
        Ok(())
    }

    /// Mark `addr` as successfully connected and move it to the Tried table.
    ///
    /// If its tried bucket is full, the oldest tried entry is demoted to a
    /// New bucket: its own if there is room, otherwise the New slot `addr`
    /// just vacated.
    pub fn good(&mut self, addr: &NetAddress, now: Timestamp) -> Result<(), AddressManagerError> {
        let handle = self.lookup(addr)?;
        let Some(ka) = self.arena.get(handle) else {
            return Err(AddressManagerError::AddressNotFound(addr.key()));
        };
        let tried = ka.is_tried();

        let vacated = if tried {
            Vec::new()
        } else {
            let vacated = self.new_table.buckets_containing(handle);
            if vacated.is_empty() {
                return Err(AddressManagerError::NotNewAddress(addr.key()));
            }
            vacated
        };

        if let Some(ka) = self.arena.get_mut(handle) {
            ka.record_success(now);
        }
        self.mark_dirty();
        if tried {
            return Ok(());
        }

        for &bucket in &vacated {
            self.new_table.remove(bucket, handle);
        }
        self.n_new = self.n_new.saturating_sub(1);
        let free_new_bucket = vacated[0];

        let Some(ka) = self.arena.get_mut(handle) else {
            return Ok(());
        };
        ka.set_refs(0);
        ka.set_tried(true);
        let tried_bucket = self.bucketer.tried_bucket(ka.na());
        self.n_tried += 1;

        if self.tried_table.bucket(tried_bucket).len() < self.tried_bucket_size {
            self.tried_table.push(tried_bucket, handle);
            trace!("[addrmgr] moved {} to tried bucket {}", addr, tried_bucket);
            return Ok(());
        }

        // Tried bucket is full: swap out its oldest entry.
        let Some(pos) = self.oldest_in_tried_bucket(tried_bucket) else {
            self.tried_table.push(tried_bucket, handle);
            return Ok(());
        };
        let evicted = self.tried_table.replace(tried_bucket, pos, handle);

        let Some(evicted_ka) = self.arena.get_mut(evicted) else {
            return Ok(());
        };
        evicted_ka.set_tried(false);
        evicted_ka.set_refs(1);
        let mut new_bucket = self.bucketer.new_bucket(evicted_ka.na(), evicted_ka.src());
        if self.new_table.bucket(new_bucket).len() >= NEW_BUCKET_SIZE {
            new_bucket = free_new_bucket;
        }
        trace!(
            "[addrmgr] Replacing {} with {} in tried table",
            evicted_ka.na(),
            addr
        );
        self.n_tried -= 1;
        self.n_new += 1;
        self.new_table.push(new_bucket, evicted);
        Ok(())
    }

    fn oldest_in_tried_bucket(&self, bucket: usize) -> Option<usize> {
        let mut oldest: Option<(usize, Timestamp)> = None;
        for (pos, handle) in self.tried_table.bucket(bucket).entries().iter().enumerate() {
            let Some(ka) = self.arena.get(*handle) else {
                continue;
            };
            let ts = ka.na().timestamp();
            match oldest {
                Some((_, oldest_ts)) if oldest_ts <= ts => {}
                _ => oldest = Some((pos, ts)),
            }
        }
        oldest.map(|(pos, _)| pos)
    }
}
