//! Choosing addresses: one for an outbound connection, or a sample to share
//! with a peer.

use std::sync::Arc;

use tracing::trace;

use super::manager::AddressBook;
use crate::domain::net_address::{NetAddress, NetAddressType};
use crate::domain::{KnownAddress, Timestamp};
use crate::ports::shuffle;

/// Scale used to turn a chance into an integer comparison.
const LARGE: usize = 1 << 30;

impl AddressBook {
    /// Pick an address to try connecting to.
    ///
    /// Tried and New tables are chosen 50/50 when both are populated. Within
    /// a table, random entries are accepted with probability
    /// `factor * chance`, where `factor` grows by 1.2 after every rejection
    /// so the loop always ends.
    pub fn get_address(&self, now: Timestamp) -> Option<KnownAddress> {
        if self.num_addresses() == 0 {
            return None;
        }

        let use_tried = self.n_tried > 0 && (self.n_new == 0 || self.rng.random_usize(2) == 0);
        let table = if use_tried {
            &self.tried_table
        } else {
            &self.new_table
        };
        if table.is_empty() {
            return None;
        }

        let mut factor = 1.0f64;
        loop {
            let bucket = table.bucket(self.rng.random_usize(table.bucket_count()));
            if bucket.is_empty() {
                continue;
            }
            let handle = bucket.entries()[self.rng.random_usize(bucket.len())];
            let Some(ka) = self.arena.get(handle) else {
                continue;
            };

            let roll = self.rng.random_usize(LARGE) as f64;
            if roll < factor * ka.chance(now) * LARGE as f64 {
                trace!(
                    "[addrmgr] Selected {} from {} table",
                    ka.na(),
                    if use_tried { "tried" } else { "new" }
                );
                return Some(ka.clone());
            }
            factor *= 1.2;
        }
    }

    /// Random sample of good addresses to share with a peer.
    ///
    /// Considers addresses matching `filter` that are not bad and have
    /// connected successfully at least once, and returns `percentage`% of
    /// them (rounded up), capped at `limit`.
    pub fn address_cache<F>(
        &self,
        filter: F,
        now: Timestamp,
        percentage: usize,
        limit: usize,
    ) -> Vec<Arc<NetAddress>>
    where
        F: Fn(NetAddressType) -> bool,
    {
        if self.arena.is_empty() {
            return Vec::new();
        }

        let mut eligible: Vec<Arc<NetAddress>> = self
            .arena
            .iter()
            .map(|(_, ka)| ka)
            .filter(|ka| filter(ka.na().addr_type()))
            .filter(|ka| !ka.is_bad(now) && ka.last_success().is_some())
            .map(KnownAddress::net_address)
            .collect();

        let wanted = (eligible.len() * percentage).div_ceil(100).min(limit);
        shuffle(self.rng.as_ref(), &mut eligible);
        eligible.truncate(wanted);
        eligible
    }
}
