//! Serialisable image of the address book.
//!
//! ```json
//! {
//!   "Version": 1,
//!   "Key": [32 bytes],
//!   "Addresses": [{"Addr": "1.2.3.4:9108", "Src": "...", "Attempts": 0,
//!                  "TimeStamp": 1700000000, "LastAttempt": 0, "LastSuccess": 0}],
//!   "NewBuckets": [[keys...] x 1024],
//!   "TriedBuckets": [[keys...] x 64]
//! }
//! ```
//!
//! Times are Unix seconds; 0 means "never".

use serde::{Deserialize, Serialize};

use super::bucketer::Bucketer;
use super::config::{
    NEW_BUCKETS_PER_ADDRESS, NEW_BUCKET_COUNT, NEW_BUCKET_SIZE, SERIALISATION_VERSION,
    TRIED_BUCKET_COUNT,
};
use super::manager::AddressBook;
use super::table::{AddressArena, AddressTable};
use crate::domain::net_address::{NetAddress, ServiceFlag};
use crate::domain::{KnownAddress, PersistenceError, Timestamp};

/// One persisted address record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SerializedKnownAddress {
    /// Address key
    pub addr: String,
    /// Key of the peer that reported it
    pub src: String,
    /// Attempts since last success
    pub attempts: u32,
    /// Last announced time
    pub time_stamp: i64,
    /// Last attempt, 0 if never
    pub last_attempt: i64,
    /// Last success, 0 if never
    pub last_success: i64,
}

/// Persisted address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeersSnapshot {
    /// Format version
    pub version: u32,
    /// Bucket key
    pub key: [u8; 32],
    /// Every known address
    pub addresses: Vec<SerializedKnownAddress>,
    /// Address keys per New bucket
    pub new_buckets: Vec<Vec<String>>,
    /// Address keys per Tried bucket
    pub tried_buckets: Vec<Vec<String>>,
}

fn to_unix(ts: Option<Timestamp>) -> i64 {
    ts.map_or(0, |t| t.as_unix())
}

fn from_unix(secs: i64) -> Option<Timestamp> {
    (secs > 0).then(|| Timestamp::from_unix(secs))
}

fn bucket_keys(arena: &AddressArena, table: &AddressTable) -> Vec<Vec<String>> {
    table
        .buckets()
        .map(|bucket| {
            bucket
                .entries()
                .iter()
                .filter_map(|h| arena.get(*h))
                .map(|ka| ka.na().key())
                .collect()
        })
        .collect()
}

impl AddressBook {
    /// Capture the current state for persistence.
    pub fn snapshot(&self) -> PeersSnapshot {
        let addresses = self
            .arena
            .iter()
            .map(|(_, ka)| SerializedKnownAddress {
                addr: ka.na().key(),
                src: ka.src().key(),
                attempts: ka.attempts(),
                time_stamp: ka.na().timestamp().as_unix(),
                last_attempt: to_unix(ka.last_attempt()),
                last_success: to_unix(ka.last_success()),
            })
            .collect();

        PeersSnapshot {
            version: SERIALISATION_VERSION,
            key: *self.bucketer.key(),
            addresses,
            new_buckets: bucket_keys(&self.arena, &self.new_table),
            tried_buckets: bucket_keys(&self.arena, &self.tried_table),
        }
    }

    /// Replace the current state with `snapshot`.
    ///
    /// The snapshot is fully validated before anything is replaced; on error
    /// the book is left untouched. Services are not persisted and come back
    /// as `NODE_NETWORK`.
    pub fn restore(&mut self, snapshot: PeersSnapshot) -> Result<(), PersistenceError> {
        if snapshot.version != SERIALISATION_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: snapshot.version,
                expected: SERIALISATION_VERSION,
            });
        }
        check_bucket_count("new", snapshot.new_buckets.len(), NEW_BUCKET_COUNT)?;
        check_bucket_count("tried", snapshot.tried_buckets.len(), TRIED_BUCKET_COUNT)?;

        let mut arena = AddressArena::default();
        for record in &snapshot.addresses {
            let ts = Timestamp::from_unix(record.time_stamp);
            let na = NetAddress::parse(&record.addr, ServiceFlag::NODE_NETWORK, ts)
                .map_err(|_| PersistenceError::InvalidAddress(record.addr.clone()))?;
            let src = NetAddress::parse(&record.src, ServiceFlag::NODE_NETWORK, ts)
                .map_err(|_| PersistenceError::InvalidAddress(record.src.clone()))?;
            let key = na.key();
            let ka = KnownAddress::restored(
                na,
                src,
                record.attempts,
                from_unix(record.last_attempt),
                from_unix(record.last_success),
            );
            arena.insert(key, ka);
        }

        let mut new_table = AddressTable::new(NEW_BUCKET_COUNT);
        let mut n_new = 0;
        for (idx, keys) in snapshot.new_buckets.iter().enumerate() {
            check_bucket_len("new", idx, keys.len(), NEW_BUCKET_SIZE)?;
            for key in keys {
                let handle = arena
                    .find(key)
                    .ok_or_else(|| PersistenceError::DanglingReference {
                        table: "new",
                        key: key.clone(),
                    })?;
                if new_table.bucket(idx).contains(handle) {
                    continue;
                }
                let Some(ka) = arena.get_mut(handle) else {
                    continue;
                };
                if ka.refs() >= NEW_BUCKETS_PER_ADDRESS {
                    return Err(PersistenceError::TooManyReferences(key.clone()));
                }
                if ka.refs() == 0 {
                    n_new += 1;
                }
                ka.inc_refs();
                new_table.push(idx, handle);
            }
        }

        let mut tried_table = AddressTable::new(TRIED_BUCKET_COUNT);
        let mut n_tried = 0;
        for (idx, keys) in snapshot.tried_buckets.iter().enumerate() {
            check_bucket_len("tried", idx, keys.len(), self.tried_bucket_size)?;
            for key in keys {
                let handle = arena
                    .find(key)
                    .ok_or_else(|| PersistenceError::DanglingReference {
                        table: "tried",
                        key: key.clone(),
                    })?;
                let Some(ka) = arena.get_mut(handle) else {
                    continue;
                };
                if ka.is_tried() {
                    return Err(PersistenceError::DuplicateTried(key.clone()));
                }
                ka.set_tried(true);
                n_tried += 1;
                tried_table.push(idx, handle);
            }
        }

        for (_, ka) in arena.iter() {
            if ka.refs() > 0 && ka.is_tried() {
                return Err(PersistenceError::NewAndTried(ka.na().key()));
            }
            if ka.refs() == 0 && !ka.is_tried() {
                return Err(PersistenceError::Unreferenced(ka.na().key()));
            }
        }

        self.bucketer = Bucketer::new(snapshot.key);
        self.arena = arena;
        self.new_table = new_table;
        self.tried_table = tried_table;
        self.n_new = n_new;
        self.n_tried = n_tried;
        // A save that snapshotted the replaced state must not clear dirty
        self.mark_dirty();
        self.mark_clean();
        Ok(())
    }
}

fn check_bucket_count(
    table: &'static str,
    found: usize,
    expected: usize,
) -> Result<(), PersistenceError> {
    if found != expected {
        return Err(PersistenceError::BucketCount {
            table,
            found,
            expected,
        });
    }
    Ok(())
}

fn check_bucket_len(
    table: &'static str,
    bucket: usize,
    len: usize,
    capacity: usize,
) -> Result<(), PersistenceError> {
    if len > capacity {
        return Err(PersistenceError::BucketOverflow {
            table,
            bucket,
            len,
            capacity,
        });
    }
    Ok(())
}
