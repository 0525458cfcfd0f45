//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the address manager requires from its host: a clock, a
//! randomness source, and somewhere to keep the peers snapshot.

use crate::domain::address_manager::PeersSnapshot;
use crate::domain::{PersistenceError, Timestamp};

/// Abstract interface for time-related operations.
///
/// Production uses the system clock; tests drive a manual clock so
/// staleness rules can be exercised without sleeping.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Abstract interface for randomness.
///
/// # Security
///
/// Bucket keys come from `fill_bytes`; production must back this with a
/// CSPRNG so an attacker cannot predict bucket placement.
pub trait RandomSource: Send + Sync {
    /// Uniform value in `0..max`. Returns 0 when `max` is 0.
    fn random_usize(&self, max: usize) -> usize;

    /// Fill `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Fisher-Yates shuffle driven by a [`RandomSource`].
pub fn shuffle<T>(rng: &dyn RandomSource, slice: &mut [T]) {
    for i in (1..slice.len()).rev() {
        let j = rng.random_usize(i + 1);
        slice.swap(i, j);
    }
}

/// Durable storage for the peers snapshot.
pub trait PeerStore: Send + Sync {
    /// Read the stored snapshot. `Ok(None)` when nothing has been stored.
    fn load(&self) -> Result<Option<PeersSnapshot>, PersistenceError>;

    /// Replace the stored snapshot. Must not leave a partial snapshot behind.
    fn save(&self, snapshot: &PeersSnapshot) -> Result<(), PersistenceError>;

    /// Delete the stored snapshot. Succeeds if there was none.
    fn remove(&self) -> Result<(), PersistenceError>;

    /// Human-readable location for log messages.
    fn location(&self) -> String;
}
