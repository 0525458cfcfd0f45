//! Keyed bucket placement.
//!
//! SECURITY-CRITICAL: Bucket placement is what stops one network region
//! from filling the tables. Isolate for security audits.

use std::fmt;

use sha2::{Digest, Sha256};

use super::config::{
    NEW_BUCKETS_PER_GROUP, NEW_BUCKET_COUNT, TRIED_BUCKETS_PER_GROUP, TRIED_BUCKET_COUNT,
};
use crate::domain::net_address::NetAddress;

/// Maps addresses to new and tried buckets under a secret 32-byte key.
///
/// # Security (Anti-Eclipse)
/// - An address group (IPv4 /16) reported by one source group reaches at
///   most `NEW_BUCKETS_PER_GROUP` new buckets.
/// - One address group reaches at most `TRIED_BUCKETS_PER_GROUP` tried
///   buckets.
/// - Without the key an attacker cannot aim addresses at a bucket.
#[derive(Clone)]
pub struct Bucketer {
    key: [u8; 32],
}

impl Bucketer {
    /// Bucketer using `key`.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// The secret key, persisted with the tables.
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// New bucket for `addr` as reported by `src`.
    pub fn new_bucket(&self, addr: &NetAddress, src: &NetAddress) -> usize {
        let addr_group = addr.group_key();
        let src_group = src.group_key();

        let h1 = self.hash(&[addr_group.as_bytes(), src_group.as_bytes()]) % NEW_BUCKETS_PER_GROUP;
        let h2 = self.hash(&[src_group.as_bytes(), &h1.to_le_bytes()]);
        (h2 % NEW_BUCKET_COUNT as u64) as usize
    }

    /// Tried bucket for `addr`.
    pub fn tried_bucket(&self, addr: &NetAddress) -> usize {
        let h1 = self.hash(&[addr.key().as_bytes()]) % TRIED_BUCKETS_PER_GROUP;
        let h2 = self.hash(&[addr.group_key().as_bytes(), &h1.to_le_bytes()]);
        (h2 % TRIED_BUCKET_COUNT as u64) as usize
    }

    /// SHA-256 over key || parts, first eight bytes read little-endian.
    fn hash(&self, parts: &[&[u8]]) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(prefix)
    }
}

impl fmt::Debug for Bucketer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucketer").field("key", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::net_address::ServiceFlag;
    use crate::domain::Timestamp;
    use std::collections::HashSet;

    fn addr(s: &str) -> NetAddress {
        NetAddress::parse(s, ServiceFlag::NODE_NETWORK, Timestamp::new(1)).unwrap()
    }

    #[test]
    fn test_placement_is_deterministic_under_key() {
        let b = Bucketer::new([7u8; 32]);
        let a = addr("12.1.2.3:9108");
        let s = addr("13.1.2.3:9108");
        assert_eq!(b.new_bucket(&a, &s), b.new_bucket(&a, &s));
        assert_eq!(b.tried_bucket(&a), b.tried_bucket(&a));
        assert!(b.new_bucket(&a, &s) < NEW_BUCKET_COUNT);
        assert!(b.tried_bucket(&a) < TRIED_BUCKET_COUNT);
    }

    #[test]
    fn test_one_source_group_reaches_bounded_new_buckets() {
        let b = Bucketer::new([1u8; 32]);
        let src = addr("13.1.2.3:9108");
        let mut buckets = HashSet::new();
        for i in 0..=255u8 {
            for j in [0u8, 64, 128, 255] {
                let a = addr(&format!("12.1.{i}.{j}:9108"));
                buckets.insert(b.new_bucket(&a, &src));
            }
        }
        // A single (address group, source group) pair maps to one bucket
        assert_eq!(buckets.len(), 1);

        // Many address groups from one source group stay under the per-group cap
        let mut spread = HashSet::new();
        for i in 1..=200u8 {
            let a = addr(&format!("{i}.9.1.1:9108"));
            spread.insert(b.new_bucket(&a, &src));
        }
        assert!(spread.len() <= NEW_BUCKETS_PER_GROUP as usize);
    }

    #[test]
    fn test_one_address_group_reaches_bounded_tried_buckets() {
        let b = Bucketer::new([2u8; 32]);
        let mut buckets = HashSet::new();
        for i in 0..=255u8 {
            for port in [1u16, 9108, 18108] {
                let a = addr(&format!("12.1.3.{i}:{port}"));
                buckets.insert(b.tried_bucket(&a));
            }
        }
        assert!(buckets.len() <= TRIED_BUCKETS_PER_GROUP as usize);
    }

    #[test]
    fn test_different_keys_place_differently() {
        let first = Bucketer::new([3u8; 32]);
        let second = Bucketer::new([4u8; 32]);
        let src = addr("13.1.2.3:9108");
        let addrs: Vec<NetAddress> = (1..=200u8)
            .map(|i| addr(&format!("{i}.{i}.1.1:9108")))
            .collect();

        let new_under = |b: &Bucketer| -> Vec<usize> {
            addrs.iter().map(|a| b.new_bucket(a, &src)).collect()
        };
        let tried_under =
            |b: &Bucketer| -> Vec<usize> { addrs.iter().map(|a| b.tried_bucket(a)).collect() };

        assert_ne!(new_under(&first), new_under(&second));
        assert_ne!(tried_under(&first), tried_under(&second));

        let moved = new_under(&first)
            .iter()
            .zip(new_under(&second))
            .filter(|(a, b)| **a != *b)
            .count();
        assert!(moved > addrs.len() / 2);
    }

    #[test]
    fn test_debug_hides_key() {
        let b = Bucketer::new([9u8; 32]);
        assert!(!format!("{b:?}").contains('9'));
    }
}
