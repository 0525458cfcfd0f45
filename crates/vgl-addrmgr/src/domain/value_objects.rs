//! Value Objects for the Address Manager

/// Unix timestamp in seconds
///
/// # Security (Timestamp Bounds)
///
/// Timestamps are clamped to a reasonable maximum so a peer gossiping a
/// far-future `u64::MAX` timestamp cannot overflow staleness arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// The Unix epoch. Used as the "never" sentinel in persisted snapshots.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Create a timestamp from signed seconds (as stored on disk).
    /// Negative values clamp to the epoch.
    pub fn from_unix(secs: i64) -> Self {
        Self::new(secs.max(0) as u64)
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Signed seconds for the on-disk format.
    pub fn as_unix(&self) -> i64 {
        self.0 as i64
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Subtract seconds from timestamp (saturating at 0).
    pub fn sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let ts = Timestamp::new(100);
        assert_eq!(ts.add_secs(50).as_secs(), 150);
        assert_eq!(ts.sub_secs(50).as_secs(), 50);
        assert_eq!(ts.sub_secs(200).as_secs(), 0); // Saturating
    }

    #[test]
    fn test_timestamp_clamps_far_future() {
        assert_eq!(Timestamp::new(u64::MAX).as_secs(), Timestamp::MAX_REASONABLE);
        assert_eq!(
            Timestamp::new(10).add_secs(u64::MAX).as_secs(),
            Timestamp::MAX_REASONABLE
        );
    }

    #[test]
    fn test_unix_round_trip_and_negative_clamp() {
        assert_eq!(Timestamp::from_unix(1_700_000_000).as_unix(), 1_700_000_000);
        assert_eq!(Timestamp::from_unix(-62_135_596_800), Timestamp::EPOCH);
    }

    #[test]
    fn test_secs_since() {
        let later = Timestamp::new(1_000);
        assert_eq!(later.secs_since(Timestamp::new(400)), 600);
        assert_eq!(Timestamp::new(400).secs_since(later), 0);
    }
}
