//! Per-address bookkeeping kept by the address manager.

use std::sync::Arc;

use crate::domain::net_address::NetAddress;
use crate::domain::Timestamp;

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;

/// Days without a fresh announcement before an address is considered stale.
pub const NUM_MISSING_DAYS: u64 = 30;

/// Failed attempts before a never-successful address is considered bad.
pub const NUM_RETRIES: u32 = 3;

/// Failed attempts within `MIN_BAD_DAYS` before any address is considered bad.
pub const MAX_FAILURES: u32 = 5;

/// Window, in days, that a past success protects an address from `MAX_FAILURES`.
pub const MIN_BAD_DAYS: u64 = 7;

/// Lower bound on `chance` so selection always terminates.
const MIN_CHANCE: f64 = 1e-6;

/// Everything the address manager knows about one address.
///
/// The net address and source are shared `Arc`s. Updates replace the `Arc`,
/// so a snapshot handed to a caller never changes underneath them.
#[derive(Debug, Clone)]
pub struct KnownAddress {
    na: Arc<NetAddress>,
    src: Arc<NetAddress>,
    attempts: u32,
    last_attempt: Option<Timestamp>,
    last_success: Option<Timestamp>,
    refs: u8,
    tried: bool,
}

impl KnownAddress {
    /// Fresh record for an address heard about from `src`.
    pub(crate) fn new(na: NetAddress, src: NetAddress) -> Self {
        Self {
            na: Arc::new(na),
            src: Arc::new(src),
            attempts: 0,
            last_attempt: None,
            last_success: None,
            refs: 0,
            tried: false,
        }
    }

    /// Record rebuilt from a peers file. Table membership is restored later.
    pub(crate) fn restored(
        na: NetAddress,
        src: NetAddress,
        attempts: u32,
        last_attempt: Option<Timestamp>,
        last_success: Option<Timestamp>,
    ) -> Self {
        Self {
            attempts,
            last_attempt,
            last_success,
            ..Self::new(na, src)
        }
    }

    /// The tracked address.
    pub fn net_address(&self) -> Arc<NetAddress> {
        Arc::clone(&self.na)
    }

    /// Borrow the tracked address.
    pub fn na(&self) -> &NetAddress {
        &self.na
    }

    /// The peer that first told us about this address.
    pub fn src(&self) -> &NetAddress {
        &self.src
    }

    /// Connection attempts since the last success.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time of the most recent connection attempt.
    pub fn last_attempt(&self) -> Option<Timestamp> {
        self.last_attempt
    }

    /// Time of the most recent successful connection.
    pub fn last_success(&self) -> Option<Timestamp> {
        self.last_success
    }

    /// Number of new buckets holding this address.
    pub fn refs(&self) -> u8 {
        self.refs
    }

    /// Whether the address lives in the tried table.
    pub fn is_tried(&self) -> bool {
        self.tried
    }

    pub(crate) fn replace_net_address(&mut self, na: NetAddress) {
        self.na = Arc::new(na);
    }

    pub(crate) fn record_attempt(&mut self, now: Timestamp) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);
    }

    pub(crate) fn record_success(&mut self, now: Timestamp) {
        self.last_success = Some(now);
        self.last_attempt = Some(now);
        self.attempts = 0;
    }

    pub(crate) fn set_refs(&mut self, refs: u8) {
        self.refs = refs;
    }

    pub(crate) fn inc_refs(&mut self) {
        self.refs = self.refs.saturating_add(1);
    }

    pub(crate) fn dec_refs(&mut self) -> u8 {
        self.refs = self.refs.saturating_sub(1);
        self.refs
    }

    pub(crate) fn set_tried(&mut self, tried: bool) {
        self.tried = tried;
    }

    /// Relative likelihood of this address being picked for a connection.
    ///
    /// Starts at 1.0, drops to 1% right after an attempt, and shrinks by a
    /// factor of 1.5 per failed attempt.
    pub fn chance(&self, now: Timestamp) -> f64 {
        let mut c = 1.0;
        let since_attempt = self.last_attempt.map(|t| now.secs_since(t));
        if matches!(since_attempt, Some(secs) if secs < 10 * MINUTE) {
            c *= 0.01;
        }
        let exponent = self.attempts.min(i32::MAX as u32) as i32;
        (c / 1.5f64.powi(exponent)).max(MIN_CHANCE)
    }

    /// Whether the address is worth forgetting.
    ///
    /// Never bad if tried within the last minute. Otherwise bad when its
    /// timestamp is more than ten minutes in the future or older than
    /// `NUM_MISSING_DAYS`, when it never succeeded after `NUM_RETRIES`
    /// attempts, or when it has `MAX_FAILURES` attempts and no success in
    /// the last `MIN_BAD_DAYS`.
    pub fn is_bad(&self, now: Timestamp) -> bool {
        if matches!(self.last_attempt, Some(t) if t > now.sub_secs(MINUTE)) {
            return false;
        }

        let ts = self.na.timestamp();
        if ts > now.add_secs(10 * MINUTE) {
            return true;
        }
        if ts < now.sub_secs(NUM_MISSING_DAYS * DAY) {
            return true;
        }

        if self.last_success.is_none() && self.attempts >= NUM_RETRIES {
            return true;
        }

        let recent_success =
            matches!(self.last_success, Some(t) if t > now.sub_secs(MIN_BAD_DAYS * DAY));
        !recent_success && self.attempts >= MAX_FAILURES
    }
}
