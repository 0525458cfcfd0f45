//! Clock adapters.
//!
//! | Adapter | Use |
//! |---------|-----|
//! | `SystemTimeSource` | Production, reads the system clock |
//! | `ManualTimeSource` | Tests, advanced by hand |

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::Timestamp;
use crate::ports::TimeSource;

/// Production time source using the system clock.
///
/// # Example
///
/// ```rust
/// use vgl_addrmgr::adapters::SystemTimeSource;
/// use vgl_addrmgr::ports::TimeSource;
///
/// let time_source = SystemTimeSource::new();
/// assert!(time_source.now().as_secs() > 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Create a new system time source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Timestamp::new(duration.as_secs())
    }
}

/// A clock that only moves when told to.
///
/// ```rust
/// use vgl_addrmgr::adapters::ManualTimeSource;
/// use vgl_addrmgr::ports::TimeSource;
///
/// let clock = ManualTimeSource::new(1_000);
/// clock.advance(60);
/// assert_eq!(clock.now().as_secs(), 1_060);
/// ```
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    secs: AtomicU64,
}

impl ManualTimeSource {
    /// Clock starting at `secs`.
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    /// Jump to `secs`.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}
