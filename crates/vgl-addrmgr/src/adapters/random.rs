//! Randomness adapters.
//!
//! | Adapter | Mock (Testing) | Production |
//! |---------|----------------|------------|
//! | `RandomSource` | `SeededRandomSource` | `OsRandomSource` |

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};

use crate::ports::RandomSource;

/// Production random source backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl OsRandomSource {
    /// Create a new OS random source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for OsRandomSource {
    fn random_usize(&self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        OsRng.gen_range(0..max)
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Deterministic random source for reproducible tests.
///
/// ```rust
/// use vgl_addrmgr::adapters::SeededRandomSource;
/// use vgl_addrmgr::ports::RandomSource;
///
/// let a = SeededRandomSource::new(42);
/// let b = SeededRandomSource::new(42);
/// assert_eq!(a.random_usize(1000), b.random_usize(1000));
/// ```
#[derive(Debug)]
pub struct SeededRandomSource {
    rng: Mutex<StdRng>,
}

impl SeededRandomSource {
    /// Random source producing the sequence for `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandomSource {
    fn random_usize(&self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        self.rng.lock().gen_range(0..max)
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }
}
