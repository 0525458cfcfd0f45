//! Address Manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// Number of buckets that new addresses are spread over.
pub const NEW_BUCKET_COUNT: usize = 1024;

/// Maximum number of addresses in each new bucket.
pub const NEW_BUCKET_SIZE: usize = 64;

/// Number of buckets that tried addresses are spread over.
pub const TRIED_BUCKET_COUNT: usize = 64;

/// Default maximum number of addresses in each tried bucket.
pub const DEFAULT_TRIED_BUCKET_SIZE: usize = 256;

/// Number of tried buckets one address group can be spread over.
pub const TRIED_BUCKETS_PER_GROUP: u64 = 8;

/// Number of new buckets one source group can be spread over.
pub const NEW_BUCKETS_PER_GROUP: u64 = 64;

/// Number of new buckets a frequently gossiped address may occupy.
pub const NEW_BUCKETS_PER_ADDRESS: u8 = 8;

/// Current on-disk format version of the peers file.
pub const SERIALISATION_VERSION: u32 = 1;

/// Configuration for the address manager
///
/// Table geometry is fixed by the constants above because the peers file
/// stores bucket membership by index; everything here can change between
/// runs without invalidating a saved file, except shrinking
/// `tried_bucket_size` below what a saved bucket holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressManagerConfig {
    /// File name of the peers snapshot inside the data directory.
    pub peers_filename: String,
    /// Maximum entries per tried bucket.
    pub tried_bucket_size: usize,
    /// Below this many known addresses the manager asks for more.
    pub need_address_threshold: usize,
    /// Interval between periodic saves, in seconds.
    pub dump_interval_secs: u64,
    /// Percentage of eligible addresses shared in an address cache reply.
    pub get_addr_percentage: usize,
    /// Hard cap on addresses shared in an address cache reply.
    pub get_addr_limit: usize,
}

impl Default for AddressManagerConfig {
    fn default() -> Self {
        Self {
            peers_filename: "peers.json".to_string(),
            tried_bucket_size: DEFAULT_TRIED_BUCKET_SIZE,
            need_address_threshold: 1000,
            dump_interval_secs: 10 * 60,
            get_addr_percentage: 23,
            get_addr_limit: 2500,
        }
    }
}

impl AddressManagerConfig {
    /// Testing config with small tried buckets and a fast flush.
    pub fn for_testing() -> Self {
        Self {
            tried_bucket_size: 4,
            need_address_threshold: 10,
            dump_interval_secs: 1,
            ..Self::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// ```toml
    /// peers_filename = "peers.json"
    /// tried_bucket_size = 256
    /// need_address_threshold = 1000
    /// dump_interval_secs = 600
    /// get_addr_percentage = 23
    /// get_addr_limit = 2500
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the manager cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peers_filename.is_empty() {
            return Err(ConfigError::Invalid("peers_filename must not be empty".into()));
        }
        if self.tried_bucket_size == 0 {
            return Err(ConfigError::Invalid("tried_bucket_size must be positive".into()));
        }
        if self.dump_interval_secs == 0 {
            return Err(ConfigError::Invalid("dump_interval_secs must be positive".into()));
        }
        if self.get_addr_percentage > 100 {
            return Err(ConfigError::Invalid(format!(
                "get_addr_percentage {} exceeds 100",
                self.get_addr_percentage
            )));
        }
        Ok(())
    }

    /// Interval between periodic saves.
    pub fn dump_interval(&self) -> Duration {
        Duration::from_secs(self.dump_interval_secs)
    }
}
