//! # Domain Errors
//!
//! Error types for the address manager.

use thiserror::Error;

use crate::domain::net_address::NetAddressType;

/// Errors returned to callers of the address manager.
///
/// Only `AddressNotFound` is expected during normal operation; it tells a
/// peer-connection state machine that the address it is reporting on was
/// never recorded (or has since been expired).
#[derive(Debug, Error)]
pub enum AddressManagerError {
    /// The address has no known-address record.
    #[error("address {0} not found")]
    AddressNotFound(String),

    /// `good` was called for an address that is neither tried nor held in
    /// any New bucket.
    #[error("{0} is not marked as a new address")]
    NotNewAddress(String),

    /// A local address must be routable to be advertised.
    #[error("address {0} is not routable")]
    UnroutableLocalAddress(String),

    /// A `host:port` string could not be parsed.
    #[error("invalid network address: {0}")]
    InvalidAddress(String),

    /// The address type is not one the manager can track.
    #[error("unknown address type")]
    UnknownAddressType,

    /// The raw address bytes do not match the declared address type.
    #[error("address type {addr_type:?} does not match {len}-byte address")]
    MismatchedAddressType {
        /// Declared address type
        addr_type: NetAddressType,
        /// Length of the supplied address bytes
        len: usize,
    },

    /// The periodic flusher needs a Tokio runtime to run on.
    #[error("address manager must be started from within a Tokio runtime")]
    NoRuntime,

    /// The background flush task ended abnormally.
    #[error("address handler failed to shut down cleanly: {0}")]
    Shutdown(String),

    /// A save or load failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The supplied configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from reading or writing the peers file.
///
/// Any of these during a load is treated as corruption: the file is removed
/// and the address manager starts over with a fresh key.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem failure (open, write, sync, rename, remove).
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid JSON snapshot.
    #[error("malformed peers file: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot was written by an unknown format version.
    #[error("unknown version {found} in serialized addrmanager (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// The snapshot carries the wrong number of buckets.
    #[error("{table} table has {found} buckets, expected {expected}")]
    BucketCount {
        /// "new" or "tried"
        table: &'static str,
        /// Bucket count found
        found: usize,
        /// Bucket count expected
        expected: usize,
    },

    /// A bucket references an address missing from the address list.
    #[error("{table} buckets contains {key} but none in address list")]
    DanglingReference {
        /// "new" or "tried"
        table: &'static str,
        /// Address key referenced
        key: String,
    },

    /// An address string in the snapshot could not be parsed.
    #[error("failed to deserialize netaddress {0}")]
    InvalidAddress(String),

    /// An address ended up in both tables.
    #[error("address {0} after serialisation which is both new and tried")]
    NewAndTried(String),

    /// An address ended up in neither table.
    #[error("address {0} after serialisation with no references")]
    Unreferenced(String),

    /// An address is listed in more New buckets than one address may occupy.
    #[error("address {0} is referenced by too many new buckets")]
    TooManyReferences(String),

    /// An address is listed in more than one tried bucket.
    #[error("address {0} appears in more than one tried bucket")]
    DuplicateTried(String),

    /// A bucket holds more entries than its capacity allows.
    #[error("{table} bucket {bucket} holds {len} entries, capacity is {capacity}")]
    BucketOverflow {
        /// "new" or "tried"
        table: &'static str,
        /// Bucket index
        bucket: usize,
        /// Entries found
        len: usize,
        /// Configured capacity
        capacity: usize,
    },
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path being read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl PersistenceError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
