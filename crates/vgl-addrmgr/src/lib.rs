//! # Peer Address Manager
//!
//! Discovers, scores, persists, and serves candidate network peers so a
//! node can bootstrap and maintain its P2P mesh without a central
//! directory.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** New/Tried tables, keyed bucketing, selection, local
//!   address reachability, the persisted snapshot format
//! - **Ports Layer:** Clock, randomness, and peer storage traits
//! - **Adapters Layer:** System clock, OS RNG, JSON peers file, TOML config
//! - **Service Layer:** Thread-safe [`AddressManager`] with a periodic
//!   flush task
//!
//! ## Security
//!
//! - Bucket placement is keyed by a per-node secret, so gossip cannot be
//!   aimed at a bucket
//! - One address group reaches a bounded number of buckets
//! - A peer cannot talk the node into advertising a loopback address
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vgl_addrmgr::adapters::{JsonPeersFile, ManualTimeSource, SeededRandomSource};
//! use vgl_addrmgr::{AddressManager, AddressManagerConfig, NetAddress, ServiceFlag, Timestamp};
//!
//! let dir = std::env::temp_dir().join("vgl-addrmgr-doc");
//! let manager = AddressManager::with_ports(
//!     AddressManagerConfig::default(),
//!     Box::new(JsonPeersFile::new(dir.join("peers.json"))),
//!     Arc::new(ManualTimeSource::new(1_700_000_000)),
//!     Box::new(SeededRandomSource::new(7)),
//! )
//! .unwrap();
//!
//! let now = Timestamp::new(1_700_000_000);
//! let src = NetAddress::parse("173.144.173.111:9108", ServiceFlag::NODE_NETWORK, now).unwrap();
//! let addr = NetAddress::parse("12.1.2.3:9108", ServiceFlag::NODE_NETWORK, now).unwrap();
//! manager.add_address(&addr, &src);
//!
//! let candidate = manager.get_address().unwrap();
//! manager.attempt(candidate.na()).unwrap();
//! manager.good(candidate.na()).unwrap();
//! assert_eq!(manager.stats().tried_count, 1);
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::address_manager::{AddressManagerConfig, AddressManagerStats};
pub use domain::local_address::{AddressPriority, LocalAddr, NetAddressReach};
pub use domain::net_address::{encode_host, filter, NetAddress, NetAddressType, ServiceFlag};
pub use domain::{
    AddressManagerError, ConfigError, KnownAddress, PersistenceError, Timestamp,
};

// Port traits
pub use ports::{PeerStore, RandomSource, TimeSource};

// Service
pub use service::AddressManager;
