//! # Address Manager Module
//!
//! New/Tried address tables with keyed bucketing.
//!
//! ## Security Properties
//!
//! - **Keyed placement**: SHA-256 under a per-node secret decides buckets
//! - **Group limits**: one address group reaches at most 64 new buckets per
//!   source group and 8 tried buckets
//! - **Bounded buckets**: full new buckets expire bad or oldest entries
//!
//! ## Module Structure
//!
//! - `bucketer` - Keyed bucket placement (SECURITY-CRITICAL)
//! - `config` - Table geometry and tunables
//! - `manager` - `AddressBook` mutations
//! - `selection` - Connection candidate and address cache sampling
//! - `snapshot` - Persisted image of the tables
//! - `table` - Arena and bucket storage
//! - `types` - Handles and statistics

mod bucketer;
mod config;
mod manager;
mod selection;
mod snapshot;
mod table;
mod types;


pub use bucketer::Bucketer;
pub use config::*;
pub use manager::AddressBook;
pub use snapshot::{PeersSnapshot, SerializedKnownAddress};
pub use table::{AddressArena, AddressBucket, AddressTable};
pub use types::{AddressHandle, AddressManagerStats};
