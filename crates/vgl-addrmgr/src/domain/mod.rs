//! # Domain Layer
//!
//! Pure address-book logic. Nothing in here touches the clock, the OS RNG,
//! or the filesystem directly; those arrive through the ports.

pub mod address_manager;
pub mod errors;
pub mod known_address;
pub mod local_address;
pub mod net_address;
pub mod value_objects;

pub use errors::{AddressManagerError, ConfigError, PersistenceError};
pub use known_address::KnownAddress;
pub use value_objects::Timestamp;
