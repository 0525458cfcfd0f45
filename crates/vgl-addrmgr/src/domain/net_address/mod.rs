//! # Network Addresses
//!
//! The address value the manager stores, plus the routability and
//! network-group rules that keep private, reserved, and tunnelled ranges
//! from skewing the tables.

pub mod filter;
pub mod rfc;
mod types;

pub use types::{encode_host, NetAddress, NetAddressType, ServiceFlag};
