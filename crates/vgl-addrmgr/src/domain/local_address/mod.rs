//! # Local Addresses
//!
//! What this node believes its own public addresses are, and which one to
//! advertise to a given peer.

mod reach;
mod table;

pub use reach::{get_remote_reachability_from_local, is_external_addr_candidate, NetAddressReach};
pub use table::{AddressPriority, LocalAddr, LocalAddressTable};
