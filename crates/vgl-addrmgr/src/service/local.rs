//! Local address operations.

use super::manager::AddressManager;
use crate::domain::local_address::{self, AddressPriority, LocalAddr, NetAddressReach};
use crate::domain::net_address::{NetAddress, NetAddressType};
use crate::domain::AddressManagerError;

impl AddressManager {
    /// Record one of our own addresses, discovered via `priority`.
    ///
    /// Fails for unroutable addresses.
    pub fn add_local_address(
        &self,
        na: &NetAddress,
        priority: AddressPriority,
    ) -> Result<(), AddressManagerError> {
        self.local.write().add(na, priority)
    }

    /// Whether `na` is one of our recorded local addresses.
    pub fn has_local_address(&self, na: &NetAddress) -> bool {
        self.local.read().contains(na)
    }

    /// Summaries of our local addresses.
    pub fn local_addresses(&self) -> Vec<LocalAddr> {
        self.local.read().summaries()
    }

    /// The local address to advertise to `remote`, or an unroutable
    /// placeholder if none fits.
    pub fn get_best_local_address<F>(&self, remote: &NetAddress, filter: F) -> NetAddress
    where
        F: Fn(NetAddressType) -> bool,
    {
        self.local.read().best_for(remote, filter)
    }

    /// Whether `local`, as reported to us by `remote`, is a plausible public
    /// address for this node, and how well it reaches `remote`.
    pub fn is_external_addr_candidate(
        &self,
        local: &NetAddress,
        remote: &NetAddress,
    ) -> (bool, NetAddressReach) {
        local_address::is_external_addr_candidate(local, remote)
    }
}
