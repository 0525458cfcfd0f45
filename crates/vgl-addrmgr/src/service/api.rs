//! Address table operations.
//!
//! Every method takes the table lock for in-memory work only and is safe to
//! call from any number of tasks.

use std::sync::Arc;

use tracing::trace;

use super::manager::AddressManager;
use crate::domain::address_manager::AddressManagerStats;
use crate::domain::net_address::{NetAddress, NetAddressType, ServiceFlag};
use crate::domain::{AddressManagerError, KnownAddress};

impl AddressManager {
    /// Record addresses gossiped by `src`. Unroutable ones are skipped.
    pub fn add_addresses(&self, addrs: &[NetAddress], src: &NetAddress) {
        let now = self.shared.time_source.now();
        let mut book = self.shared.book.lock();
        for addr in addrs {
            book.add_or_update(addr, src, now);
        }
        trace!(
            "[addrmgr] Processed {} addresses from {}, {} known",
            addrs.len(),
            src,
            book.num_addresses()
        );
    }

    /// Record a single address gossiped by `src`.
    pub fn add_address(&self, addr: &NetAddress, src: &NetAddress) {
        self.add_addresses(std::slice::from_ref(addr), src);
    }

    /// Number of known addresses.
    pub fn num_addresses(&self) -> usize {
        self.shared.book.lock().num_addresses()
    }

    /// Whether the manager would like more addresses gossiped to it.
    pub fn need_more_addresses(&self) -> bool {
        self.num_addresses() < self.shared.config.need_address_threshold
    }

    /// Random sample of proven addresses to answer a peer's address request.
    pub fn address_cache<F>(&self, filter: F) -> Vec<Arc<NetAddress>>
    where
        F: Fn(NetAddressType) -> bool,
    {
        let now = self.shared.time_source.now();
        let config = &self.shared.config;
        self.shared.book.lock().address_cache(
            filter,
            now,
            config.get_addr_percentage,
            config.get_addr_limit,
        )
    }

    /// Pick an address for an outbound connection. `None` if none are known.
    ///
    /// The returned record is a snapshot; later changes are not reflected.
    pub fn get_address(&self) -> Option<KnownAddress> {
        let now = self.shared.time_source.now();
        self.shared.book.lock().get_address(now)
    }

    /// Record that a connection to `addr` is being attempted.
    pub fn attempt(&self, addr: &NetAddress) -> Result<(), AddressManagerError> {
        let now = self.shared.time_source.now();
        self.shared.book.lock().attempt(addr, now)
    }

    /// Record that `addr` is still connected.
    pub fn connected(&self, addr: &NetAddress) -> Result<(), AddressManagerError> {
        let now = self.shared.time_source.now();
        self.shared.book.lock().connected(addr, now)
    }

    /// Record a successful connection to `addr`, promoting it to Tried.
    pub fn good(&self, addr: &NetAddress) -> Result<(), AddressManagerError> {
        let now = self.shared.time_source.now();
        self.shared.book.lock().good(addr, now)
    }

    /// Replace the services advertised by `addr`.
    pub fn set_services(
        &self,
        addr: &NetAddress,
        services: ServiceFlag,
    ) -> Result<(), AddressManagerError> {
        self.shared.book.lock().set_services(addr, services)
    }

    /// Snapshot of the record for `addr`, if known.
    pub fn lookup(&self, addr: &NetAddress) -> Option<KnownAddress> {
        self.shared.book.lock().find(addr).cloned()
    }

    /// Current table and local address counts.
    pub fn stats(&self) -> AddressManagerStats {
        let mut stats = self.shared.book.lock().stats();
        stats.local_count = self.local.read().len();
        stats
    }
}
