//! Addresses this node may be reachable at.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::debug;

use super::reach::{get_remote_reachability_from_local, NetAddressReach};
use crate::domain::net_address::{NetAddress, NetAddressType, ServiceFlag};
use crate::domain::{AddressManagerError, Timestamp};

/// How a local address was discovered, in ascending order of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressPriority {
    /// Found on a local interface.
    Interface = 0,
    /// Explicitly bound to.
    Bound = 1,
    /// Obtained from UPnP.
    Upnp = 2,
    /// Obtained from an external HTTP service.
    Http = 3,
    /// Configured by the operator.
    Manual = 4,
}

impl AddressPriority {
    /// Numeric score of this priority.
    pub fn score(self) -> i32 {
        self as i32
    }
}

/// Summary of a local address for RPC reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAddr {
    /// Host part, without port
    pub address: String,
    /// Port
    pub port: u16,
    /// Current priority score
    pub score: i32,
}

#[derive(Debug, Clone)]
struct LocalAddress {
    na: NetAddress,
    score: i32,
}

/// Local addresses keyed by `host:port`.
#[derive(Debug, Default)]
pub struct LocalAddressTable {
    addresses: HashMap<String, LocalAddress>,
}

impl LocalAddressTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `na` as a local address discovered via `priority`.
    ///
    /// A new address is stored with the priority's score. A known address
    /// whose score is below `priority` is bumped to one above it and keeps
    /// its stored value; otherwise nothing changes.
    pub fn add(
        &mut self,
        na: &NetAddress,
        priority: AddressPriority,
    ) -> Result<(), AddressManagerError> {
        if !na.is_routable() {
            return Err(AddressManagerError::UnroutableLocalAddress(na.to_string()));
        }

        let score = priority.score();
        match self.addresses.get_mut(&na.key()) {
            Some(existing) if existing.score < score => {
                existing.score = score + 1;
            }
            Some(_) => {}
            None => {
                self.addresses.insert(
                    na.key(),
                    LocalAddress {
                        na: na.clone(),
                        score,
                    },
                );
            }
        }
        Ok(())
    }

    /// Whether `na` is a known local address.
    pub fn contains(&self, na: &NetAddress) -> bool {
        self.addresses.contains_key(&na.key())
    }

    /// Number of local addresses.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether there are no local addresses.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Summaries of every local address.
    pub fn summaries(&self) -> Vec<LocalAddr> {
        self.addresses
            .values()
            .map(|la| LocalAddr {
                address: la.na.ip_string(),
                port: la.na.port(),
                score: la.score,
            })
            .collect()
    }

    /// Best address to advertise to `remote`.
    ///
    /// Picks the highest `(reach, score)` among addresses accepted by
    /// `filter`, requiring better than `Default` reach or a positive score.
    /// Falls back to an unroutable placeholder (`0.0.0.0` or `::`, port 0) so
    /// the caller always has something well-formed to send.
    pub fn best_for<F>(&self, remote: &NetAddress, filter: F) -> NetAddress
    where
        F: Fn(NetAddressType) -> bool,
    {
        let mut best_reach = NetAddressReach::Default;
        let mut best_score = 0;
        let mut best: Option<&NetAddress> = None;

        for la in self.addresses.values() {
            if !filter(la.na.addr_type()) {
                continue;
            }
            let reach = get_remote_reachability_from_local(&la.na, remote);
            if reach > best_reach || (reach == best_reach && la.score > best_score) {
                best_reach = reach;
                best_score = la.score;
                best = Some(&la.na);
            }
        }

        match best {
            Some(na) => {
                debug!("[addrmgr] Suggesting best local address {} for {}", na, remote);
                na.clone()
            }
            None => {
                debug!("[addrmgr] No worthy local address for {}", remote);
                let ip: IpAddr = match remote.addr_type() {
                    NetAddressType::IPv4 => Ipv4Addr::UNSPECIFIED.into(),
                    _ => Ipv6Addr::UNSPECIFIED.into(),
                };
                NetAddress::new(ip, 0, ServiceFlag::NODE_NETWORK, Timestamp::EPOCH)
            }
        }
    }
}
