//! Reachability classification between a local and a remote address.

use crate::domain::net_address::{rfc, NetAddress, NetAddressType};

/// How well a local address can be contacted from a remote address.
///
/// Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NetAddressReach {
    /// Not publicly reachable.
    Unreachable = 0,
    /// Reachable, nothing better known.
    Default = 1,
    /// Both ends on Teredo.
    Teredo = 2,
    /// IPv6 through a tunnel.
    Ipv6Weak = 3,
    /// IPv4 to IPv4.
    Ipv4 = 4,
    /// Native IPv6 to IPv6.
    Ipv6Strong = 5,
}

/// Classify how `remote` would reach us at `local`.
pub fn get_remote_reachability_from_local(
    local: &NetAddress,
    remote: &NetAddress,
) -> NetAddressReach {
    let local_ip = local.ip();
    let remote_ip = remote.ip();

    if !remote.is_routable() {
        return NetAddressReach::Unreachable;
    }

    if rfc::is_rfc4380(&remote_ip) {
        return if !local.is_routable() {
            NetAddressReach::Default
        } else if rfc::is_rfc4380(&local_ip) {
            NetAddressReach::Teredo
        } else if local.addr_type() == NetAddressType::IPv4 {
            NetAddressReach::Ipv4
        } else {
            NetAddressReach::Ipv6Weak
        };
    }

    match remote.addr_type() {
        NetAddressType::IPv4 => {
            if local.is_routable() && local.addr_type() == NetAddressType::IPv4 {
                NetAddressReach::Ipv4
            } else {
                NetAddressReach::Unreachable
            }
        }
        NetAddressType::IPv6 => {
            if !local.is_routable() {
                NetAddressReach::Default
            } else if rfc::is_rfc4380(&local_ip) {
                NetAddressReach::Teredo
            } else if local.addr_type() == NetAddressType::IPv4 {
                NetAddressReach::Ipv4
            } else if rfc::is_rfc3964(&local_ip)
                || rfc::is_rfc6052(&local_ip)
                || rfc::is_rfc6145(&local_ip)
            {
                // Tunnelled IPv6 ranks below IPv4
                NetAddressReach::Ipv6Weak
            } else {
                NetAddressReach::Ipv6Strong
            }
        }
        NetAddressType::Unknown => NetAddressReach::Default,
    }
}

/// Whether a peer's report of our address is worth adopting.
///
/// A loopback or otherwise local suggestion is never a candidate, whatever
/// its reach. IPv4 needs `Ipv4` reach; IPv6 needs anything but
/// `Unreachable`.
pub fn is_external_addr_candidate(
    local: &NetAddress,
    remote: &NetAddress,
) -> (bool, NetAddressReach) {
    let reach = get_remote_reachability_from_local(local, remote);

    if rfc::is_local(&local.ip()) {
        return (false, reach);
    }

    let good = match local.addr_type() {
        NetAddressType::IPv4 => reach == NetAddressReach::Ipv4,
        NetAddressType::IPv6 => matches!(
            reach,
            NetAddressReach::Ipv6Weak
                | NetAddressReach::Ipv6Strong
                | NetAddressReach::Teredo
                | NetAddressReach::Default
        ),
        NetAddressType::Unknown => false,
    };
    (good, reach)
}
