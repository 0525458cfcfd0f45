//! Address-type filters.
//!
//! Any `Fn(NetAddressType) -> bool` works as a filter; these cover the
//! common cases.

use super::types::NetAddressType;

/// Accept every address type.
pub fn all(_: NetAddressType) -> bool {
    true
}

/// Accept IPv4 only.
pub fn ipv4_only(addr_type: NetAddressType) -> bool {
    addr_type == NetAddressType::IPv4
}

/// Accept IPv6 only.
pub fn ipv6_only(addr_type: NetAddressType) -> bool {
    addr_type == NetAddressType::IPv6
}
