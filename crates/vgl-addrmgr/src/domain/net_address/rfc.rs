//! Address range classification.
//!
//! SECURITY-CRITICAL: routability decides which gossiped addresses are
//! admitted at all, and the embedded-IPv4 extraction decides which network
//! group a tunnelled address is charged to. Isolate for security audits.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Does `ip` fall inside the IPv4 network `net/bits`?
fn in_v4(ip: &IpAddr, net: [u8; 4], bits: u32) -> bool {
    match ip {
        IpAddr::V4(v4) => v4_prefix_eq(*v4, Ipv4Addr::from(net), bits),
        IpAddr::V6(_) => false,
    }
}

/// Does `ip` fall inside the IPv6 network `net/bits`?
fn in_v6(ip: &IpAddr, net: [u16; 8], bits: u32) -> bool {
    match ip {
        IpAddr::V4(_) => false,
        IpAddr::V6(v6) => v6_prefix_eq(*v6, Ipv6Addr::from(net), bits),
    }
}

fn v4_prefix_eq(a: Ipv4Addr, b: Ipv4Addr, bits: u32) -> bool {
    let mask = u32::MAX.checked_shl(32 - bits).unwrap_or(0);
    (u32::from(a) & mask) == (u32::from(b) & mask)
}

fn v6_prefix_eq(a: Ipv6Addr, b: Ipv6Addr, bits: u32) -> bool {
    let mask = u128::MAX.checked_shl(128 - bits).unwrap_or(0);
    (u128::from(a) & mask) == (u128::from(b) & mask)
}

/// Mask an IPv4 address down to its first `bits` bits.
pub(crate) fn mask_v4(ip: Ipv4Addr, bits: u32) -> Ipv4Addr {
    let mask = u32::MAX.checked_shl(32 - bits).unwrap_or(0);
    Ipv4Addr::from(u32::from(ip) & mask)
}

/// Mask an IPv6 address down to its first `bits` bits.
pub(crate) fn mask_v6(ip: Ipv6Addr, bits: u32) -> Ipv6Addr {
    let mask = u128::MAX.checked_shl(128 - bits).unwrap_or(0);
    Ipv6Addr::from(u128::from(ip) & mask)
}

/// IPv4 private network space: 10/8, 172.16/12, 192.168/16.
pub fn is_rfc1918(ip: &IpAddr) -> bool {
    in_v4(ip, [10, 0, 0, 0], 8) || in_v4(ip, [172, 16, 0, 0], 12) || in_v4(ip, [192, 168, 0, 0], 16)
}

/// IPv4 inter-network benchmark space: 198.18/15.
pub fn is_rfc2544(ip: &IpAddr) -> bool {
    in_v4(ip, [198, 18, 0, 0], 15)
}

/// IPv6 documentation space: 2001:DB8::/32.
pub fn is_rfc3849(ip: &IpAddr) -> bool {
    in_v6(ip, [0x2001, 0x0db8, 0, 0, 0, 0, 0, 0], 32)
}

/// IPv4 autoconfiguration space: 169.254/16.
pub fn is_rfc3927(ip: &IpAddr) -> bool {
    in_v4(ip, [169, 254, 0, 0], 16)
}

/// IPv6 6to4 tunnel space: 2002::/16.
pub fn is_rfc3964(ip: &IpAddr) -> bool {
    in_v6(ip, [0x2002, 0, 0, 0, 0, 0, 0, 0], 16)
}

/// IPv6 unique local space: FC00::/7.
pub fn is_rfc4193(ip: &IpAddr) -> bool {
    in_v6(ip, [0xfc00, 0, 0, 0, 0, 0, 0, 0], 7)
}

/// IPv6 Teredo tunnel space: 2001::/32.
pub fn is_rfc4380(ip: &IpAddr) -> bool {
    in_v6(ip, [0x2001, 0, 0, 0, 0, 0, 0, 0], 32)
}

/// IPv6 ORCHID space: 2001:10::/28.
pub fn is_rfc4843(ip: &IpAddr) -> bool {
    in_v6(ip, [0x2001, 0x0010, 0, 0, 0, 0, 0, 0], 28)
}

/// IPv6 link-local autoconfiguration space: FE80::/64.
pub fn is_rfc4862(ip: &IpAddr) -> bool {
    in_v6(ip, [0xfe80, 0, 0, 0, 0, 0, 0, 0], 64)
}

/// IPv4 documentation space: 192.0.2/24, 198.51.100/24, 203.0.113/24.
pub fn is_rfc5737(ip: &IpAddr) -> bool {
    in_v4(ip, [192, 0, 2, 0], 24)
        || in_v4(ip, [198, 51, 100, 0], 24)
        || in_v4(ip, [203, 0, 113, 0], 24)
}

/// IPv4-embedded IPv6 well-known prefix: 64:FF9B::/96.
pub fn is_rfc6052(ip: &IpAddr) -> bool {
    in_v6(ip, [0x0064, 0xff9b, 0, 0, 0, 0, 0, 0], 96)
}

/// IPv4-translated IPv6 space: ::FFFF:0:0:0/96.
pub fn is_rfc6145(ip: &IpAddr) -> bool {
    in_v6(ip, [0, 0, 0, 0, 0xffff, 0, 0, 0], 96)
}

/// IPv4 carrier-grade NAT space: 100.64/10.
pub fn is_rfc6598(ip: &IpAddr) -> bool {
    in_v4(ip, [100, 64, 0, 0], 10)
}

/// Hurricane Electric's IPv6 allocation, grouped at /36 instead of /32.
pub fn is_he_net(ip: &IpAddr) -> bool {
    in_v6(ip, [0x2001, 0x0470, 0, 0, 0, 0, 0, 0], 32)
}

/// Loopback or the IPv4 "this network" block 0.0.0.0/8.
pub fn is_local(ip: &IpAddr) -> bool {
    ip.is_loopback() || in_v4(ip, [0, 0, 0, 0], 8)
}

/// Not unspecified and not the IPv4 limited broadcast address.
pub fn is_valid(ip: &IpAddr) -> bool {
    !(ip.is_unspecified() || *ip == IpAddr::V4(Ipv4Addr::BROADCAST))
}

/// Whether the address could be reached over the public internet.
pub fn is_routable(ip: &IpAddr) -> bool {
    is_valid(ip)
        && !(is_rfc1918(ip)
            || is_rfc2544(ip)
            || is_rfc3927(ip)
            || is_rfc4862(ip)
            || is_rfc3849(ip)
            || is_rfc4843(ip)
            || is_rfc5737(ip)
            || is_rfc6598(ip)
            || is_local(ip)
            || is_rfc4193(ip))
}

/// Extract the IPv4 address carried inside a tunnelled or translated IPv6
/// address, if any.
pub(crate) fn embedded_ipv4(ip: &IpAddr) -> Option<Ipv4Addr> {
    let IpAddr::V6(v6) = ip else {
        return None;
    };
    let b = v6.octets();
    if is_rfc6145(ip) || is_rfc6052(ip) {
        return Some(Ipv4Addr::new(b[12], b[13], b[14], b[15]));
    }
    if is_rfc3964(ip) {
        return Some(Ipv4Addr::new(b[2], b[3], b[4], b[5]));
    }
    if is_rfc4380(ip) {
        // Teredo stores the client's IPv4 address inverted.
        return Some(Ipv4Addr::new(b[12] ^ 0xff, b[13] ^ 0xff, b[14] ^ 0xff, b[15] ^ 0xff));
    }
    None
}
