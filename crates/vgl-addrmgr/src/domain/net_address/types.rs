//! Network address value type.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ops::{BitOr, BitOrAssign};

use super::rfc;
use crate::domain::{AddressManagerError, Timestamp};

/// Address family of a [`NetAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetAddressType {
    /// Not an address family the manager can track.
    Unknown,
    /// IPv4 (4-byte) address.
    IPv4,
    /// IPv6 (16-byte) address.
    IPv6,
}

/// Bitmask of services advertised by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ServiceFlag(u64);

impl ServiceFlag {
    /// No services.
    pub const NONE: ServiceFlag = ServiceFlag(0);
    /// Full node serving the complete block chain.
    pub const NODE_NETWORK: ServiceFlag = ServiceFlag(1 << 0);
    /// Node supporting bloom filtering.
    pub const NODE_BLOOM: ServiceFlag = ServiceFlag(1 << 1);
    /// Node supporting committed filters.
    pub const NODE_CF: ServiceFlag = ServiceFlag(1 << 2);

    /// Build from raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(&self, other: ServiceFlag) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ServiceFlag {
    type Output = ServiceFlag;

    fn bitor(self, rhs: Self) -> Self::Output {
        ServiceFlag(self.0 | rhs.0)
    }
}

impl BitOrAssign for ServiceFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A peer network address as gossiped on the wire.
///
/// Values are treated as immutable once handed to the address manager:
/// updates go through the `with_*` builders, which return a fresh value, and
/// the manager swaps the owning `Arc`. Anyone holding an older value keeps a
/// consistent (if stale) snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetAddress {
    ip: IpAddr,
    port: u16,
    services: ServiceFlag,
    timestamp: Timestamp,
}

impl NetAddress {
    /// Create an address. IPv4-mapped IPv6 addresses are stored as IPv4.
    pub fn new(ip: IpAddr, port: u16, services: ServiceFlag, timestamp: Timestamp) -> Self {
        Self {
            ip: canonical_ip(ip),
            port,
            services,
            timestamp,
        }
    }

    /// Create an address from an encoded host (see [`encode_host`]).
    pub fn from_params(
        addr_type: NetAddressType,
        addr_bytes: &[u8],
        port: u16,
        timestamp: Timestamp,
        services: ServiceFlag,
    ) -> Result<Self, AddressManagerError> {
        let mismatch = || AddressManagerError::MismatchedAddressType {
            addr_type,
            len: addr_bytes.len(),
        };
        let ip = match addr_type {
            NetAddressType::IPv4 => {
                let octets: [u8; 4] = addr_bytes.try_into().map_err(|_| mismatch())?;
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            NetAddressType::IPv6 => {
                let octets: [u8; 16] = addr_bytes.try_into().map_err(|_| mismatch())?;
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            NetAddressType::Unknown => return Err(AddressManagerError::UnknownAddressType),
        };
        Ok(Self::new(ip, port, services, timestamp))
    }

    /// Parse a `host:port` string (`[v6]:port` for IPv6).
    pub fn parse(
        host_port: &str,
        services: ServiceFlag,
        timestamp: Timestamp,
    ) -> Result<Self, AddressManagerError> {
        let addr: SocketAddr = host_port
            .parse()
            .map_err(|_| AddressManagerError::InvalidAddress(host_port.to_string()))?;
        Ok(Self::new(addr.ip(), addr.port(), services, timestamp))
    }

    /// IP address.
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Advertised services.
    pub fn services(&self) -> ServiceFlag {
        self.services
    }

    /// Last time the address was seen announced.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Address family.
    pub fn addr_type(&self) -> NetAddressType {
        match self.ip {
            IpAddr::V4(_) => NetAddressType::IPv4,
            IpAddr::V6(_) => NetAddressType::IPv6,
        }
    }

    /// Canonical `host:port` key identifying this address.
    pub fn key(&self) -> String {
        SocketAddr::new(self.ip, self.port).to_string()
    }

    /// Host part of the key, without the port.
    pub fn ip_string(&self) -> String {
        self.ip.to_string()
    }

    /// Network group used to bound how many buckets one region can reach.
    ///
    /// IPv4 groups at /16; tunnelled IPv6 is charged to its embedded IPv4
    /// /16; native IPv6 groups at /32 (/36 for Hurricane Electric).
    pub fn group_key(&self) -> String {
        let ip = &self.ip;
        if rfc::is_local(ip) {
            return "local".to_string();
        }
        if !self.is_routable() {
            return "unroutable".to_string();
        }
        match ip {
            IpAddr::V4(v4) => rfc::mask_v4(*v4, 16).to_string(),
            IpAddr::V6(v6) => {
                if let Some(embedded) = rfc::embedded_ipv4(ip) {
                    return rfc::mask_v4(embedded, 16).to_string();
                }
                let bits = if rfc::is_he_net(ip) { 36 } else { 32 };
                rfc::mask_v6(*v6, bits).to_string()
            }
        }
    }

    /// Whether the address could be reached over the public internet.
    pub fn is_routable(&self) -> bool {
        rfc::is_routable(&self.ip)
    }

    /// Set additional service bits in place.
    pub fn add_service(&mut self, services: ServiceFlag) {
        self.services |= services;
    }

    /// Copy with a new timestamp.
    pub fn with_timestamp(&self, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    /// Copy with replaced services.
    pub fn with_services(&self, services: ServiceFlag) -> Self {
        Self {
            services,
            ..self.clone()
        }
    }
}

impl fmt::Display for NetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SocketAddr::new(self.ip, self.port))
    }
}

fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

/// Identify `host` as a supported address type and return its encoding.
///
/// Unrecognised hosts yield `(Unknown, [])` rather than an error.
pub fn encode_host(host: &str) -> (NetAddressType, Vec<u8>) {
    match host.parse::<IpAddr>().map(canonical_ip) {
        Ok(IpAddr::V4(v4)) => (NetAddressType::IPv4, v4.octets().to_vec()),
        Ok(IpAddr::V6(v6)) => (NetAddressType::IPv6, v6.octets().to_vec()),
        Err(_) => (NetAddressType::Unknown, Vec::new()),
    }
}
