use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{PingError, PingResult};

/// IP address family the session pings over
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Return `true` if `addr` belongs to this family
    pub fn matches(self, addr: &IpAddr) -> bool {
        match self {
            Family::V4 => addr.is_ipv4(),
            Family::V6 => addr.is_ipv6(),
        }
    }
}

impl Default for Family {
    fn default() -> Self {
        Family::V4
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// Parse the IP version as given on the command line
impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4" => Ok(Family::V4),
            "6" => Ok(Family::V6),
            other => Err(format!(
                "IP version must be either 4 or 6, got {:?}",
                other
            )),
        }
    }
}

/// Pick the first candidate address of the requested family
///
/// The candidates are scanned in the order the resolver returned them, so the choice is stable
/// for a stable input.
pub fn select(host: &str, addrs: &[IpAddr], family: Family) -> PingResult<IpAddr> {
    addrs
        .iter()
        .copied()
        .find(|addr| family.matches(addr))
        .ok_or_else(|| PingError::NoAddressForFamily {
            host: host.to_string(),
            family,
        })
}

/// Resolved destination of a ping session
///
/// The host name is only kept for display, every packet goes out to `addr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    addr: IpAddr,
}

impl Target {
    pub fn new(host: impl Into<String>, addr: IpAddr) -> Self {
        Self {
            host: host.into(),
            addr,
        }
    }

    /// Resolve `host` once and keep an address of the requested family
    ///
    /// Literal IP addresses are taken as they are, anything else goes through the system
    /// resolver.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails, returns nothing, or returns no address of `family`.
    pub fn resolve(host: &str, family: Family) -> PingResult<Self> {
        let candidates = match host.parse::<IpAddr>() {
            Ok(addr) => vec![addr],
            Err(_) => dns_lookup::lookup_host(host).map_err(|source| PingError::Resolve {
                host: host.to_string(),
                source,
            })?,
        };

        if candidates.is_empty() {
            return Err(PingError::NoAddress {
                host: host.to_string(),
            });
        }
        info!("IPs: {:?}", candidates);

        let addr = select(host, &candidates, family)?;
        info!("Resolved host {} to IP {}", host, addr);

        Ok(Self::new(host, addr))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn family(&self) -> Family {
        match self.addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}
