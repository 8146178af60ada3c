//! Local address selection for the listener.
//!
//! Enumerates interface addresses, offers them to a caller-supplied accept
//! decision (or takes the first one in auto mode), and produces the
//! `BindTarget` the listener consumes. When nothing is selected the target
//! falls back to the IPv6 wildcard, which the listener opens dual-stack so
//! IPv4 clients still reach it.

use std::fmt;
use std::io;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Address family of an interface address or bind target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrFamily {
    V4,
    V6,
}

impl fmt::Display for AddrFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrFamily::V4 => write!(f, "IPv4"),
            AddrFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// One enumerated local interface address, offered as a bind candidate.
///
/// Only lives through selection; nothing is retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// Interface name, e.g. `eth0`.
    pub name: String,
    pub family: AddrFamily,
    /// Numeric textual form of the address (never a hostname).
    pub address: String,
}

/// Where the listener should bind: family, optional numeric address
/// (`None` means the family's wildcard), and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindTarget {
    pub family: AddrFamily,
    pub address: Option<String>,
    pub port: u16,
}

impl BindTarget {
    /// Default target when no address was selected: the IPv6 wildcard,
    /// served dual-stack by the listener.
    pub fn wildcard(port: u16) -> Self {
        BindTarget {
            family: AddrFamily::V6,
            address: None,
            port,
        }
    }

    /// Target for an explicitly configured address, skipping enumeration.
    pub fn explicit(ip: IpAddr, port: u16) -> Self {
        BindTarget {
            family: match ip {
                IpAddr::V4(_) => AddrFamily::V4,
                IpAddr::V6(_) => AddrFamily::V6,
            },
            address: Some(ip.to_string()),
            port,
        }
    }

    /// Resolve the textual address and port into a concrete socket
    /// address. Numeric parse only, no name lookups.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip = match &self.address {
            Some(text) => text.parse()?,
            None => match self.family {
                AddrFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                AddrFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            },
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Interface enumeration was unavailable. Fatal at startup.
#[derive(Debug)]
pub struct EnumerationError(io::Error);

impl fmt::Display for EnumerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to enumerate local interface addresses: {}", self.0)
    }
}

impl std::error::Error for EnumerationError {}

/// List all local IPv4/IPv6 interface addresses in first-seen order.
pub fn enumerate() -> Result<Vec<InterfaceAddress>, EnumerationError> {
    let interfaces = if_addrs::get_if_addrs().map_err(EnumerationError)?;

    Ok(interfaces
        .into_iter()
        .map(|iface| {
            let ip = iface.ip();
            InterfaceAddress {
                family: match ip {
                    IpAddr::V4(_) => AddrFamily::V4,
                    IpAddr::V6(_) => AddrFamily::V6,
                },
                address: ip.to_string(),
                name: iface.name,
            }
        })
        .collect())
}

/// Select a bind target from the local interface addresses.
///
/// Candidates outside `preferred` (when set) are skipped. With `auto` the
/// first remaining candidate wins; otherwise each candidate is offered to
/// `accept` and the first accepted one wins. If nothing is selected the
/// dual-stack wildcard target is returned.
pub fn select_address<F>(
    port: u16,
    preferred: Option<AddrFamily>,
    auto: bool,
    accept: F,
) -> Result<BindTarget, EnumerationError>
where
    F: FnMut(&InterfaceAddress) -> bool,
{
    let candidates = enumerate()?;
    Ok(choose(&candidates, port, preferred, auto, accept))
}

fn choose<F>(
    candidates: &[InterfaceAddress],
    port: u16,
    preferred: Option<AddrFamily>,
    auto: bool,
    mut accept: F,
) -> BindTarget
where
    F: FnMut(&InterfaceAddress) -> bool,
{
    for candidate in candidates {
        if let Some(family) = preferred {
            if candidate.family != family {
                continue;
            }
        }
        if auto || accept(candidate) {
            return BindTarget {
                family: candidate.family,
                address: Some(candidate.address.clone()),
                port,
            };
        }
    }
    BindTarget::wildcard(port)
}
