//! Virtual IP ownership detection.
//!
//! The host is considered to own the VIP when an interface that is up and
//! not a loopback device carries an IPv4 address whose dotted-decimal form
//! is exactly the configured string.

pub mod system;

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

pub use system::SystemInterfaces;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[source] io::Error),
    #[error("failed to read flags of interface {name}: {source}")]
    Flags {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed flags `{value}` for interface {name}")]
    MalformedFlags { name: String, value: String },
}

/// An address assigned to an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceAddr {
    /// Address together with the prefix length of its subnet.
    Net { ip: IpAddr, prefix_len: u8 },
    /// Address reported without subnet information.
    Bare(IpAddr),
}

impl InterfaceAddr {
    pub fn ip(&self) -> IpAddr {
        match *self {
            InterfaceAddr::Net { ip, .. } => ip,
            InterfaceAddr::Bare(ip) => ip,
        }
    }

    /// The IPv4 form of this address, if it has one.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) count as IPv4; any
    /// other IPv6 address has no IPv4 form. Loopback addresses are never
    /// returned.
    pub fn routable_ipv4(&self) -> Option<Ipv4Addr> {
        let v4 = match self.ip() {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
        };
        if v4.is_loopback() {
            None
        } else {
            Some(v4)
        }
    }
}

impl fmt::Display for InterfaceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceAddr::Net { ip, prefix_len } => write!(f, "{}/{}", ip, prefix_len),
            InterfaceAddr::Bare(ip) => write!(f, "{}", ip),
        }
    }
}

/// A snapshot of one network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    pub name: String,
    pub up: bool,
    pub loopback: bool,
    pub addrs: Vec<InterfaceAddr>,
}

/// Something that can list the host's network interfaces.
pub trait InterfaceSource: Send + Sync {
    fn interfaces(&self) -> Result<Vec<NetInterface>, DetectError>;
}

/// Report whether any eligible interface carries `target`.
///
/// Enumeration errors abort the scan; no partial answer is returned.
pub fn detect(source: &dyn InterfaceSource, target: &str) -> Result<bool, DetectError> {
    let interfaces = source.interfaces()?;
    match find_vip(&interfaces, target) {
        Some((iface, addr)) => {
            log::debug!("VIP {} found on {} ({})", target, iface.name, addr);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Find the first interface and address matching `target`.
pub fn find_vip<'a>(
    interfaces: &'a [NetInterface],
    target: &str,
) -> Option<(&'a NetInterface, &'a InterfaceAddr)> {
    interfaces
        .iter()
        .filter(|iface| iface.up && !iface.loopback)
        .find_map(|iface| {
            iface
                .addrs
                .iter()
                .find(|addr| {
                    addr.routable_ipv4()
                        .map_or(false, |v4| v4.to_string() == target)
                })
                .map(|addr| (iface, addr))
        })
}
