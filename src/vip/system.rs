use super::{DetectError, InterfaceAddr, InterfaceSource, NetInterface};
use get_if_addrs::{get_if_addrs, IfAddr, Interface};
use std::net::IpAddr;

/// Interface state as the kernel reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFlags {
    pub up: bool,
    pub loopback: bool,
}

#[cfg(target_os = "linux")]
const IFF_UP: u32 = 0x1;
#[cfg(target_os = "linux")]
const IFF_LOOPBACK: u32 = 0x8;

/// Reads the host's interfaces through `getifaddrs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<NetInterface>, DetectError> {
        let raw = get_if_addrs().map_err(DetectError::Enumerate)?;
        group_interfaces(raw, link_flags)
    }
}

/// Fold the per-address entries from `getifaddrs` into one entry per link.
///
/// Labelled aliases such as `eth0:vip` are addresses of `eth0`. Links keep
/// the order in which they were first seen.
pub fn group_interfaces<F>(raw: Vec<Interface>, flags_of: F) -> Result<Vec<NetInterface>, DetectError>
where
    F: Fn(&str, &Interface) -> Result<LinkFlags, DetectError>,
{
    let mut interfaces: Vec<NetInterface> = Vec::new();

    for entry in raw {
        let link = link_name(&entry.name);
        let addr = interface_addr(&entry.addr);

        if let Some(existing) = interfaces.iter_mut().find(|i| i.name == link) {
            existing.addrs.push(addr);
            continue;
        }

        let flags = flags_of(link, &entry)?;
        interfaces.push(NetInterface {
            name: link.to_string(),
            up: flags.up,
            loopback: flags.loopback,
            addrs: vec![addr],
        });
    }

    Ok(interfaces)
}

fn link_name(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

fn interface_addr(addr: &IfAddr) -> InterfaceAddr {
    match addr {
        IfAddr::V4(v4) => InterfaceAddr::Net {
            ip: IpAddr::V4(v4.ip),
            prefix_len: u32::from(v4.netmask).count_ones() as u8,
        },
        IfAddr::V6(v6) => InterfaceAddr::Net {
            ip: IpAddr::V6(v6.ip),
            prefix_len: u128::from(v6.netmask).count_ones() as u8,
        },
    }
}

#[cfg(target_os = "linux")]
fn link_flags(link: &str, _entry: &Interface) -> Result<LinkFlags, DetectError> {
    let path = format!("/sys/class/net/{}/flags", link);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        // The link went away after getifaddrs listed it.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("Interface {} vanished during scan", link);
            return Ok(LinkFlags {
                up: false,
                loopback: false,
            });
        }
        Err(source) => {
            return Err(DetectError::Flags {
                name: link.to_string(),
                source,
            })
        }
    };
    let bits = parse_flags(&raw).ok_or_else(|| DetectError::MalformedFlags {
        name: link.to_string(),
        value: raw.trim().to_string(),
    })?;
    Ok(LinkFlags {
        up: bits & IFF_UP != 0,
        loopback: bits & IFF_LOOPBACK != 0,
    })
}

// Without sysfs, getifaddrs only lists configured links; treat them as up.
#[cfg(not(target_os = "linux"))]
fn link_flags(_link: &str, entry: &Interface) -> Result<LinkFlags, DetectError> {
    Ok(LinkFlags {
        up: true,
        loopback: entry.is_loopback(),
    })
}

#[cfg(target_os = "linux")]
fn parse_flags(raw: &str) -> Option<u32> {
    let hex = raw.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    u32::from_str_radix(hex, 16).ok()
}
