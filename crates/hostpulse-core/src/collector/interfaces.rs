//! Network interface discovery and primary-interface selection.

use std::net::Ipv4Addr;

use crate::collector::procfs::CollectError;
use crate::model::NetworkInfo;

/// One network interface with the addresses relevant to `NetworkInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceAddrs {
    pub name: String,
    pub is_up: bool,
    pub is_loopback: bool,
    /// IPv4 addresses in the order the kernel reports them.
    pub ipv4: Vec<Ipv4Addr>,
    /// Hardware address, if the interface has one.
    pub mac: Option<[u8; 6]>,
}

/// Source of the host's network interfaces, in discovery order.
pub trait InterfaceSource: Send + Sync {
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, CollectError>;
}

/// Interfaces of the running host via `getifaddrs(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, CollectError> {
        use nix::net::if_::InterfaceFlags;

        let addrs = nix::ifaddrs::getifaddrs().map_err(|e| CollectError::Io(e.into()))?;

        // getifaddrs yields one entry per (interface, address); fold them
        // back into interfaces while keeping first-seen order.
        let mut out: Vec<InterfaceAddrs> = Vec::new();
        for ifa in addrs {
            let idx = match out.iter().position(|i| i.name == ifa.interface_name) {
                Some(idx) => idx,
                None => {
                    out.push(InterfaceAddrs {
                        name: ifa.interface_name.clone(),
                        is_up: ifa.flags.contains(InterfaceFlags::IFF_UP),
                        is_loopback: ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                        ..Default::default()
                    });
                    out.len() - 1
                }
            };
            let entry = &mut out[idx];

            let Some(address) = ifa.address else {
                continue;
            };
            if let Some(sin) = address.as_sockaddr_in() {
                entry.ipv4.push(*std::net::SocketAddrV4::from(*sin).ip());
            } else if let Some(link) = address.as_link_addr()
                && let Some(mac) = link.addr()
            {
                entry.mac = Some(mac);
            }
        }
        Ok(out)
    }
}

/// Picks the first up, non-loopback interface with a non-loopback IPv4 address.
///
/// Returns the empty `NetworkInfo` when no interface qualifies.
pub fn primary_interface(interfaces: &[InterfaceAddrs]) -> NetworkInfo {
    interfaces
        .iter()
        .filter(|iface| iface.is_up && !iface.is_loopback)
        .find_map(|iface| {
            iface
                .ipv4
                .iter()
                .find(|ip| !ip.is_loopback())
                .map(|ip| NetworkInfo {
                    ip_address: ip.to_string(),
                    mac_address: iface.mac.map(|m| format_mac(&m)).unwrap_or_default(),
                })
        })
        .unwrap_or_default()
}

/// Formats a hardware address as lowercase colon-separated hex.
pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str, up: bool, loopback: bool, ipv4: &[[u8; 4]]) -> InterfaceAddrs {
        InterfaceAddrs {
            name: name.into(),
            is_up: up,
            is_loopback: loopback,
            ipv4: ipv4.iter().map(|o| Ipv4Addr::from(*o)).collect(),
            mac: Some([0x02, 0x42, 0xac, 0x11, 0x00, name.len() as u8]),
        }
    }

    #[test]
    fn test_primary_interface_skips_loopback_and_down() {
        let list = vec![
            iface("lo", true, true, &[[127, 0, 0, 1]]),
            iface("eth0", false, false, &[[10, 0, 0, 9]]),
            iface("wlan0", true, false, &[[192, 168, 1, 20]]),
        ];
        let info = primary_interface(&list);
        assert_eq!(info.ip_address, "192.168.1.20");
        assert_eq!(info.mac_address, "02:42:ac:11:00:05");
    }

    #[test]
    fn test_primary_interface_first_match_wins() {
        let list = vec![
            iface("eth0", true, false, &[[10, 0, 0, 5]]),
            iface("eth1", true, false, &[[10, 0, 1, 5]]),
        ];
        assert_eq!(primary_interface(&list).ip_address, "10.0.0.5");
    }

    #[test]
    fn test_primary_interface_requires_ipv4() {
        // Up, non-loopback, but IPv6-only: keep looking.
        let list = vec![
            iface("eth0", true, false, &[]),
            iface("eth1", true, false, &[[172, 16, 0, 2]]),
        ];
        assert_eq!(primary_interface(&list).ip_address, "172.16.0.2");
    }

    #[test]
    fn test_primary_interface_skips_loopback_address_on_regular_iface() {
        let list = vec![iface("dummy0", true, false, &[[127, 0, 0, 2], [10, 1, 1, 1]])];
        assert_eq!(primary_interface(&list).ip_address, "10.1.1.1");
    }

    #[test]
    fn test_primary_interface_empty_when_none_qualifies() {
        let list = vec![
            iface("lo", true, true, &[[127, 0, 0, 1]]),
            iface("eth0", false, false, &[[10, 0, 0, 5]]),
            iface("tun0", true, false, &[]),
        ];
        assert!(primary_interface(&list).is_empty());
        assert!(primary_interface(&[]).is_empty());
    }

    #[test]
    fn test_primary_interface_without_mac() {
        let mut tun = iface("tun0", true, false, &[[10, 8, 0, 1]]);
        tun.mac = None;
        let info = primary_interface(&[tun]);
        assert_eq!(info.ip_address, "10.8.0.1");
        assert_eq!(info.mac_address, "");
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(
            format_mac(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]),
            "de:ad:be:ef:00:01"
        );
    }

    #[test]
    fn test_system_interfaces_lists_loopback() {
        let list = SystemInterfaces.interfaces().unwrap();
        assert!(list.iter().any(|i| i.is_loopback));
    }
}
