use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use pnet::util::MacAddr;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// Loopback devices cannot reach other hosts.
    IsLoopback,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface is a point-to-point link (e.g., a VPN), ARP does not apply.
    IsPointToPoint,
    /// The interface has no IPv4 address to send ARP probes from.
    NoIpv4Address,
}

impl std::fmt::Display for ViabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            ViabilityError::IsDown => "interface is down",
            ViabilityError::IsLoopback => "interface is a loopback device",
            ViabilityError::NoMacAddress => "interface has no hardware address",
            ViabilityError::IsPointToPoint => "interface is a point-to-point link",
            ViabilityError::NoIpv4Address => "interface has no IPv4 address",
        };
        f.write_str(reason)
    }
}

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn get_ipv4_addr(&self) -> Option<Ipv4Addr>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    fn get_ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.get_ipv4_nets()
            .into_iter()
            .map(|net| net.ip())
            .find(|ip| !ip.is_loopback())
    }
}

/// Finds an interface by a human-readable selector.
///
/// The selector is matched against, in order: the system name, the
/// description (friendly names on Windows, where device names look like
/// `\Device\NPF_{...}`), and finally an IPv4 address owned by the interface.
pub fn find_interface(interfaces: &[NetworkInterface], selector: &str) -> Option<NetworkInterface> {
    let selector = selector.trim();

    if let Some(intf) = interfaces.iter().find(|i| i.name == selector) {
        return Some(intf.clone());
    }

    if let Some(intf) = interfaces
        .iter()
        .find(|i| !i.description.is_empty() && i.description.eq_ignore_ascii_case(selector))
    {
        return Some(intf.clone());
    }

    let addr = selector.parse::<Ipv4Addr>().ok()?;
    interfaces
        .iter()
        .find(|i| i.get_ipv4_nets().iter().any(|net| net.ip() == addr))
        .cloned()
}

/// Checks that an interface can carry ARP traffic for a session and returns
/// the operator's own binding on it.
pub fn spoofing_identity(interface: &NetworkInterface) -> Result<(Ipv4Addr, MacAddr), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    let mac = match interface.mac {
        Some(mac) if mac != MacAddr::zero() => mac,
        _ => return Err(ViabilityError::NoMacAddress),
    };
    let ip = interface.get_ipv4_addr().ok_or(ViabilityError::NoIpv4Address)?;

    Ok((ip, mac))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
