use std::fmt;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;

/// An IPv4 to hardware address association.
///
/// Used both as the identity claimed by an ARP reply and as the
/// destination a frame is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressBinding {
    ip: Ipv4Addr,
    mac: MacAddr,
}

impl AddressBinding {
    pub const fn new(ip: Ipv4Addr, mac: MacAddr) -> Self {
        Self { ip, mac }
    }

    pub const fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub const fn mac(&self) -> MacAddr {
        self.mac
    }
}

impl fmt::Display for AddressBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ip, self.mac)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
