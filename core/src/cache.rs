use std::net::Ipv4Addr;
use std::sync::Arc;

use dashmap::DashMap;
use lure_common::AddressBinding;
use pnet::util::MacAddr;
use tracing::debug;

/// Per-session table of IPv4 to hardware address bindings.
///
/// Last write wins and entries never expire. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct AddressCache {
    entries: Arc<DashMap<Ipv4Addr, MacAddr>>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, ip: Ipv4Addr) -> Option<AddressBinding> {
        self.entries
            .get(&ip)
            .map(|mac| AddressBinding::new(ip, *mac))
    }

    pub fn record(&self, ip: Ipv4Addr, mac: MacAddr) {
        if let Some(previous) = self.entries.insert(ip, mac) {
            if previous != mac {
                debug!(%ip, old = %previous, new = %mac, "binding changed");
            }
        } else {
            debug!(%ip, %mac, "binding learned");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
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
