use lure_common::network::interface::find_interface;
use pnet::datalink::{self, NetworkInterface};

use crate::error::SpoofError;
use crate::network::channel::{self, EthernetHandle};

/// A capture-capable device as presented to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub description: String,
}

/// Access to the machine's network devices.
///
/// Sessions and capture windows only reach the wire through this trait.
pub trait LinkProvider: Send + Sync {
    fn interfaces(&self) -> Vec<NetworkInterface>;

    fn open(&self, interface: &NetworkInterface) -> Result<EthernetHandle, SpoofError>;

    /// Resolves a human-readable selector (name, description or owned
    /// IPv4 address) to an interface.
    fn interface(&self, selector: &str) -> Result<NetworkInterface, SpoofError> {
        find_interface(&self.interfaces(), selector)
            .ok_or_else(|| SpoofError::InterfaceNotFound(selector.to_string()))
    }

    fn devices(&self) -> Vec<Device> {
        self.interfaces()
            .into_iter()
            .map(|intf| Device {
                name: intf.name,
                description: intf.description,
            })
            .collect()
    }
}

/// The host's real interfaces, opened through `pnet` datalink channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLinks;

impl LinkProvider for SystemLinks {
    fn interfaces(&self) -> Vec<NetworkInterface> {
        datalink::interfaces()
    }

    fn open(&self, interface: &NetworkInterface) -> Result<EthernetHandle, SpoofError> {
        channel::start_capture(interface).map_err(|e| SpoofError::CaptureOpen {
            device: interface.name.clone(),
            reason: format!("{e:#}"),
        })
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
