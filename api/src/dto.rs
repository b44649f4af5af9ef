use std::time::Duration;

use lure_common::config::Config;
use lure_core::capture::{CaptureWindow, DnsExchange};
use lure_core::network::link::Device;
use lure_core::session::SessionConfig;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceDto {
    pub name: String,
    pub description: String,
}

impl From<Device> for DeviceDto {
    fn from(device: Device) -> Self {
        Self {
            name: device.name,
            description: device.description,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DnsQueryDto {
    #[serde(rename = "SrcIP")]
    pub src_ip: String,
    #[serde(rename = "DNSAnswer")]
    pub dns_answer: String,
}

impl From<&DnsExchange> for DnsQueryDto {
    fn from(exchange: &DnsExchange) -> Self {
        Self {
            src_ip: exchange.source_ip.to_string(),
            dns_answer: exchange.queried_name.clone(),
        }
    }
}

/// Query parameters of `/arpSpoof`; anything missing falls back to the
/// configured defaults.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpoofQuery {
    pub interface: Option<String>,
    pub targets: Option<String>,
    #[serde(rename = "hostIP")]
    pub host_ip: Option<String>,
    pub injection_interval_ms: Option<u64>,
    pub session_duration_sec: Option<u64>,
    pub capture_device: Option<String>,
    pub capture_duration_sec: Option<u64>,
}

impl SpoofQuery {
    pub fn session_config(&self, config: &Config) -> SessionConfig {
        let mut session = SessionConfig::from(&config.session);
        if let Some(interface) = &self.interface {
            session.interface = interface.clone();
        }
        if let Some(targets) = &self.targets {
            session.targets = targets.clone();
        }
        if let Some(host_ip) = &self.host_ip {
            session.host_ip = host_ip.clone();
        }
        if let Some(ms) = self.injection_interval_ms {
            session.injection_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.session_duration_sec {
            session.session_duration = Duration::from_secs(secs);
        }
        session
    }

    /// The capture device is the explicit one if given, else the configured
    /// one, else the session's interface.
    pub fn capture_window(&self, config: &Config) -> CaptureWindow {
        let device = self
            .capture_device
            .clone()
            .or_else(|| config.capture.device.clone())
            .or_else(|| self.interface.clone())
            .unwrap_or_else(|| config.session.interface.clone());
        let mut window = CaptureWindow::from_defaults(device, &config.capture);
        if let Some(secs) = self.capture_duration_sec {
            window.duration = Duration::from_secs(secs);
        }
        window
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
