pub mod devices;
pub mod serve;
pub mod spoof;

use clap::{Parser, Subcommand};
use lure_common::config::CliOverrides;

#[derive(Parser)]
#[command(name = "lure")]
#[command(version)]
#[command(about = "ARP poisoning sessions and DNS capture windows over HTTP.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path (defaults to ./lure.toml when present)
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// HTTP bind address
    #[arg(short = 'b', long, global = true)]
    pub bind: Option<String>,

    /// HTTP port
    #[arg(short = 'p', long, global = true)]
    pub port: Option<u16>,

    /// Default interface: name, description or one of its IPv4 addresses
    #[arg(short = 'i', long, global = true)]
    pub interface: Option<String>,

    /// Default targets (e.g. 192.168.1.10-20, 192.168.1.0/24, 192.168.1.*)
    #[arg(short = 't', long, global = true)]
    pub targets: Option<String>,

    /// Default host whose address is claimed
    #[arg(long, global = true)]
    pub host_ip: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Serve the HTTP API (default)
    #[command(alias = "s")]
    Serve,
    /// List capture-capable devices
    #[command(alias = "d")]
    Devices,
    /// Run one session with the configured defaults, then exit
    #[command(alias = "a")]
    Spoof,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind_address: self.bind.clone(),
            port: self.port,
            interface: self.interface.clone(),
            targets: self.targets.clone(),
            host_ip: self.host_ip.clone(),
            log_level: self.log_level.clone(),
        }
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
