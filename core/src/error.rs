use std::net::Ipv4Addr;

use lure_common::TargetError;
use lure_common::network::interface::ViabilityError;
use thiserror::Error;

/// Broad classes of [`SpoofError`], used to decide whether a failure is
/// fatal and how it is surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid input or an unusable environment. Fatal to start.
    Configuration,
    /// The capture handle could not be opened. Fatal to the operation.
    Resource,
    /// No hardware address for a target. Soft, per target.
    Resolution,
    /// A frame could not be sent. Soft, logged.
    Transmission,
}

#[derive(Debug, Error)]
pub enum SpoofError {
    #[error("interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("interface '{name}' cannot be used: {reason}")]
    InterfaceUnusable { name: String, reason: ViabilityError },

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("could not resolve the hardware address of host {0}")]
    HostUnresolved(Ipv4Addr),

    #[error("failed to open capture handle on '{device}': {reason}")]
    CaptureOpen { device: String, reason: String },

    #[error("no hardware address known for {0}")]
    Unresolved(Ipv4Addr),

    #[error("failed to transmit frame to {dst}: {reason}")]
    Transmission { dst: Ipv4Addr, reason: String },
}

impl SpoofError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpoofError::InterfaceNotFound(_)
            | SpoofError::InterfaceUnusable { .. }
            | SpoofError::Target(_)
            | SpoofError::ZeroInterval(_)
            | SpoofError::HostUnresolved(_) => ErrorKind::Configuration,
            SpoofError::CaptureOpen { .. } => ErrorKind::Resource,
            SpoofError::Unresolved(_) => ErrorKind::Resolution,
            SpoofError::Transmission { .. } => ErrorKind::Transmission,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_errors_are_configuration_errors() {
        let err: SpoofError = TargetError::NoTargetsProvided.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "no targets provided");
    }

    #[test]
    fn capture_open_is_a_resource_error() {
        let err = SpoofError::CaptureOpen {
            device: "eth9".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.to_string().contains("eth9"));
    }

    #[test]
    fn soft_failures_are_classified() {
        let ip = Ipv4Addr::new(10, 0, 0, 9);
        assert_eq!(SpoofError::Unresolved(ip).kind(), ErrorKind::Resolution);
        let err = SpoofError::Transmission {
            dst: ip,
            reason: "link down".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Transmission);
    }

    #[test]
    fn unusable_interface_names_the_reason() {
        let err = SpoofError::InterfaceUnusable {
            name: "lo".to_string(),
            reason: ViabilityError::IsLoopback,
        };
        assert_eq!(
            err.to_string(),
            "interface 'lo' cannot be used: interface is a loopback device"
        );
    }
}
