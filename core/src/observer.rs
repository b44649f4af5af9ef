//! Passive reader of the session's capture handle.
//!
//! Replies from hosts the session cares about feed the [`AddressCache`];
//! claims for the host IP by a third party are reported as interference.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, OnceLock};

use lure_common::TargetSet;
use lure_protocols::arp::{self, ArpFrame};
use pnet::packet::arp::ArpOperations;
use pnet::util::MacAddr;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::AddressCache;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverReport {
    pub frames: u64,
    pub arp_frames: u64,
    pub recorded: u64,
    pub interference: u64,
}

pub struct Observer {
    rx: UnboundedReceiver<Vec<u8>>,
    cache: AddressCache,
    own_mac: MacAddr,
    host_ip: Ipv4Addr,
    host_mac: Arc<OnceLock<MacAddr>>,
    targets: HashSet<Ipv4Addr>,
    report: ObserverReport,
}

impl Observer {
    pub fn new(
        rx: UnboundedReceiver<Vec<u8>>,
        cache: AddressCache,
        own_mac: MacAddr,
        host_ip: Ipv4Addr,
        host_mac: Arc<OnceLock<MacAddr>>,
        targets: TargetSet,
    ) -> Self {
        Self {
            rx,
            cache,
            own_mac,
            host_ip,
            host_mac,
            targets: targets.iter().copied().collect(),
            report: ObserverReport::default(),
        }
    }

    pub fn report(&self) -> ObserverReport {
        self.report
    }

    /// Reads frames until `token` is cancelled or the stream ends.
    ///
    /// Cancellation is checked before every read and wins over a ready
    /// frame, so a busy link cannot keep the observer alive.
    pub async fn run(mut self, token: CancellationToken) -> Self {
        loop {
            if token.is_cancelled() {
                break;
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                frame = self.rx.recv() => match frame {
                    Some(bytes) => self.process(&bytes),
                    None => {
                        debug!("capture stream ended");
                        break;
                    }
                },
            }
        }

        info!(
            frames = self.report.frames,
            arp = self.report.arp_frames,
            recorded = self.report.recorded,
            interference = self.report.interference,
            "observer stopped"
        );
        self
    }

    fn process(&mut self, bytes: &[u8]) {
        self.report.frames += 1;
        let Ok(frame) = arp::read_frame(bytes) else {
            return;
        };
        self.report.arp_frames += 1;
        debug!(
            op = operation_name(&frame),
            sender = %frame.sender,
            target = %frame.target,
            "arp"
        );

        if !frame.is_reply() || self.is_own(&frame) || !self.is_relevant(frame.sender.ip()) {
            return;
        }

        let claimed = frame.sender.mac();
        if frame.sender.ip() == self.host_ip {
            if let Some(real) = self.host_mac.get() {
                if claimed != *real {
                    self.report.interference += 1;
                    warn!(host_ip = %self.host_ip, claimed = %claimed, real = %real, "interference: third party claims host address");
                }
            }
        }

        self.cache.record(frame.sender.ip(), claimed);
        self.report.recorded += 1;
    }

    fn is_own(&self, frame: &ArpFrame) -> bool {
        frame.sender.mac() == self.own_mac || frame.eth_source == self.own_mac
    }

    fn is_relevant(&self, ip: Ipv4Addr) -> bool {
        ip == self.host_ip || self.targets.contains(&ip)
    }
}

fn operation_name(frame: &ArpFrame) -> &'static str {
    match frame.operation {
        ArpOperations::Request => "request",
        ArpOperations::Reply => "reply",
        _ => "other",
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
