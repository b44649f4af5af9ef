//! Hardware address resolution for a session.
//!
//! Lookups go through the session's [`AddressCache`]. A miss triggers an
//! active probe: a broadcast ARP request sent from the operator's own
//! binding, whose answer the observer later records into the cache.

use std::net::Ipv4Addr;
use std::time::Duration;

use lure_common::AddressBinding;
use lure_protocols::arp;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::cache::AddressCache;
use crate::error::SpoofError;
use crate::network::channel::{self, SharedSender};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const PROBE_RETRY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct Resolver {
    tx: SharedSender,
    own: AddressBinding,
    cache: AddressCache,
}

impl Resolver {
    pub fn new(tx: SharedSender, own: AddressBinding, cache: AddressCache) -> Self {
        Self { tx, own, cache }
    }

    /// Broadcasts an ARP request for `ip`.
    pub fn probe(&self, ip: Ipv4Addr) -> Result<(), SpoofError> {
        let frame = arp::create_request(self.own, ip).map_err(|e| SpoofError::Transmission {
            dst: ip,
            reason: format!("{e:#}"),
        })?;
        channel::send_frame(&self.tx, &frame).map_err(|e| SpoofError::Transmission {
            dst: ip,
            reason: e.to_string(),
        })
    }

    /// Returns the cached binding of `ip`, probing on a miss.
    ///
    /// A miss is reported as [`SpoofError::Unresolved`] even when the probe
    /// went out; the answer becomes visible on a later lookup.
    pub fn resolve(&self, ip: Ipv4Addr) -> Result<AddressBinding, SpoofError> {
        if let Some(binding) = self.cache.lookup(ip) {
            return Ok(binding);
        }
        if let Err(e) = self.probe(ip) {
            warn!(target_ip = %ip, error = %e, "probe failed");
        }
        Err(SpoofError::Unresolved(ip))
    }

    /// Probes `ip` until its binding shows up in the cache or `timeout`
    /// elapses.
    pub async fn resolve_within(
        &self,
        ip: Ipv4Addr,
        timeout: Duration,
    ) -> Result<AddressBinding, SpoofError> {
        let deadline = Instant::now() + timeout;
        let mut next_probe = Instant::now();
        let mut poll = time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if let Some(binding) = self.cache.lookup(ip) {
                debug!(%binding, "resolved");
                return Ok(binding);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SpoofError::HostUnresolved(ip));
            }
            if now >= next_probe {
                if let Err(e) = self.probe(ip) {
                    warn!(target_ip = %ip, error = %e, "probe failed");
                }
                next_probe = now + PROBE_RETRY;
            }
            poll.tick().await;
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
    use crate::testing::{FakeSender, FrameLog, HOST_IP, HOST_MAC, OPERATOR_IP, OPERATOR_MAC};
    use lure_protocols::arp::ArpFrame;
    use pnet::packet::arp::ArpOperations;
    use pnet::util::MacAddr;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    fn resolver(log: FrameLog, cache: AddressCache) -> (Resolver, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (inbound, rx) = mpsc::unbounded_channel();
        let tx: SharedSender = Arc::new(Mutex::new(Box::new(FakeSender::new(log, inbound))));
        let own = AddressBinding::new(OPERATOR_IP, OPERATOR_MAC);
        (Resolver::new(tx, own, cache), rx)
    }

    #[test]
    fn resolve_hits_cache_without_probing() {
        let log = FrameLog::default();
        let cache = AddressCache::new();
        cache.record(HOST_IP, HOST_MAC);
        let (resolver, _rx) = resolver(log.clone(), cache);

        assert_eq!(resolver.resolve(HOST_IP).unwrap(), AddressBinding::new(HOST_IP, HOST_MAC));
        assert!(log.frames().is_empty());
    }

    #[test]
    fn resolve_miss_sends_broadcast_probe_from_own_binding() {
        let log = FrameLog::default();
        let (resolver, _rx) = resolver(log.clone(), AddressCache::new());

        let err = resolver.resolve(HOST_IP).unwrap_err();
        assert!(matches!(err, SpoofError::Unresolved(ip) if ip == HOST_IP));

        let probes: Vec<ArpFrame> = log.arp_requests();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].operation, ArpOperations::Request);
        assert_eq!(probes[0].sender, AddressBinding::new(OPERATOR_IP, OPERATOR_MAC));
        assert_eq!(probes[0].target.ip(), HOST_IP);
        assert_eq!(probes[0].target.mac(), MacAddr::zero());
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_within_waits_for_the_cache() {
        let cache = AddressCache::new();
        let (resolver, _rx) = resolver(FrameLog::default(), cache.clone());

        let writer = cache.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(300)).await;
            writer.record(HOST_IP, HOST_MAC);
        });

        let binding = resolver
            .resolve_within(HOST_IP, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(binding.mac(), HOST_MAC);
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_within_gives_up_and_retries_probes() {
        let log = FrameLog::default();
        let (resolver, _rx) = resolver(log.clone(), AddressCache::new());

        let err = resolver
            .resolve_within(HOST_IP, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, SpoofError::HostUnresolved(ip) if ip == HOST_IP));
        assert_eq!(log.arp_requests().len(), 4);
    }
}
