//! # DNS Capture Window
//!
//! A one-shot, fixed-duration passive listen on a device. Every DNS
//! response carrying at least one answer becomes a [`DnsExchange`]; the
//! window closes its handle when the deadline fires and hands back a single
//! [`CaptureWindowResult`].

use std::time::Duration;

use lure_common::config::CaptureDefaults;
pub use lure_protocols::dns::DnsExchange;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::error::SpoofError;
use crate::network::link::LinkProvider;

pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureWindow {
    pub device: String,
    pub duration: Duration,
    /// Maximum number of exchanges kept; later ones are dropped.
    pub capacity: usize,
}

impl CaptureWindow {
    pub fn new(device: impl Into<String>, duration: Duration) -> Self {
        Self {
            device: device.into(),
            duration,
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn from_defaults(device: impl Into<String>, defaults: &CaptureDefaults) -> Self {
        Self {
            device: device.into(),
            duration: Duration::from_secs(defaults.duration_sec),
            capacity: defaults.max_exchanges,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureWindowResult {
    pub exchanges: Vec<DnsExchange>,
    /// Set when exchanges were dropped because the window was full.
    pub truncated: bool,
}

impl CaptureWindowResult {
    fn push(&mut self, exchange: DnsExchange, capacity: usize) {
        if self.exchanges.len() < capacity {
            self.exchanges.push(exchange);
            return;
        }
        if !self.truncated {
            warn!(capacity, "capture window full, dropping further exchanges");
            self.truncated = true;
        }
    }
}

/// Runs one capture window.
///
/// An unknown device or a handle that cannot be opened is reported before
/// any waiting happens.
pub async fn capture_dns(
    window: &CaptureWindow,
    links: &dyn LinkProvider,
) -> Result<CaptureWindowResult, SpoofError> {
    let interface = links
        .interface(&window.device)
        .map_err(|_| SpoofError::CaptureOpen {
            device: window.device.clone(),
            reason: "no such device".to_string(),
        })?;
    let (_tx, rx, listener) = links.open(&interface)?.into_parts();
    info!(device = %interface.name, duration = ?window.duration, "capture window open");

    let result = collect(rx, window.duration, window.capacity).await;

    listener.close();
    info!(
        exchanges = result.exchanges.len(),
        truncated = result.truncated,
        "capture window closed"
    );
    Ok(result)
}

async fn collect(
    mut rx: UnboundedReceiver<Vec<u8>>,
    duration: Duration,
    capacity: usize,
) -> CaptureWindowResult {
    let mut result = CaptureWindowResult::default();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => break,
            frame = rx.recv() => match frame {
                Some(bytes) => {
                    if let Some(exchange) = lure_protocols::dns::read_exchange(&bytes) {
                        debug!(src = %exchange.source_ip, name = %exchange.queried_name, "dns answer");
                        result.push(exchange, capacity);
                    }
                }
                None => {
                    debug!("capture stream ended before the deadline");
                    break;
                }
            },
        }
    }
    result
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
    use crate::error::ErrorKind;
    use crate::testing::FakeLinks;
    use lure_protocols::fixtures;
    use std::net::Ipv4Addr;
    use tokio::sync::mpsc;

    const RESOLVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);

    fn window(secs: u64) -> CaptureWindow {
        CaptureWindow::new("eth0", Duration::from_secs(secs))
    }

    #[tokio::test(start_paused = true)]
    async fn collects_answers_and_skips_other_traffic() {
        let links = FakeLinks::lan().with_frames(vec![
            fixtures::dns_response_frame(RESOLVER, "example.com"),
            fixtures::non_ip_frame(),
        ]);

        let result = capture_dns(&window(10), &links).await.unwrap();

        assert_eq!(
            result.exchanges,
            vec![DnsExchange {
                source_ip: RESOLVER,
                queried_name: "example.com".to_string(),
            }]
        );
        assert!(!result.truncated);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_stream_yields_empty_result() {
        let result = capture_dns(&window(3), &FakeLinks::lan()).await.unwrap();
        assert_eq!(result, CaptureWindowResult::default());
    }

    #[tokio::test(start_paused = true)]
    async fn window_lasts_its_full_duration() {
        let start = tokio::time::Instant::now();
        capture_dns(&window(7), &FakeLinks::lan()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn open_failure_is_reported_immediately() {
        let err = capture_dns(&window(10), &FakeLinks::lan().failing_open())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
    }

    #[tokio::test]
    async fn unknown_device_is_a_resource_error() {
        let mut w = window(10);
        w.device = "nope0".to_string();
        let err = capture_dns(&w, &FakeLinks::lan()).await.unwrap_err();
        assert!(matches!(err, SpoofError::CaptureOpen { ref device, .. } if device == "nope0"));
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_keeps_earliest_and_marks_truncation() {
        let (tx, rx) = mpsc::unbounded_channel();
        for name in ["a.test", "b.test", "c.test", "d.test"] {
            tx.send(fixtures::dns_response_frame(RESOLVER, name)).unwrap();
        }

        let result = collect(rx, Duration::from_secs(1), 2).await;

        let names: Vec<&str> = result
            .exchanges
            .iter()
            .map(|e| e.queried_name.as_str())
            .collect();
        assert_eq!(names, vec!["a.test", "b.test"]);
        assert!(result.truncated);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicates_are_kept_in_arrival_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(fixtures::dns_response_frame(RESOLVER, "x.test")).unwrap();
        tx.send(fixtures::dns_response_frame(RESOLVER, "x.test")).unwrap();

        let result = collect(rx, Duration::from_secs(1), DEFAULT_CAPACITY).await;
        assert_eq!(result.exchanges.len(), 2);
        drop(tx);
    }
}
