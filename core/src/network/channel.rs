//! Link-layer capture handles.
//!
//! A handle pairs a shared raw sender with a queue of received frames. The
//! queue is fed by a dedicated listener thread that blocks on the datalink
//! receiver, so async consumers never touch the socket directly.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, bail};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Upper bound on how long the listener thread blocks before it re-checks
/// whether the handle was closed.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

pub type SharedSender = Arc<Mutex<Box<dyn DataLinkSender>>>;

pub struct EthernetHandle {
    pub tx: SharedSender,
    pub rx: mpsc::UnboundedReceiver<Vec<u8>>,
    listener: ListenerGuard,
}

impl EthernetHandle {
    /// Wraps an already-open sender and frame queue, without a listener thread.
    pub fn from_parts(tx: Box<dyn DataLinkSender>, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(tx)),
            rx,
            listener: ListenerGuard { stop: None },
        }
    }

    /// Sets `stop` when the handle is closed, as a listener thread would see it.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.listener = ListenerGuard { stop: Some(stop) };
        self
    }

    pub fn into_parts(self) -> (SharedSender, mpsc::UnboundedReceiver<Vec<u8>>, ListenerGuard) {
        (self.tx, self.rx, self.listener)
    }

    pub fn close(self) {
        self.listener.close();
    }
}

/// Stops the listener thread of a handle when closed or dropped.
pub struct ListenerGuard {
    stop: Option<Arc<AtomicBool>>,
}

impl ListenerGuard {
    pub fn close(self) {}
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Relaxed);
            debug!("capture handle closed");
        }
    }
}

/// Sends one frame through a shared sender.
pub fn send_frame(tx: &SharedSender, frame: &[u8]) -> io::Result<()> {
    let mut sender = tx
        .lock()
        .map_err(|_| io::Error::other("sender lock poisoned"))?;
    match sender.send_to(frame, None) {
        Some(result) => result,
        None => Err(io::Error::other("sender unavailable")),
    }
}

/// Opens a capture handle on `intf` and starts its listener thread.
pub fn start_capture(intf: &NetworkInterface) -> anyhow::Result<EthernetHandle> {
    let (tx, rx) = open_eth_channel(intf, &get_config(), datalink::channel)?;
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));

    let flag = stop.clone();
    std::thread::Builder::new()
        .name(format!("lure-rx-{}", intf.name))
        .spawn(move || listen(rx, queue_tx, flag))
        .with_context(|| format!("spawning listener on {}", intf.name))?;

    debug!(interface = %intf.name, "capture handle opened");
    Ok(EthernetHandle {
        tx: Arc::new(Mutex::new(tx)),
        rx: queue_rx,
        listener: ListenerGuard { stop: Some(stop) },
    })
}

fn listen(
    mut rx: Box<dyn DataLinkReceiver>,
    queue: mpsc::UnboundedSender<Vec<u8>>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        match rx.next() {
            Ok(frame) => {
                if queue.send(frame.to_vec()).is_err() {
                    break;
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                warn!(error = %e, "capture read failed, stopping listener");
                break;
            }
        }
    }
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> anyhow::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let ch: Channel =
        channel_opener(intf, *cfg).with_context(|| format!("opening on {}", intf.name))?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}

fn get_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
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
    use crate::testing::{FakeSender, FrameLog};
    use pnet::datalink::dummy;

    #[test]
    fn open_eth_channel_should_succeed_on_ethernet_channel() {
        let dummy_intf: NetworkInterface = dummy::dummy_interface(0);
        let cfg = Config::default();
        let mock_opener_success =
            |i: &NetworkInterface, _cfg: Config| -> io::Result<Channel> {
                dummy::channel(i, dummy::Config::default())
            };
        let result = open_eth_channel(&dummy_intf, &cfg, mock_opener_success);
        assert!(result.is_ok());
    }

    #[test]
    fn open_eth_channel_should_fail_on_io_error() {
        let dummy_intf: NetworkInterface = dummy::dummy_interface(0);
        let cfg = Config::default();
        let mock_opener_fail = |_: &NetworkInterface, _: Config| -> io::Result<Channel> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "Mock I/O Error"))
        };

        let err = open_eth_channel(&dummy_intf, &cfg, mock_opener_fail)
            .err()
            .expect("opening should fail");
        assert!(err.to_string().contains("opening on eth0"));
        let cause = err
            .downcast_ref::<io::Error>()
            .expect("Error cause was not an std::io::Error");
        assert_eq!(cause.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn capture_config_bounds_blocking_reads() {
        assert_eq!(get_config().read_timeout, Some(READ_TIMEOUT));
    }

    #[test]
    fn send_frame_reaches_the_sender() {
        let log = FrameLog::default();
        let (inbound, rx) = mpsc::unbounded_channel();
        let handle = EthernetHandle::from_parts(Box::new(FakeSender::new(log.clone(), inbound)), rx);

        send_frame(&handle.tx, &[1, 2, 3]).unwrap();
        assert_eq!(log.frames(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn send_frame_surfaces_sender_errors() {
        let (inbound, rx) = mpsc::unbounded_channel();
        let sender = FakeSender::new(FrameLog::default(), inbound).failing();
        let handle = EthernetHandle::from_parts(Box::new(sender), rx);

        assert!(send_frame(&handle.tx, &[0u8; 60]).is_err());
    }

    #[test]
    fn closing_a_listener_raises_its_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let guard = ListenerGuard {
            stop: Some(stop.clone()),
        };
        guard.close();
        assert!(stop.load(Ordering::Relaxed));
    }
}
