//! A simulated link for exercising sessions and capture windows without
//! raw sockets.
//!
//! [`FakeLinks`] hands out handles whose sender records every frame into a
//! shared [`FrameLog`] and answers ARP requests on behalf of the hosts of a
//! simulated LAN, feeding the replies back into the handle's frame queue.

use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use lure_common::AddressBinding;
use lure_protocols::arp::{self, ArpFrame};
use pnet::datalink::{DataLinkSender, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use pnet::packet::arp::ArpOperations;
use pnet::util::MacAddr;
use tokio::sync::mpsc;

use crate::error::SpoofError;
use crate::network::channel::EthernetHandle;
use crate::network::link::LinkProvider;

pub const OPERATOR_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 42);
pub const OPERATOR_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x42);
pub const HOST_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const HOST_MAC: MacAddr = MacAddr(0x10, 0x20, 0x30, 0x40, 0x50, 0x01);

const IFF_UP: u32 = 1;
const IFF_BROADCAST: u32 = 1 << 1;
const IFF_RUNNING: u32 = 1 << 6;
const IFF_MULTICAST: u32 = 1 << 12;

/// An up, broadcast-capable Ethernet interface owning `ip/24`.
pub fn lan_interface(name: &str, ip: Ipv4Addr, mac: MacAddr) -> NetworkInterface {
    let net = Ipv4Network::new(ip, 24).expect("valid prefix");
    NetworkInterface {
        name: name.to_string(),
        description: String::new(),
        index: 2,
        mac: Some(mac),
        ips: vec![IpNetwork::V4(net)],
        flags: IFF_UP | IFF_BROADCAST | IFF_RUNNING | IFF_MULTICAST,
    }
}

/// The MAC a simulated target answers with: `02:00:00:00:00:<last octet>`.
pub fn target_mac(ip: Ipv4Addr) -> MacAddr {
    MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, ip.octets()[3])
}

/// Every frame sent through fake handles, in transmission order.
#[derive(Debug, Clone, Default)]
pub struct FrameLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl FrameLog {
    pub fn push(&self, frame: &[u8]) {
        self.0.lock().expect("frame log").push(frame.to_vec());
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.0.lock().expect("frame log").clone()
    }

    pub fn arp_frames(&self) -> Vec<ArpFrame> {
        self.frames()
            .iter()
            .filter_map(|f| arp::read_frame(f).ok())
            .collect()
    }

    pub fn arp_replies(&self) -> Vec<ArpFrame> {
        self.arp_frames().into_iter().filter(|f| f.is_reply()).collect()
    }

    pub fn arp_requests(&self) -> Vec<ArpFrame> {
        self.arp_frames().into_iter().filter(|f| !f.is_reply()).collect()
    }
}

pub struct FakeSender {
    log: FrameLog,
    lan: Arc<HashMap<Ipv4Addr, MacAddr>>,
    inbound: mpsc::UnboundedSender<Vec<u8>>,
    fail: bool,
}

impl FakeSender {
    pub fn new(log: FrameLog, inbound: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            log,
            lan: Arc::new(HashMap::new()),
            inbound,
            fail: false,
        }
    }

    pub fn with_lan(mut self, lan: Arc<HashMap<Ipv4Addr, MacAddr>>) -> Self {
        self.lan = lan;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn answer_probe(&self, frame: &[u8]) {
        let Ok(request) = arp::read_frame(frame) else {
            return;
        };
        if request.operation != ArpOperations::Request {
            return;
        }
        if let Some(mac) = self.lan.get(&request.target.ip()) {
            let owner = AddressBinding::new(request.target.ip(), *mac);
            if let Ok(reply) = arp::create_reply(*mac, owner, request.sender) {
                let _ = self.inbound.send(reply);
            }
        }
    }
}

impl DataLinkSender for FakeSender {
    fn build_and_send(
        &mut self,
        num_packets: usize,
        packet_size: usize,
        func: &mut dyn for<'a> FnMut(&'a mut [u8]),
    ) -> Option<io::Result<()>> {
        for _ in 0..num_packets {
            let mut buffer = vec![0u8; packet_size];
            func(&mut buffer);
            if let Some(Err(e)) = self.send_to(&buffer, None) {
                return Some(Err(e));
            }
        }
        Some(Ok(()))
    }

    fn send_to(&mut self, packet: &[u8], _dst: Option<NetworkInterface>) -> Option<io::Result<()>> {
        if self.fail {
            return Some(Err(io::Error::new(io::ErrorKind::NetworkDown, "fake link is down")));
        }
        self.log.push(packet);
        self.answer_probe(packet);
        Some(Ok(()))
    }
}

/// A [`LinkProvider`] over a single simulated interface.
pub struct FakeLinks {
    interfaces: Vec<NetworkInterface>,
    lan: Arc<HashMap<Ipv4Addr, MacAddr>>,
    log: FrameLog,
    preload: Vec<Vec<u8>>,
    queues: Arc<Mutex<Vec<mpsc::UnboundedSender<Vec<u8>>>>>,
    stops: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
    fail_open: bool,
    fail_send: bool,
}

impl FakeLinks {
    pub fn new(interface: NetworkInterface) -> Self {
        Self {
            interfaces: vec![interface],
            lan: Arc::new(HashMap::new()),
            log: FrameLog::default(),
            preload: Vec::new(),
            queues: Arc::default(),
            stops: Arc::default(),
            fail_open: false,
            fail_send: false,
        }
    }

    /// The default test LAN: the operator on `eth0`, with the host answering.
    pub fn lan() -> Self {
        Self::new(lan_interface("eth0", OPERATOR_IP, OPERATOR_MAC)).with_host(HOST_IP, HOST_MAC)
    }

    /// A host that answers ARP requests for `ip`.
    pub fn with_host(mut self, ip: Ipv4Addr, mac: MacAddr) -> Self {
        Arc::make_mut(&mut self.lan).insert(ip, mac);
        self
    }

    /// Hosts answering with [`target_mac`] for every address in `ips`.
    pub fn with_targets(mut self, ips: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        for ip in ips {
            self = self.with_host(ip, target_mac(ip));
        }
        self
    }

    /// Frames queued on every handle as soon as it is opened.
    pub fn with_frames(mut self, frames: Vec<Vec<u8>>) -> Self {
        self.preload = frames;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn log(&self) -> FrameLog {
        self.log.clone()
    }

    /// Handles whose frame queue still has a reader.
    pub fn open_queues(&self) -> usize {
        self.queues
            .lock()
            .expect("queue list")
            .iter()
            .filter(|q| !q.is_closed())
            .count()
    }

    /// Handles that were opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.stops
            .lock()
            .expect("handle list")
            .iter()
            .filter(|stop| !stop.load(Ordering::Relaxed))
            .count()
    }
}

impl LinkProvider for FakeLinks {
    fn interfaces(&self) -> Vec<NetworkInterface> {
        self.interfaces.clone()
    }

    fn open(&self, interface: &NetworkInterface) -> Result<EthernetHandle, SpoofError> {
        if self.fail_open {
            return Err(SpoofError::CaptureOpen {
                device: interface.name.clone(),
                reason: "permission denied".to_string(),
            });
        }
        let (inbound, rx) = mpsc::unbounded_channel();
        for frame in &self.preload {
            let _ = inbound.send(frame.clone());
        }
        self.queues.lock().expect("queue list").push(inbound.clone());
        let mut sender = FakeSender::new(self.log.clone(), inbound).with_lan(self.lan.clone());
        if self.fail_send {
            sender = sender.failing();
        }
        let stop = Arc::new(AtomicBool::new(false));
        self.stops.lock().expect("handle list").push(stop.clone());
        Ok(EthernetHandle::from_parts(Box::new(sender), rx).with_stop_flag(stop))
    }
}
