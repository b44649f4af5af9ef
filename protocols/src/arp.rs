use std::net::Ipv4Addr;

use anyhow::{Context, ensure};
use lure_common::AddressBinding;
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::util::MacAddr;

use crate::{ARP_LEN, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS, ethernet};

/// The fields of a received ARP frame that matter to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpFrame {
    pub operation: ArpOperation,
    pub eth_source: MacAddr,
    pub sender: AddressBinding,
    pub target: AddressBinding,
}

impl ArpFrame {
    pub fn is_reply(&self) -> bool {
        self.operation == ArpOperations::Reply
    }
}

/// Builds an ARP reply asserting `claim` to the host at `dst`, unicast.
///
/// `eth_src` is the link-layer source of the frame; it is the sending
/// interface's own address regardless of what `claim` says.
pub fn create_reply(
    eth_src: MacAddr,
    claim: AddressBinding,
    dst: AddressBinding,
) -> anyhow::Result<Vec<u8>> {
    create_packet(
        ArpOperations::Reply,
        eth_src,
        dst.mac(),
        claim,
        dst,
    )
}

/// Builds a broadcast ARP request asking who has `target_ip`.
pub fn create_request(src: AddressBinding, target_ip: Ipv4Addr) -> anyhow::Result<Vec<u8>> {
    create_packet(
        ArpOperations::Request,
        src.mac(),
        MacAddr::broadcast(),
        src,
        AddressBinding::new(target_ip, MacAddr::zero()),
    )
}

fn create_packet(
    operation: ArpOperation,
    eth_src: MacAddr,
    eth_dst: MacAddr,
    sender: AddressBinding,
    target: AddressBinding,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
    ethernet::make_header(&mut buffer, eth_src, eth_dst, EtherTypes::Arp)?;
    let mut arp_packet = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .context("failed to create mutable ARP packet")?;
    arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp_packet.set_protocol_type(EtherTypes::Ipv4);
    arp_packet.set_hw_addr_len(6);
    arp_packet.set_proto_addr_len(4);
    arp_packet.set_operation(operation);
    arp_packet.set_sender_hw_addr(sender.mac());
    arp_packet.set_sender_proto_addr(sender.ip());
    arp_packet.set_target_hw_addr(target.mac());
    arp_packet.set_target_proto_addr(target.ip());
    Ok(Vec::from(buffer))
}

/// Parses a raw Ethernet frame carrying ARP.
pub fn read_frame(bytes: &[u8]) -> anyhow::Result<ArpFrame> {
    let ethernet_packet: EthernetPacket = ethernet::get_packet_from_u8(bytes)?;
    ensure!(
        ethernet_packet.get_ethertype() == EtherTypes::Arp,
        "not an ARP frame (ethertype {:?})",
        ethernet_packet.get_ethertype()
    );
    let arp_packet = ArpPacket::new(ethernet_packet.payload()).with_context(|| {
        format!(
            "truncated or invalid ARP packet (payload len {})",
            ethernet_packet.payload().len()
        )
    })?;
    ensure!(
        arp_packet.get_hw_addr_len() == 6 && arp_packet.get_proto_addr_len() == 4,
        "not an Ethernet/IPv4 ARP packet"
    );

    Ok(ArpFrame {
        operation: arp_packet.get_operation(),
        eth_source: ethernet_packet.get_source(),
        sender: AddressBinding::new(
            arp_packet.get_sender_proto_addr(),
            arp_packet.get_sender_hw_addr(),
        ),
        target: AddressBinding::new(
            arp_packet.get_target_proto_addr(),
            arp_packet.get_target_hw_addr(),
        ),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
