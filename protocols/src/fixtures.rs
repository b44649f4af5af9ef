//! Frame builders for tests that need realistic traffic on a fake link.

use std::net::Ipv4Addr;

use lure_common::AddressBinding;
use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::MutableIpv4Packet;
use pnet::packet::tcp::MutableTcpPacket;
use pnet::packet::udp::MutableUdpPacket;
use pnet::util::MacAddr;

use crate::dns::{DNS_HDR_LEN, encode_dns_name};
use crate::{ETH_HDR_LEN, arp, ethernet};

const IPV4_HDR_LEN: usize = 20;
const UDP_HDR_LEN: usize = 8;
const TCP_HDR_LEN: usize = 20;

pub const RESOLVER_MAC: MacAddr = MacAddr(0x02, 0x53, 0x53, 0x53, 0x53, 0x53);
pub const CLIENT_MAC: MacAddr = MacAddr(0x02, 0x77, 0x77, 0x77, 0x77, 0x77);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

/// A DNS message with one question for `name` and `answers` A records.
pub fn dns_message(name: &str, answers: u16) -> Vec<u8> {
    let flags: u16 = if answers > 0 { 0x8180 } else { 0x0100 };
    let mut msg = Vec::with_capacity(DNS_HDR_LEN + name.len() + 2 + answers as usize * 16);
    msg.extend_from_slice(&0x1234u16.to_be_bytes());
    msg.extend_from_slice(&flags.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes());
    msg.extend_from_slice(&answers.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());

    msg.extend_from_slice(&encode_dns_name(name));
    msg.extend_from_slice(&1u16.to_be_bytes()); // A
    msg.extend_from_slice(&1u16.to_be_bytes()); // IN

    for _ in 0..answers {
        msg.extend_from_slice(&[0xC0, 0x0C]);
        msg.extend_from_slice(&1u16.to_be_bytes());
        msg.extend_from_slice(&1u16.to_be_bytes());
        msg.extend_from_slice(&60u32.to_be_bytes());
        msg.extend_from_slice(&4u16.to_be_bytes());
        msg.extend_from_slice(&[93, 184, 216, 34]);
    }
    msg
}

/// An Ethernet/IPv4 frame carrying `payload` over UDP or TCP.
pub fn ipv4_frame(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    transport: Transport,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let l4_len = match transport {
        Transport::Udp => UDP_HDR_LEN,
        Transport::Tcp => TCP_HDR_LEN,
    } + payload.len();
    let mut buffer = vec![0u8; ETH_HDR_LEN + IPV4_HDR_LEN + l4_len];

    ethernet::make_header(&mut buffer, RESOLVER_MAC, CLIENT_MAC, EtherTypes::Ipv4)
        .expect("ethernet header");

    {
        let mut ip = MutableIpv4Packet::new(&mut buffer[ETH_HDR_LEN..]).expect("ipv4 packet");
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length((IPV4_HDR_LEN + l4_len) as u16);
        ip.set_ttl(64);
        ip.set_next_level_protocol(match transport {
            Transport::Udp => IpNextHeaderProtocols::Udp,
            Transport::Tcp => IpNextHeaderProtocols::Tcp,
        });
        ip.set_source(src);
        ip.set_destination(dst);
    }

    let l4 = &mut buffer[ETH_HDR_LEN + IPV4_HDR_LEN..];
    match transport {
        Transport::Udp => {
            let mut udp = MutableUdpPacket::new(l4).expect("udp packet");
            udp.set_source(src_port);
            udp.set_destination(dst_port);
            udp.set_length(l4_len as u16);
            udp.set_payload(payload);
        }
        Transport::Tcp => {
            let mut tcp = MutableTcpPacket::new(l4).expect("tcp packet");
            tcp.set_source(src_port);
            tcp.set_destination(dst_port);
            tcp.set_data_offset(5);
            tcp.set_payload(payload);
        }
    }
    buffer
}

/// A UDP DNS response from `resolver` answering a question for `name`.
pub fn dns_response_frame(resolver: Ipv4Addr, name: &str) -> Vec<u8> {
    ipv4_frame(
        resolver,
        Ipv4Addr::new(10, 0, 0, 77),
        Transport::Udp,
        53,
        40_000,
        &dns_message(name, 1),
    )
}

/// Any frame that is not IPv4.
pub fn non_ip_frame() -> Vec<u8> {
    let src = AddressBinding::new(Ipv4Addr::new(10, 0, 0, 77), CLIENT_MAC);
    arp::create_request(src, Ipv4Addr::new(10, 0, 0, 1)).expect("arp request")
}
