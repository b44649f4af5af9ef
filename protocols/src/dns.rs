use std::net::Ipv4Addr;

use pnet::packet::Packet;
use pnet::packet::dns::DnsPacket;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;

pub const DNS_PORT: u16 = 53;
pub const DNS_HDR_LEN: usize = 12;

/// Length prefix carried by DNS messages over TCP.
const TCP_LEN_PREFIX: usize = 2;

/// A DNS response seen on the wire: who sent it and what was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsExchange {
    pub source_ip: Ipv4Addr,
    pub queried_name: String,
}

/// Extracts a [`DnsExchange`] from a raw Ethernet frame.
///
/// Returns `None` unless the frame carries IPv4, UDP or TCP on port 53
/// (either side), and a DNS message with at least one question and one
/// answer record.
pub fn read_exchange(bytes: &[u8]) -> Option<DnsExchange> {
    let eth = EthernetPacket::new(bytes)?;
    if eth.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }
    let ipv4 = Ipv4Packet::new(eth.payload())?;
    let source_ip = ipv4.get_source();

    let queried_name = match ipv4.get_next_level_protocol() {
        IpNextHeaderProtocols::Udp => {
            let udp = UdpPacket::new(ipv4.payload())?;
            if !is_dns_port(udp.get_source(), udp.get_destination()) {
                return None;
            }
            answered_question(udp.payload())?
        }
        IpNextHeaderProtocols::Tcp => {
            let tcp = TcpPacket::new(ipv4.payload())?;
            if !is_dns_port(tcp.get_source(), tcp.get_destination()) {
                return None;
            }
            let payload = tcp.payload();
            if payload.len() < TCP_LEN_PREFIX {
                return None;
            }
            answered_question(&payload[TCP_LEN_PREFIX..])?
        }
        _ => return None,
    };

    Some(DnsExchange {
        source_ip,
        queried_name,
    })
}

fn is_dns_port(src: u16, dst: u16) -> bool {
    src == DNS_PORT || dst == DNS_PORT
}

/// Name of the first question of a DNS message that carries answers.
fn answered_question(payload: &[u8]) -> Option<String> {
    let dns = DnsPacket::new(payload)?;
    if dns.get_query_count() == 0 || dns.get_response_count() == 0 {
        return None;
    }
    decode_dns_name(&payload[DNS_HDR_LEN..])
}

pub fn encode_dns_name(name: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}

/// Decodes an uncompressed, label-encoded name.
fn decode_dns_name(data: &[u8]) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let mut cursor: usize = 0;
    loop {
        let len: usize = *data.get(cursor)? as usize;
        if len == 0 {
            break;
        }
        // compression pointers never start the first question
        if len & 0xC0 != 0 {
            return None;
        }
        cursor += 1;
        let label_bytes: &[u8] = data.get(cursor..cursor + len)?;
        parts.push(std::str::from_utf8(label_bytes).ok()?);
        cursor += len;
    }
    Some(parts.join("."))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
