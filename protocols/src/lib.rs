//! Frame construction and parsing for the protocols `lure` speaks:
//! Ethernet and ARP on the way out, ARP and DNS on the way in.

pub mod arp;
pub mod dns;
pub mod ethernet;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub const MIN_ETH_FRAME_NO_FCS: usize = 60;
pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
