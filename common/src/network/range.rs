use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Number of addresses covered, zero when `start_addr > end_addr`.
    pub fn len(&self) -> u64 {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if start > end {
            0
        } else {
            u64::from(end - start) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_iter(self) -> impl Iterator<Item = Ipv4Addr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }
}

pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    let network = pnet::ipnetwork::Ipv4Network::new(ip, prefix)?;
    let start = network.network();
    let end = network.broadcast();

    Ok(Ipv4Range::new(start, end))
}

/// Builds the range described by a dotted pattern whose trailing octets
/// are `*`, e.g. `192.168.1.*` or `10.0.*.*`.
pub fn wildcard_range(pattern: &str) -> anyhow::Result<Ipv4Range> {
    let parts: Vec<&str> = pattern.split('.').collect();
    anyhow::ensure!(parts.len() == 4, "expected four octets in '{pattern}'");

    let mut start = [0u8; 4];
    let mut end = [0u8; 4];
    let mut seen_wildcard = false;

    for (idx, part) in parts.iter().enumerate() {
        if *part == "*" {
            seen_wildcard = true;
            start[idx] = 0;
            end[idx] = u8::MAX;
            continue;
        }
        anyhow::ensure!(
            !seen_wildcard,
            "wildcards must be trailing octets in '{pattern}'"
        );
        let octet: u8 = part
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid octet '{part}': {e}"))?;
        start[idx] = octet;
        end[idx] = octet;
    }

    anyhow::ensure!(seen_wildcard, "no wildcard in '{pattern}'");
    Ok(Ipv4Range::new(Ipv4Addr::from(start), Ipv4Addr::from(end)))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
