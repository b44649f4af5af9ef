//! # Target Specification
//!
//! Parses and expands the set of hosts a session acts upon.
//!
//! Supported forms, freely combined with commas:
//! * A single IPv4 address (`192.168.1.5`).
//! * A range, full or abbreviated (`192.168.1.1-192.168.1.50`, `192.168.1.1-50`).
//! * A CIDR block (`192.168.1.0/24`).
//! * Trailing wildcard octets (`192.168.1.*`).

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

use crate::network::range::{self, Ipv4Range};

/// Upper bound on the number of addresses a single specification may expand to.
pub const MAX_TARGETS: u64 = 65_536;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("no targets provided")]
    NoTargetsProvided,

    #[error("invalid target specification '{spec}': {reason}")]
    InvalidSpecification { spec: String, reason: String },

    #[error("invalid host address '{0}'")]
    InvalidHostAddress(String),
}

impl TargetError {
    fn invalid(spec: &str, reason: impl Into<String>) -> Self {
        TargetError::InvalidSpecification {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// One parsed entry of a target specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Host { target_addr: Ipv4Addr },
    Range { ipv4_range: Ipv4Range },
    Multi { targets: Vec<Target> },
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetError::NoTargetsProvided);
        }

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_wildcard(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        Err(TargetError::invalid(s, "not an address, range, CIDR block or wildcard"))
    }
}

/// Ordered, duplicate-free list of IPv4 addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSet {
    addrs: Vec<Ipv4Addr>,
}

impl TargetSet {
    /// Expands a specification string. Order follows the textual order of the
    /// specification; repeated addresses keep their first position.
    pub fn expand(spec: &str) -> Result<Self, TargetError> {
        let target = Target::from_str(spec)?;
        let mut set = TargetSet::default();
        let mut seen: HashSet<Ipv4Addr> = HashSet::new();
        let mut budget: u64 = 0;

        collect(&target, spec, &mut set.addrs, &mut seen, &mut budget)?;

        if set.addrs.is_empty() {
            return Err(TargetError::NoTargetsProvided);
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn contains(&self, addr: &Ipv4Addr) -> bool {
        self.addrs.contains(addr)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ipv4Addr> {
        self.addrs.iter()
    }

    pub fn as_slice(&self) -> &[Ipv4Addr] {
        &self.addrs
    }
}

impl From<TargetSet> for Vec<Ipv4Addr> {
    fn from(set: TargetSet) -> Self {
        set.addrs
    }
}

/// Expands the target specification and validates the host address in one go.
pub fn resolve(spec: &str, host: &str) -> Result<(TargetSet, Ipv4Addr), TargetError> {
    let host_addr = host
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| TargetError::InvalidHostAddress(host.to_string()))?;
    let targets = TargetSet::expand(spec)?;
    Ok((targets, host_addr))
}

fn collect(
    target: &Target,
    spec: &str,
    out: &mut Vec<Ipv4Addr>,
    seen: &mut HashSet<Ipv4Addr>,
    budget: &mut u64,
) -> Result<(), TargetError> {
    match target {
        Target::Host { target_addr } => {
            *budget += 1;
            if seen.insert(*target_addr) {
                out.push(*target_addr);
            }
        }
        Target::Range { ipv4_range } => {
            *budget += ipv4_range.len();
            if *budget > MAX_TARGETS {
                return Err(TargetError::invalid(
                    spec,
                    format!("expands to more than {MAX_TARGETS} addresses"),
                ));
            }
            for addr in ipv4_range.to_iter() {
                if seen.insert(addr) {
                    out.push(addr);
                }
            }
        }
        Target::Multi { targets } => {
            for target in targets {
                collect(target, spec, out, seen, budget)?;
            }
        }
    }
    Ok(())
}

/// Parses a comma-separated list of targets (e.g., "192.168.1.5, 10.0.0.1-50").
fn parse_commas(s: &str) -> Result<Target, TargetError> {
    let mut targets = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        targets.push(Target::from_str(part)?);
    }

    if targets.is_empty() {
        return Err(TargetError::NoTargetsProvided);
    }
    Ok(Target::Multi { targets })
}

fn parse_host(s: &str) -> Option<Target> {
    s.parse::<Ipv4Addr>()
        .ok()
        .map(|target_addr| Target::Host { target_addr })
}

fn parse_wildcard(s: &str) -> Result<Option<Target>, TargetError> {
    if !s.contains('*') {
        return Ok(None);
    }
    let ipv4_range = range::wildcard_range(s).map_err(|e| TargetError::invalid(s, e.to_string()))?;
    Ok(Some(Target::Range { ipv4_range }))
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<Target>, TargetError> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| TargetError::invalid(s, format!("invalid start address '{start_str}': {e}")))?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr)
        .map_err(|reason| TargetError::invalid(s, reason))?;

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    if ipv4_range.is_empty() {
        return Err(TargetError::invalid(s, "range start is after range end"));
    }
    Ok(Some(Target::Range { ipv4_range }))
}

/// Helper to parse the end address of a range.
///
/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(end_str: &str, start_addr: &Ipv4Addr) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    if end_str.is_empty() {
        return Err("range end cannot be empty".to_string());
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("invalid range end '{end_str}': {e}"))?;

    if partial_octets.len() > 4 {
        return Err(format!("range end has too many octets: {end_str}"));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<Target>, TargetError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| TargetError::invalid(s, format!("invalid address '{ip_str}': {e}")))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| TargetError::invalid(s, format!("invalid prefix '{prefix_str}': {e}")))?;

    let ipv4_range =
        range::cidr_range(ipv4_addr, prefix).map_err(|e| TargetError::invalid(s, e.to_string()))?;

    Ok(Some(Target::Range { ipv4_range }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
