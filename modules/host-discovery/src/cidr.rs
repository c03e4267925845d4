use ipnet::IpNet;
use netsweep_core::CidrError;
use std::net::Ipv4Addr;

/// Result of expanding one network range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Hosts(Vec<Ipv4Addr>),
    /// IPv6 ranges are not enumerated.
    SkippedIpv6,
}

impl Expansion {
    pub fn hosts(&self) -> &[Ipv4Addr] {
        match self {
            Expansion::Hosts(v) => v,
            Expansion::SkippedIpv6 => &[],
        }
    }
}

/// Expand an IPv4 CIDR into host addresses in ascending order.
///
/// The block is first truncated to `cap` addresses counted from the network
/// address; the first and last address of that span are then dropped. For a
/// block no larger than `cap` those are exactly the network and broadcast
/// addresses, so a /24 yields 254 hosts and /31 or /32 yield none.
pub fn expand_cidr(cidr: &str, cap: usize) -> Result<Expansion, CidrError> {
    let net: IpNet = cidr
        .trim()
        .parse()
        .map_err(|source| CidrError::Malformed { cidr: cidr.to_string(), source })?;
    let v4 = match net {
        IpNet::V4(n) => n,
        IpNet::V6(_) => return Ok(Expansion::SkippedIpv6),
    };
    let base = u32::from(v4.network());
    let size = 1u64 << (32 - u32::from(v4.prefix_len()));
    let span = size.min(cap as u64);
    let hosts = (1..span.saturating_sub(1))
        .map(|offset| Ipv4Addr::from(base + offset as u32))
        .collect();
    Ok(Expansion::Hosts(hosts))
}
