//! IPv4 mask and CIDR helpers

use serde::Serialize;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Prefix length of a contiguous netmask, or None if the mask has holes
pub fn prefix_len(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    if bits.checked_shl(ones).unwrap_or(0) == 0 {
        Some(ones as u8)
    } else {
        None
    }
}

/// Netmask for a prefix length (0..=32)
pub fn mask_from_prefix(prefix: u8) -> Option<Ipv4Addr> {
    match prefix {
        0 => Some(Ipv4Addr::UNSPECIFIED),
        1..=32 => Some(Ipv4Addr::from(u32::MAX << (32 - u32::from(prefix)))),
        _ => None,
    }
}

/// Network address of `ip` under `mask`
pub fn network_of(ip: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) & u32::from(mask))
}

/// A parsed `a.b.c.d/len` block with the addresses handed out on point-to-point links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CidrBlock {
    pub network: Ipv4Addr,
    pub prefix: u8,
    pub first_host: Ipv4Addr,
    pub second_host: Ipv4Addr,
}

impl CidrBlock {
    pub fn mask(&self) -> Ipv4Addr {
        mask_from_prefix(self.prefix).unwrap_or(Ipv4Addr::UNSPECIFIED)
    }
}

impl FromStr for CidrBlock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("'{}' is not in a.b.c.d/len form", s))?;
        let ip: Ipv4Addr = ip
            .parse()
            .map_err(|_| format!("'{}' is not an IPv4 address", ip))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| format!("'{}' is not a prefix length", prefix))?;
        let mask = mask_from_prefix(prefix)
            .ok_or_else(|| format!("prefix length {} is out of range", prefix))?;

        let network = u32::from(network_of(ip, mask));
        Ok(CidrBlock {
            network: Ipv4Addr::from(network),
            prefix,
            first_host: Ipv4Addr::from(network.wrapping_add(1)),
            second_host: Ipv4Addr::from(network.wrapping_add(2)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_len_contiguous() {
        assert_eq!(prefix_len(Ipv4Addr::new(255, 255, 255, 0)), Some(24));
        assert_eq!(prefix_len(Ipv4Addr::new(255, 255, 255, 252)), Some(30));
        assert_eq!(prefix_len(Ipv4Addr::new(0, 0, 0, 0)), Some(0));
        assert_eq!(prefix_len(Ipv4Addr::new(255, 255, 255, 255)), Some(32));
    }

    #[test]
    fn test_prefix_len_rejects_holes() {
        assert_eq!(prefix_len(Ipv4Addr::new(255, 0, 255, 0)), None);
        assert_eq!(prefix_len(Ipv4Addr::new(0, 0, 0, 255)), None);
    }

    #[test]
    fn test_cidr_block_point_to_point() {
        let block: CidrBlock = "10.0.0.5/30".parse().unwrap();
        assert_eq!(block.network, Ipv4Addr::new(10, 0, 0, 4));
        assert_eq!(block.first_host, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(block.second_host, Ipv4Addr::new(10, 0, 0, 6));
        assert_eq!(block.mask(), Ipv4Addr::new(255, 255, 255, 252));
    }

    #[test]
    fn test_cidr_block_errors() {
        assert!("10.0.0.0".parse::<CidrBlock>().is_err());
        assert!("10.0.0.0/33".parse::<CidrBlock>().is_err());
        assert!("nope/24".parse::<CidrBlock>().is_err());
    }
}
