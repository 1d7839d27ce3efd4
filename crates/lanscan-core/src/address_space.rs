//! IPv4 subnet arithmetic

use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Result, ScanError};

/// The usable host range of an IPv4 subnet.
///
/// All arithmetic is done on the big-endian `u32` form of the address, so
/// host enumeration is ascending by numeric value. The network and broadcast
/// addresses are never part of [`AddressSpace::hosts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressSpace {
    base: Ipv4Addr,
    mask: Ipv4Addr,
    network: Ipv4Addr,
    broadcast: Ipv4Addr,
}

impl AddressSpace {
    /// Build the address space for `local` inside the subnet given by `mask`.
    ///
    /// Both values must be IPv4 and the mask must be a contiguous run of
    /// leading one-bits.
    pub fn new(local: IpAddr, mask: IpAddr) -> Result<Self> {
        let (base, mask_v4) = match (local, mask) {
            (IpAddr::V4(base), IpAddr::V4(mask_v4)) => (base, mask_v4),
            _ => {
                return Err(ScanError::InvalidMask {
                    address: local,
                    mask,
                    reason: "address and mask lengths do not match",
                })
            }
        };

        let mask_bits = u32::from(mask_v4);
        // A valid mask is 1...10...0, so its complement plus one is a power of two
        if (!mask_bits).wrapping_add(1) & !mask_bits != 0 {
            return Err(ScanError::InvalidMask {
                address: local,
                mask,
                reason: "mask bits are not contiguous",
            });
        }

        let network = u32::from(base) & mask_bits;
        let broadcast = network | !mask_bits;

        Ok(Self {
            base,
            mask: mask_v4,
            network: Ipv4Addr::from(network),
            broadcast: Ipv4Addr::from(broadcast),
        })
    }

    /// Build the address space from a prefix length (e.g. 24 for /24)
    pub fn from_prefix(local: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(ScanError::InvalidPrefix(prefix_len));
        }
        let mask = if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len)
        };
        Self::new(IpAddr::V4(local), IpAddr::V4(Ipv4Addr::from(mask)))
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.mask
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.broadcast
    }

    pub fn prefix_len(&self) -> u8 {
        u32::from(self.mask).count_ones() as u8
    }

    /// Number of usable hosts: `broadcast - network - 1`, or zero for /31 and /32.
    pub fn host_count(&self) -> u64 {
        let network = u32::from(self.network) as u64;
        let broadcast = u32::from(self.broadcast) as u64;
        (broadcast - network).saturating_sub(1)
    }

    /// Iterate the usable hosts in ascending order.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + Clone {
        let first = u32::from(self.network) as u64 + 1;
        let last = u32::from(self.broadcast) as u64;
        (first..last).map(|host| Ipv4Addr::from(host as u32))
    }

    /// Check whether `ip` lies inside this subnet (network and broadcast included)
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & u32::from(self.mask) == u32::from(self.network)
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_class_c_subnet() {
        let space = AddressSpace::new(v4(192, 168, 1, 50), v4(255, 255, 255, 0)).unwrap();
        assert_eq!(space.network(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(space.broadcast(), Ipv4Addr::new(192, 168, 1, 255));
        assert_eq!(space.host_count(), 254);

        let hosts: Vec<Ipv4Addr> = space.hosts().collect();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts.first(), Some(&Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(hosts.last(), Some(&Ipv4Addr::new(192, 168, 1, 254)));
        assert!(!hosts.contains(&space.network()));
        assert!(!hosts.contains(&space.broadcast()));
    }

    #[test]
    fn test_hosts_ascending_across_octet_boundary() {
        // /23 spans two third-octet values; raw byte order would not sort these
        let space = AddressSpace::new(v4(10, 0, 4, 9), v4(255, 255, 254, 0)).unwrap();
        assert_eq!(space.network(), Ipv4Addr::new(10, 0, 4, 0));
        assert_eq!(space.broadcast(), Ipv4Addr::new(10, 0, 5, 255));

        let hosts: Vec<Ipv4Addr> = space.hosts().collect();
        assert_eq!(hosts.len() as u64, space.host_count());
        assert_eq!(hosts.len(), 510);
        assert!(hosts.windows(2).all(|w| u32::from(w[0]) < u32::from(w[1])));
        assert!(hosts.contains(&Ipv4Addr::new(10, 0, 4, 255)));
        assert!(hosts.contains(&Ipv4Addr::new(10, 0, 5, 0)));
    }

    #[test]
    fn test_host_count_matches_formula() {
        for prefix in 8..=30u8 {
            let space = AddressSpace::from_prefix(Ipv4Addr::new(172, 16, 33, 7), prefix).unwrap();
            let expected =
                u32::from(space.broadcast()) as u64 - u32::from(space.network()) as u64 - 1;
            assert_eq!(space.host_count(), expected, "prefix /{}", prefix);
        }
    }

    #[test]
    fn test_point_to_point_and_single_host() {
        let p2p = AddressSpace::from_prefix(Ipv4Addr::new(10, 1, 1, 1), 31).unwrap();
        assert_eq!(p2p.host_count(), 0);
        assert_eq!(p2p.hosts().count(), 0);

        let single = AddressSpace::from_prefix(Ipv4Addr::new(10, 1, 1, 1), 32).unwrap();
        assert_eq!(single.network(), single.broadcast());
        assert_eq!(single.hosts().count(), 0);
    }

    #[test]
    fn test_mixed_families_rejected() {
        let ipv6: IpAddr = "fe80::1".parse().unwrap();
        let result = AddressSpace::new(v4(192, 168, 1, 50), ipv6);
        assert!(matches!(result, Err(ScanError::InvalidMask { .. })));
    }

    #[test]
    fn test_non_contiguous_mask_rejected() {
        let result = AddressSpace::new(v4(192, 168, 1, 50), v4(255, 0, 255, 0));
        assert!(matches!(result, Err(ScanError::InvalidMask { .. })));
    }

    #[test]
    fn test_from_prefix() {
        let space = AddressSpace::from_prefix(Ipv4Addr::new(192, 168, 186, 23), 24).unwrap();
        assert_eq!(space.mask(), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(space.prefix_len(), 24);
        assert_eq!(space.to_string(), "192.168.186.0/24");
        assert!(matches!(
            AddressSpace::from_prefix(Ipv4Addr::LOCALHOST, 33),
            Err(ScanError::InvalidPrefix(33))
        ));
    }

    #[test]
    fn test_contains() {
        let space = AddressSpace::from_prefix(Ipv4Addr::new(192, 168, 186, 0), 24).unwrap();
        assert!(space.contains(Ipv4Addr::new(192, 168, 186, 1)));
        assert!(space.contains(Ipv4Addr::new(192, 168, 186, 255)));
        assert!(!space.contains(Ipv4Addr::new(192, 168, 187, 1)));
        assert!(!space.contains(Ipv4Addr::new(10, 0, 0, 1)));
    }
}
