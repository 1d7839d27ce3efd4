//! Error types for scan configuration

use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Errors that stop a scan before any probe is sent.
///
/// Per-host failures never show up here: they are absorbed by the probe that
/// hit them and surface only as missing fields on that host's result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Invalid subnet mask {mask} for address {address}: {reason}")]
    InvalidMask {
        address: IpAddr,
        mask: IpAddr,
        reason: &'static str,
    },
    #[error("Invalid prefix length /{0}")]
    InvalidPrefix(u8),
    #[error("No network adapter with a gateway and an IPv4 address was found")]
    NoAdapterFound,
    #[error("Can't find subnet mask for IP {0}")]
    NoSubnetMask(Ipv4Addr),
    #[error("Subnet has {hosts} hosts, more than the configured limit of {limit}")]
    SubnetTooLarge { hosts: u64, limit: u64 },
}

pub type Result<T> = std::result::Result<T, ScanError>;
