//! lanscan Discovery - Subnet sweep and host enrichment
//!
//! This crate provides:
//! - An ICMP liveness sweep over every address of the local subnet
//! - Per-host enrichment (latency, ARP, reverse DNS, TCP service probe)
//! - The `Scanner` that runs both phases under a worker cap with cancellation
//! - System implementations of the network capabilities the engine consumes

pub mod arp;
pub mod capability;
pub mod dns;
pub mod enrich;
pub mod interface;
pub mod ping;
pub mod scanner;
pub mod sweep;
pub mod tcp;

#[cfg(test)]
mod testing;

pub use capability::{
    Capabilities, HardwareResolver, LocalAdapter, LocalNetwork, Pinger, ReverseResolver,
    ServiceProber,
};
pub use enrich::{HostEnricher, ProbeTimeouts};
pub use scanner::{ScanConfig, ScanSummary, Scanner, DEFAULT_MAX_HOSTS, DEFAULT_PORT};
pub use sweep::{LivenessResult, LivenessSweep, SweepOptions};
pub use tokio_util::sync::CancellationToken;
