//! OS capabilities the scanning engine consumes
//!
//! The engine never talks to the operating system directly. Every network
//! primitive it needs is one of the traits below, so the sweep, enrichment and
//! orchestration logic can run against the system implementations in this
//! crate or against test doubles.

use async_trait::async_trait;
use lanscan_core::{MacAddress, PortStatus};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use crate::arp::NeighborTable;
use crate::dns::SystemResolver;
use crate::interface::SystemNetwork;
use crate::ping::SystemPinger;
use crate::tcp::TcpConnectProber;

/// ICMP echo
#[async_trait]
pub trait Pinger: Send + Sync {
    /// Send one echo request carrying `payload`; returns the round-trip time
    /// if a reply arrived within `timeout`.
    async fn ping(&self, ip: Ipv4Addr, timeout: Duration, payload: &[u8]) -> Option<Duration>;
}

/// Hardware address resolution (ARP / neighbor table)
#[async_trait]
pub trait HardwareResolver: Send + Sync {
    async fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddress>;
}

/// Reverse DNS
#[async_trait]
pub trait ReverseResolver: Send + Sync {
    async fn reverse_lookup(&self, ip: Ipv4Addr) -> Option<String>;
}

/// TCP connect-and-close probe
#[async_trait]
pub trait ServiceProber: Send + Sync {
    /// Returns [`PortStatus::Available`] or [`PortStatus::Failed`], never `Unknown`.
    async fn probe(
        &self,
        ip: Ipv4Addr,
        port: u16,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> PortStatus;
}

/// A local network adapter as seen by adapter selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAdapter {
    pub name: String,
    /// Whether the adapter carries a default gateway
    pub gateway_present: bool,
    /// IPv4 unicast addresses assigned to the adapter
    pub addresses: Vec<Ipv4Addr>,
}

/// Local network configuration
pub trait LocalNetwork: Send + Sync {
    fn adapters(&self) -> Vec<LocalAdapter>;

    fn subnet_mask(&self, ip: Ipv4Addr) -> Option<Ipv4Addr>;
}

/// The full set of capabilities a scan runs against
#[derive(Clone)]
pub struct Capabilities {
    pub pinger: Arc<dyn Pinger>,
    pub hardware: Arc<dyn HardwareResolver>,
    pub resolver: Arc<dyn ReverseResolver>,
    pub prober: Arc<dyn ServiceProber>,
    pub network: Arc<dyn LocalNetwork>,
}

impl Capabilities {
    /// Capabilities backed by the host operating system
    pub fn system(arp_attempts: u32) -> Self {
        Self {
            pinger: Arc::new(SystemPinger::new()),
            hardware: Arc::new(NeighborTable::new(arp_attempts)),
            resolver: Arc::new(SystemResolver::new()),
            prober: Arc::new(TcpConnectProber),
            network: Arc::new(SystemNetwork),
        }
    }

    /// Replace hardware resolution with one that never answers
    pub fn without_hardware(mut self) -> Self {
        self.hardware = Arc::new(Disabled);
        self
    }

    /// Replace reverse DNS with one that never answers
    pub fn without_reverse_dns(mut self) -> Self {
        self.resolver = Arc::new(Disabled);
        self
    }
}

/// Stand-in for a capability that is switched off or unavailable
pub struct Disabled;

#[async_trait]
impl HardwareResolver for Disabled {
    async fn resolve(&self, _ip: Ipv4Addr) -> Option<MacAddress> {
        None
    }
}

#[async_trait]
impl ReverseResolver for Disabled {
    async fn reverse_lookup(&self, _ip: Ipv4Addr) -> Option<String> {
        None
    }
}
