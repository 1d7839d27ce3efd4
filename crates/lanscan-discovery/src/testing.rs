//! Capability doubles for engine tests

use async_trait::async_trait;
use lanscan_core::{MacAddress, PortStatus};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::capability::{
    Capabilities, HardwareResolver, LocalAdapter, LocalNetwork, Pinger, ReverseResolver,
    ServiceProber,
};

pub fn ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, last)
}

/// Answers for a fixed set of addresses after `delay`
pub struct MockPinger {
    live: HashSet<Ipv4Addr>,
    delay: Duration,
    rtt: Duration,
    pub calls: AtomicUsize,
}

impl MockPinger {
    pub fn new(live: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            live: live.into_iter().collect(),
            delay: Duration::from_millis(5),
            rtt: Duration::from_millis(3),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn none() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Pinger for MockPinger {
    async fn ping(&self, ip: Ipv4Addr, timeout: Duration, _payload: &[u8]) -> Option<Duration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay.min(timeout)).await;
        self.live.contains(&ip).then_some(self.rtt)
    }
}

/// Pinger that answers only the first `n` requests that reach it
pub struct FirstPings {
    remaining: AtomicUsize,
}

impl FirstPings {
    pub fn new(n: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(n),
        }
    }
}

#[async_trait]
impl Pinger for FirstPings {
    async fn ping(&self, _ip: Ipv4Addr, _timeout: Duration, _payload: &[u8]) -> Option<Duration> {
        let answered = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        answered.then_some(Duration::from_millis(1))
    }
}

#[derive(Default)]
pub struct MockHardware {
    pub table: HashMap<Ipv4Addr, MacAddress>,
}

#[async_trait]
impl HardwareResolver for MockHardware {
    async fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddress> {
        self.table.get(&ip).copied()
    }
}

#[derive(Default)]
pub struct MockResolver {
    pub names: HashMap<Ipv4Addr, String>,
}

#[async_trait]
impl ReverseResolver for MockResolver {
    async fn reverse_lookup(&self, ip: Ipv4Addr) -> Option<String> {
        self.names.get(&ip).cloned()
    }
}

/// Service probe with a fixed answer, optionally slow
pub struct MockProber {
    status: PortStatus,
    delay: Duration,
}

impl MockProber {
    pub fn available() -> Self {
        Self {
            status: PortStatus::Available,
            delay: Duration::ZERO,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: PortStatus::Failed,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ServiceProber for MockProber {
    async fn probe(
        &self,
        _ip: Ipv4Addr,
        _port: u16,
        connect_timeout: Duration,
        _io_timeout: Duration,
    ) -> PortStatus {
        tokio::time::sleep(self.delay.min(connect_timeout)).await;
        self.status
    }
}

#[derive(Default)]
pub struct StaticNetwork {
    pub adapters: Vec<LocalAdapter>,
    pub masks: HashMap<Ipv4Addr, Ipv4Addr>,
}

impl StaticNetwork {
    /// One gateway adapter at `address` with a /24 mask
    pub fn single(address: Ipv4Addr) -> Self {
        Self {
            adapters: vec![LocalAdapter {
                name: "eth0".to_string(),
                gateway_present: true,
                addresses: vec![address],
            }],
            masks: [(address, Ipv4Addr::new(255, 255, 255, 0))].into_iter().collect(),
        }
    }
}

impl LocalNetwork for StaticNetwork {
    fn adapters(&self) -> Vec<LocalAdapter> {
        self.adapters.clone()
    }

    fn subnet_mask(&self, ip: Ipv4Addr) -> Option<Ipv4Addr> {
        self.masks.get(&ip).copied()
    }
}

/// Everything but the pinger fails; the network is 192.168.1.50/24
pub fn capabilities(pinger: impl Pinger + 'static) -> Capabilities {
    Capabilities {
        pinger: Arc::new(pinger),
        hardware: Arc::new(MockHardware::default()),
        resolver: Arc::new(MockResolver::default()),
        prober: Arc::new(MockProber::failed()),
        network: Arc::new(StaticNetwork::single(ip(50))),
    }
}
