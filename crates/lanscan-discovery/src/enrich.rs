//! Per-host enrichment: latency, hardware address, name and service probe

use lanscan_core::{MacAddress, PortStatus, ScanResult};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::capability::Capabilities;
use crate::sweep::ECHO_PAYLOAD;

/// Timeouts applied to each enrichment probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    /// ICMP echo reply wait, also used by the liveness sweep
    pub ping: Duration,
    /// TCP connect
    pub connect: Duration,
    /// TCP I/O once connected
    pub io: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            ping: Duration::from_secs(5),
            connect: Duration::from_secs(5),
            io: Duration::from_secs(2),
        }
    }
}

/// Result of one of the four probes
#[derive(Debug)]
enum ProbeOutcome {
    Latency(Option<Duration>),
    Hardware(Option<MacAddress>),
    HostName(Option<String>),
    Service(PortStatus),
}

impl ProbeOutcome {
    fn apply(self, result: &mut ScanResult) {
        match self {
            ProbeOutcome::Latency(latency) => result.latency = latency,
            ProbeOutcome::Hardware(mac) => result.hardware_address = mac,
            ProbeOutcome::HostName(name) => result.host_name = name,
            ProbeOutcome::Service(status) => result.port_status = status,
        }
    }
}

/// Gathers everything the capabilities can tell about one address
#[derive(Clone)]
pub struct HostEnricher {
    capabilities: Capabilities,
    timeouts: ProbeTimeouts,
}

impl HostEnricher {
    pub fn new(capabilities: Capabilities, timeouts: ProbeTimeouts) -> Self {
        Self {
            capabilities,
            timeouts,
        }
    }

    /// Run all four probes concurrently and merge what they return.
    ///
    /// Any probe may fail without affecting the others. On cancellation the
    /// probes still running are detached and the fields they own stay empty;
    /// the service status stays `Unknown` if its probe never finished.
    pub async fn probe(
        &self,
        address: Ipv4Addr,
        port: u16,
        cancel: &CancellationToken,
    ) -> ScanResult {
        let mut result = ScanResult::new(address, port);
        if cancel.is_cancelled() {
            return result;
        }

        let mut probes = JoinSet::new();
        let timeouts = self.timeouts;

        let pinger = self.capabilities.pinger.clone();
        probes.spawn(async move {
            ProbeOutcome::Latency(pinger.ping(address, timeouts.ping, &ECHO_PAYLOAD).await)
        });

        let hardware = self.capabilities.hardware.clone();
        probes.spawn(async move { ProbeOutcome::Hardware(hardware.resolve(address).await) });

        let resolver = self.capabilities.resolver.clone();
        probes.spawn(async move { ProbeOutcome::HostName(resolver.reverse_lookup(address).await) });

        let prober = self.capabilities.prober.clone();
        probes.spawn(async move {
            ProbeOutcome::Service(
                prober
                    .probe(address, port, timeouts.connect, timeouts.io)
                    .await,
            )
        });

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(ip = %address, outstanding = probes.len(), "Enrichment cancelled");
                    probes.detach_all();
                    break;
                }
                joined = probes.join_next() => match joined {
                    Some(Ok(outcome)) => outcome.apply(&mut result),
                    Some(Err(e)) => debug!(ip = %address, error = %e, "Probe task failed"),
                    None => break,
                },
            }
        }

        debug!(
            ip = %address,
            latency = ?result.latency,
            mac = ?result.hardware_address.map(|m| m.to_string()),
            host = ?result.host_name,
            status = %result.port_status,
            "Host enriched"
        );
        result
    }
}
