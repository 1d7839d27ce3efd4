//! Scan orchestration: address space, liveness sweep, then bounded enrichment

use chrono::{DateTime, Utc};
use lanscan_core::{AddressSpace, ProgressReport, Result, ScanError, ScanPhase, ScanResult};
use serde::{Serialize, Serializer};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::capability::{Capabilities, LocalAdapter};
use crate::enrich::{HostEnricher, ProbeTimeouts};
use crate::sweep::{LivenessSweep, SweepOptions};

/// Default service port (telnet, as exposed by serial-to-network bridges)
pub const DEFAULT_PORT: u16 = 23;

/// Largest subnet scanned unless configured otherwise (a /16)
pub const DEFAULT_MAX_HOSTS: u64 = 65_534;

/// Scan configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Service port probed on every responder
    pub port: u16,
    /// Local address override; the gateway adapter's address otherwise
    pub local_address: Option<Ipv4Addr>,
    /// Subnet mask override; looked up from the adapter otherwise
    pub netmask: Option<Ipv4Addr>,
    /// Enrichment worker cap
    pub max_parallel: usize,
    /// Refuse subnets with more usable hosts than this
    pub max_hosts: u64,
    pub timeouts: ProbeTimeouts,
    pub sweep: SweepOptions,
    /// Extra wait after the sweep's last dispatch, on top of the ping timeout
    pub sweep_grace: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            local_address: None,
            netmask: None,
            max_parallel: 32,
            max_hosts: DEFAULT_MAX_HOSTS,
            timeouts: ProbeTimeouts::default(),
            sweep: SweepOptions::default(),
            sweep_grace: Duration::from_secs(2),
        }
    }
}

impl ScanConfig {
    /// How long the sweep waits for replies after its last dispatch
    pub fn sweep_deadline(&self) -> Duration {
        self.timeouts.ping + self.sweep_grace
    }
}

/// What a finished (or cancelled) scan covered
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub network: AddressSpace,
    /// Addresses swept
    pub candidates: usize,
    /// Addresses that answered the sweep
    pub responded: usize,
    /// Hosts handed to the caller
    pub reported: usize,
    pub cancelled: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Scanner entry point
pub struct Scanner {
    capabilities: Capabilities,
}

impl Scanner {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Work out the address space to scan from overrides and local adapters
    pub fn resolve_network(&self, config: &ScanConfig) -> Result<AddressSpace> {
        let local = match config.local_address {
            Some(address) => address,
            None => pick_local_address(&self.capabilities.network.adapters())
                .ok_or(ScanError::NoAdapterFound)?,
        };

        let mask = match config.netmask {
            Some(mask) => mask,
            None => self
                .capabilities
                .network
                .subnet_mask(local)
                .ok_or(ScanError::NoSubnetMask(local))?,
        };

        let network = AddressSpace::new(IpAddr::V4(local), IpAddr::V4(mask))?;
        if network.host_count() > config.max_hosts {
            return Err(ScanError::SubnetTooLarge {
                hosts: network.host_count(),
                limit: config.max_hosts,
            });
        }
        Ok(network)
    }

    /// Sweep the local subnet and enrich every responder.
    ///
    /// `on_host_found` is called once per host with data, from worker tasks,
    /// in completion order. `on_progress` sees the sweep phase then the
    /// enrichment phase. Cancellation is not an error: the summary records it
    /// and holds whatever was reached.
    pub async fn scan<F, P>(
        &self,
        config: &ScanConfig,
        on_host_found: F,
        on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<ScanSummary>
    where
        F: Fn(Ipv4Addr, ScanResult) + Send + Sync + 'static,
        P: Fn(ProgressReport) + Send + Sync + 'static,
    {
        let scan_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        let network = self.resolve_network(config)?;
        info!(
            scan_id = %scan_id,
            network = %network,
            local = %network.base(),
            hosts = network.host_count(),
            port = config.port,
            "Starting scan"
        );

        let on_host_found = Arc::new(on_host_found);
        let on_progress = Arc::new(on_progress);

        let sweep = LivenessSweep::new(
            self.capabilities.pinger.clone(),
            config.timeouts.ping,
            config.sweep,
        );
        let liveness = sweep
            .run(
                network.hosts(),
                config.sweep_deadline(),
                |report| on_progress(report),
                cancel,
            )
            .await;

        let candidates = liveness.total;
        let responded = liveness.len();
        let mut summary = ScanSummary {
            scan_id,
            started_at,
            network,
            candidates,
            responded,
            reported: 0,
            cancelled: liveness.cancelled,
            elapsed: Duration::ZERO,
        };

        if !liveness.cancelled {
            let responders: Vec<Ipv4Addr> = liveness.into_responded().into_iter().collect();
            let (reported, cancelled) = self
                .enrich(config, responders, on_host_found, on_progress, cancel)
                .await;
            summary.reported = reported;
            summary.cancelled = cancelled;
        }

        summary.elapsed = started.elapsed();
        info!(
            scan_id = %scan_id,
            candidates = summary.candidates,
            responded = summary.responded,
            reported = summary.reported,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Scan complete"
        );
        Ok(summary)
    }

    /// Enrich responders under the worker cap; returns (reported, cancelled)
    async fn enrich<F, P>(
        &self,
        config: &ScanConfig,
        responders: Vec<Ipv4Addr>,
        on_host_found: Arc<F>,
        on_progress: Arc<P>,
        cancel: &CancellationToken,
    ) -> (usize, bool)
    where
        F: Fn(Ipv4Addr, ScanResult) + Send + Sync + 'static,
        P: Fn(ProgressReport) + Send + Sync + 'static,
    {
        let total = responders.len();
        on_progress(ProgressReport::new(ScanPhase::Enrich, 0, total));
        info!(hosts = total, max_parallel = config.max_parallel, "Starting enrichment");

        let enricher = Arc::new(HostEnricher::new(self.capabilities.clone(), config.timeouts));
        let permits = Arc::new(Semaphore::new(config.max_parallel.max(1)));
        let completed = Arc::new(Mutex::new(0usize));
        let reported = Arc::new(AtomicUsize::new(0));
        let mut workers = JoinSet::new();
        let mut cancelled = false;

        for ip in responders {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let enricher = enricher.clone();
            let completed = completed.clone();
            let reported = reported.clone();
            let on_host_found = on_host_found.clone();
            let on_progress = on_progress.clone();
            let cancel = cancel.clone();
            let port = config.port;

            workers.spawn(async move {
                let _permit = permit;
                let result = enricher.probe(ip, port, &cancel).await;

                if cancel.is_cancelled() {
                    trace!(ip = %ip, "Dropping enrichment finished after cancellation");
                    return;
                }

                match completed.lock() {
                    Ok(mut done) => {
                        *done += 1;
                        on_progress(ProgressReport::new(ScanPhase::Enrich, *done, total));
                    }
                    Err(_) => return,
                }

                if result.has_data() {
                    reported.fetch_add(1, Ordering::SeqCst);
                    on_host_found(ip, result);
                } else {
                    debug!(ip = %ip, "Responder yielded no data");
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Enrichment worker failed");
            }
        }

        (
            reported.load(Ordering::SeqCst),
            cancelled || cancel.is_cancelled(),
        )
    }
}

/// First address of the first adapter that has a default gateway
pub fn pick_local_address(adapters: &[LocalAdapter]) -> Option<Ipv4Addr> {
    adapters
        .iter()
        .filter(|adapter| adapter.gateway_present)
        .find_map(|adapter| adapter.addresses.first().copied())
}
