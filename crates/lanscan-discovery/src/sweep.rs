//! ICMP liveness sweep over every candidate address
//!
//! One echo request is fired per candidate without waiting for earlier ones.
//! Each probe owns its timeout; the sweep only tracks how many finished and
//! which answered.

use lanscan_core::{ProgressReport, ScanPhase};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::capability::Pinger;

/// Payload carried by every echo request
pub const ECHO_PAYLOAD: [u8; 4] = [1, 2, 3, 4];

/// Dispatch pacing and wait-loop tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// Pause after every `batch_size` dispatches (0 disables pausing)
    pub batch_size: usize,
    pub batch_pause: Duration,
    /// How often the wait loop samples the completion counter
    pub poll_interval: Duration,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            batch_size: 16,
            batch_pause: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Addresses that answered, plus how far the sweep got
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessResult {
    responded: BTreeSet<Ipv4Addr>,
    pub total: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub cancelled: bool,
}

impl LivenessResult {
    /// Responders in ascending order
    pub fn responded(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.responded.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.responded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responded.is_empty()
    }

    pub fn into_responded(self) -> BTreeSet<Ipv4Addr> {
        self.responded
    }
}

pub struct LivenessSweep {
    pinger: Arc<dyn Pinger>,
    ping_timeout: Duration,
    options: SweepOptions,
}

impl LivenessSweep {
    pub fn new(pinger: Arc<dyn Pinger>, ping_timeout: Duration, options: SweepOptions) -> Self {
        Self {
            pinger,
            ping_timeout,
            options,
        }
    }

    /// Ping every host and collect the ones that answer.
    ///
    /// `deadline` bounds the wait once the last request has been dispatched.
    /// Cancellation stops dispatching and returns what was collected so far;
    /// requests already in flight finish in the background and are ignored.
    pub async fn run<P>(
        &self,
        hosts: impl IntoIterator<Item = Ipv4Addr>,
        deadline: Duration,
        on_progress: P,
        cancel: &CancellationToken,
    ) -> LivenessResult
    where
        P: Fn(ProgressReport),
    {
        let hosts: Vec<Ipv4Addr> = hosts.into_iter().collect();
        let total = hosts.len();
        let responded = Arc::new(Mutex::new(BTreeSet::new()));
        let completed = Arc::new(AtomicUsize::new(0));

        info!(hosts = total, "Starting liveness sweep");
        on_progress(ProgressReport::new(ScanPhase::Sweep, 0, total));

        let mut reported = 0;
        let report = |reported: &mut usize| {
            let done = completed.load(Ordering::SeqCst).min(total);
            if done > *reported {
                *reported = done;
                on_progress(ProgressReport::new(ScanPhase::Sweep, done, total));
            }
        };

        let mut dispatched = 0;
        let mut cancelled = false;

        for (i, ip) in hosts.into_iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let pinger = self.pinger.clone();
            let responded = responded.clone();
            let completed = completed.clone();
            let timeout = self.ping_timeout;
            tokio::spawn(async move {
                if let Some(rtt) = pinger.ping(ip, timeout, &ECHO_PAYLOAD).await {
                    trace!(ip = %ip, rtt_ms = rtt.as_millis() as u64, "Echo reply");
                    if let Ok(mut set) = responded.lock() {
                        set.insert(ip);
                    }
                }
                completed.fetch_add(1, Ordering::SeqCst);
            });
            dispatched += 1;

            if self.options.batch_size > 0 && (i + 1) % self.options.batch_size == 0 {
                report(&mut reported);
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.options.batch_pause) => {}
                }
            }
        }

        let wait_until = Instant::now() + deadline;
        while !cancelled {
            report(&mut reported);
            if completed.load(Ordering::SeqCst) >= dispatched {
                break;
            }
            if Instant::now() >= wait_until {
                debug!(
                    completed = completed.load(Ordering::SeqCst),
                    dispatched = dispatched,
                    "Sweep deadline reached with probes outstanding"
                );
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => cancelled = true,
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }

        let done = completed.load(Ordering::SeqCst).min(total);
        if cancelled {
            report(&mut reported);
        } else if reported < total {
            // Stragglers past the deadline count as silent
            on_progress(ProgressReport::new(ScanPhase::Sweep, total, total));
        }

        let responded = responded
            .lock()
            .map(|set| set.clone())
            .unwrap_or_default();

        info!(
            responded = responded.len(),
            completed = done,
            total = total,
            cancelled = cancelled,
            "Liveness sweep finished"
        );

        LivenessResult {
            responded,
            total,
            dispatched,
            completed: done,
            cancelled,
        }
    }
}
