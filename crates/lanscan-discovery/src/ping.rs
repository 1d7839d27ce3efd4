//! ICMP echo through the system `ping` binary (iputils on Linux)
//!
//! Raw ICMP sockets need elevated privileges, the setuid/capability-enabled
//! `ping` does not.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tracing::{trace, warn};

use crate::capability::Pinger;

/// Smallest payload for which `ping` embeds a timestamp and prints `time=`
const MIN_TIMED_PAYLOAD: usize = 16;

const PING_PROGRAM: &str = "ping";

/// Pinger that shells out to `ping`
#[derive(Debug)]
pub struct SystemPinger {
    program: String,
    /// Set once a missing binary has been reported
    missing_reported: AtomicBool,
}

impl SystemPinger {
    pub fn new() -> Self {
        Self {
            program: PING_PROGRAM.to_string(),
            missing_reported: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            ..Self::new()
        }
    }

    /// Warn the first time `ping` cannot be started; returns whether this call warned.
    fn report_spawn_error(&self, ip: Ipv4Addr, error: &std::io::Error) -> bool {
        let unrecoverable = matches!(
            error.kind(),
            ErrorKind::NotFound | ErrorKind::PermissionDenied
        );
        if unrecoverable && !self.missing_reported.swap(true, Ordering::SeqCst) {
            warn!(
                program = %self.program,
                error = %error,
                "Cannot run ping, every host will look unreachable"
            );
            return true;
        }
        trace!(ip = %ip, error = %error, "Failed to run ping");
        false
    }

    fn command(&self, ip: Ipv4Addr, timeout: Duration, payload: &[u8]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(["-n", "-c", "1", "-W", &reply_wait_secs(timeout).to_string()]);
        command.args(payload_args(payload));
        command.arg(ip.to_string());
        command
    }
}

impl Default for SystemPinger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Pinger for SystemPinger {
    async fn ping(&self, ip: Ipv4Addr, timeout: Duration, payload: &[u8]) -> Option<Duration> {
        let mut command = self.command(ip, timeout, payload);
        command.kill_on_drop(true);

        // The configured timeout bounds the whole process, not just the reply wait
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                self.report_spawn_error(ip, &e);
                return None;
            }
            Err(_) => {
                trace!(ip = %ip, "ping process timed out");
                return None;
            }
        };

        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // Replies without a parsable time still prove the host answered
        Some(parse_round_trip(&stdout).unwrap_or(Duration::ZERO))
    }
}

/// `ping -W` takes whole seconds; round down so the reply wait fits inside
/// the process timeout, but never below one second
fn reply_wait_secs(timeout: Duration) -> u64 {
    timeout.as_secs().max(1)
}

/// `-s <size> -p <pattern>`: the payload bytes repeat to fill the packet
fn payload_args(payload: &[u8]) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }
    let pattern: String = payload
        .iter()
        .take(16)
        .map(|b| format!("{:02x}", b))
        .collect();
    vec![
        "-s".to_string(),
        payload.len().max(MIN_TIMED_PAYLOAD).to_string(),
        "-p".to_string(),
        pattern,
    ]
}

/// Extract the round-trip time from `ping` output (`time=0.512 ms`, `time<1ms`)
fn parse_round_trip(output: &str) -> Option<Duration> {
    let start = output.find("time=").or_else(|| output.find("time<"))? + "time=".len();
    let value: String = output[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let millis: f64 = value.parse().ok()?;
    if !millis.is_finite() || millis < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(millis / 1000.0))
}
