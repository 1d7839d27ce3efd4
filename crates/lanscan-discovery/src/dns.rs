//! Reverse DNS through the system resolver (`getent hosts`)
//!
//! Going through `getent` honors nsswitch, so `/etc/hosts`, mDNS and the
//! configured DNS servers are all consulted the same way other tools do.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::process::Command;
use tracing::trace;

use crate::capability::ReverseResolver;

/// Upper bound for a single lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReverseResolver for SystemResolver {
    async fn reverse_lookup(&self, ip: Ipv4Addr) -> Option<String> {
        let mut command = Command::new("getent");
        command.args(["hosts", &ip.to_string()]).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                trace!(ip = %ip, error = %e, "Failed to run getent");
                return None;
            }
            Err(_) => {
                trace!(ip = %ip, "Reverse lookup timed out");
                return None;
            }
        };

        // Exit code 2: key not found. Not every address has a name.
        if !output.status.success() {
            return None;
        }

        parse_getent_hosts(&String::from_utf8_lossy(&output.stdout), ip)
    }
}

/// Take the canonical name from `getent hosts` output
/// Format: "192.168.1.1     router.lan router"
fn parse_getent_hosts(output: &str, ip: Ipv4Addr) -> Option<String> {
    output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let addr: Ipv4Addr = parts.next()?.parse().ok()?;
        if addr != ip {
            return None;
        }
        let name = parts.next()?.trim_end_matches('.');
        if name.is_empty() || name == ip.to_string() {
            None
        } else {
            Some(name.to_string())
        }
    })
}
