//! Hardware address resolution through the kernel neighbor (ARP) table

use anyhow::Result;
use async_trait::async_trait;
use lanscan_core::MacAddress;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::capability::HardwareResolver;

/// Discard service; any datagram to it makes the kernel resolve the neighbor
const NUDGE_PORT: u16 = 9;

/// Pause between resolution attempts, gives the ARP exchange time to finish
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// ARP table entry
#[derive(Debug, Clone)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: Option<MacAddress>,
    pub interface: String,
    pub state: ArpState,
}

/// ARP entry state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpState {
    Reachable,
    Stale,
    Delay,
    Probe,
    Failed,
    Incomplete,
    Permanent,
    Noarp,
    Unknown,
}

impl ArpState {
    /// Whether an entry in this state carries a hardware address worth reporting
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            ArpState::Reachable
                | ArpState::Stale
                | ArpState::Delay
                | ArpState::Probe
                | ArpState::Permanent
        )
    }
}

impl ArpEntry {
    /// The hardware address, if the entry is resolved and non-zero
    pub fn resolved_mac(&self) -> Option<MacAddress> {
        self.mac
            .filter(|mac| !mac.is_zero())
            .filter(|_| self.state.is_resolved())
    }
}

/// Resolves hardware addresses by reading `ip neigh`
pub struct NeighborTable {
    attempts: u32,
}

impl NeighborTable {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }
}

#[async_trait]
impl HardwareResolver for NeighborTable {
    async fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddress> {
        for attempt in 0..self.attempts {
            match lookup_neighbor(ip).await {
                Ok(Some(entry)) => {
                    if let Some(mac) = entry.resolved_mac() {
                        trace!(ip = %ip, mac = %mac, state = ?entry.state, "Found neighbor entry");
                        return Some(mac);
                    }
                    trace!(ip = %ip, state = ?entry.state, "Neighbor entry not resolved");
                }
                Ok(None) => trace!(ip = %ip, attempt = attempt, "No neighbor entry"),
                Err(e) => {
                    debug!(ip = %ip, error = %e, "Failed to read neighbor table");
                    return None;
                }
            }

            if attempt + 1 < self.attempts {
                nudge(ip).await;
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
        None
    }
}

/// Send an empty datagram so the kernel starts an ARP exchange for `ip`
async fn nudge(ip: Ipv4Addr) {
    if let Ok(socket) = UdpSocket::bind("0.0.0.0:0").await {
        let _ = socket.send_to(&[], (ip, NUDGE_PORT)).await;
    }
}

/// Read the neighbor table entry for one address
async fn lookup_neighbor(ip: Ipv4Addr) -> Result<Option<ArpEntry>> {
    let output = Command::new("ip")
        .args(["-4", "neigh", "show", &ip.to_string()])
        .output()
        .await?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to get ARP table: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter_map(parse_ip_neigh_line)
        .find(|entry| entry.ip == ip))
}

/// Parse a line from `ip neigh show` output
fn parse_ip_neigh_line(line: &str) -> Option<ArpEntry> {
    // Format: "192.168.1.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE"
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() < 4 {
        return None;
    }

    let ip = Ipv4Addr::from_str(parts[0]).ok()?;

    let dev_idx = parts.iter().position(|&p| p == "dev")?;
    let lladdr_idx = parts.iter().position(|&p| p == "lladdr");

    if dev_idx + 1 >= parts.len() {
        return None;
    }

    let interface = parts[dev_idx + 1].to_string();

    // MAC might not be present for INCOMPLETE entries
    let mac = lladdr_idx
        .and_then(|idx| parts.get(idx + 1))
        .and_then(|s| MacAddress::from_str(s).ok());

    let state = parts
        .last()
        .map(|s| parse_arp_state(s))
        .unwrap_or(ArpState::Unknown);

    Some(ArpEntry {
        ip,
        mac,
        interface,
        state,
    })
}

/// Parse ARP state string
fn parse_arp_state(s: &str) -> ArpState {
    match s.to_uppercase().as_str() {
        "REACHABLE" => ArpState::Reachable,
        "STALE" => ArpState::Stale,
        "DELAY" => ArpState::Delay,
        "PROBE" => ArpState::Probe,
        "FAILED" => ArpState::Failed,
        "INCOMPLETE" => ArpState::Incomplete,
        "PERMANENT" => ArpState::Permanent,
        "NOARP" => ArpState::Noarp,
        _ => ArpState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip_neigh_line_reachable() {
        let line = "192.168.1.100 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE";
        let entry = parse_ip_neigh_line(line).unwrap();
        assert_eq!(entry.ip, Ipv4Addr::new(192, 168, 1, 100));
        assert_eq!(
            entry.mac,
            Some(MacAddress([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]))
        );
        assert_eq!(entry.interface, "eth0");
        assert_eq!(entry.state, ArpState::Reachable);
        assert!(entry.resolved_mac().is_some());
    }

    #[test]
    fn test_parse_ip_neigh_line_stale() {
        let line = "192.168.1.100 dev eth0 lladdr aa:bb:cc:dd:ee:ff STALE";
        let entry = parse_ip_neigh_line(line).unwrap();
        assert_eq!(entry.state, ArpState::Stale);
        assert!(entry.resolved_mac().is_some());
    }

    #[test]
    fn test_parse_router_flag() {
        let line = "192.168.1.1 dev wlan0 lladdr 00:11:22:33:44:55 router REACHABLE";
        let entry = parse_ip_neigh_line(line).unwrap();
        assert_eq!(entry.interface, "wlan0");
        assert_eq!(entry.state, ArpState::Reachable);
        assert_eq!(
            entry.resolved_mac().map(|m| m.to_string()).as_deref(),
            Some("00:11:22:33:44:55")
        );
    }

    #[test]
    fn test_parse_incomplete_line() {
        let line = "192.168.1.100 dev eth0 INCOMPLETE";
        let entry = parse_ip_neigh_line(line).unwrap();
        assert_eq!(entry.ip, Ipv4Addr::new(192, 168, 1, 100));
        assert_eq!(entry.mac, None);
        assert_eq!(entry.state, ArpState::Incomplete);
        assert!(entry.resolved_mac().is_none());
    }

    #[test]
    fn test_failed_entry_is_not_resolved() {
        let line = "192.168.1.7 dev eth0 lladdr aa:bb:cc:dd:ee:ff FAILED";
        let entry = parse_ip_neigh_line(line).unwrap();
        assert!(entry.resolved_mac().is_none());
    }

    #[test]
    fn test_zero_mac_is_not_resolved() {
        let line = "192.168.1.7 dev eth0 lladdr 00:00:00:00:00:00 PERMANENT";
        let entry = parse_ip_neigh_line(line).unwrap();
        assert!(entry.resolved_mac().is_none());
    }

    #[test]
    fn test_parse_too_short() {
        let line = "192.168.1.100 dev";
        assert!(parse_ip_neigh_line(line).is_none());
    }

    #[test]
    fn test_parse_ipv6_line_ignored() {
        let line = "fe80::1 dev eth0 lladdr aa:bb:cc:dd:ee:ff router STALE";
        assert!(parse_ip_neigh_line(line).is_none());
    }

    #[test]
    fn test_neighbor_table_clamps_attempts() {
        assert_eq!(NeighborTable::new(0).attempts, 1);
        assert_eq!(NeighborTable::new(3).attempts, 3);
    }
}
