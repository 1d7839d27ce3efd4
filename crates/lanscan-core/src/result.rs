//! Per-host scan results

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// A 48-bit hardware (MAC) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// All-zero addresses show up in neighbor tables for unresolved entries
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid hardware address: {0}")]
pub struct ParseMacError(String);

impl FromStr for MacAddress {
    type Err = ParseMacError;

    /// Parse `aa:bb:cc:dd:ee:ff` (or dash separated, as printed on some platforms)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| ParseMacError(s.to_string()))?;
            if part.is_empty() || part.len() > 2 {
                return Err(ParseMacError(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| ParseMacError(s.to_string()))?;
        }

        if parts.next().is_some() {
            return Err(ParseMacError(s.to_string()));
        }

        Ok(Self(octets))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of the TCP service probe on the scanned port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PortStatus {
    /// A connection was established (and closed again)
    Available,
    /// The connection was refused or timed out
    Failed,
    /// The probe did not run to completion
    #[default]
    Unknown,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Available => write!(f, "Available"),
            PortStatus::Failed => write!(f, "Failed"),
            PortStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Everything learned about a single host during enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub address: Ipv4Addr,
    pub port: u16,
    /// ICMP round-trip time
    #[serde(serialize_with = "serialize_latency")]
    pub latency: Option<Duration>,
    pub hardware_address: Option<MacAddress>,
    pub host_name: Option<String>,
    pub port_status: PortStatus,
}

impl ScanResult {
    /// Create an empty result: no facts, port status unknown
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self {
            address,
            port,
            latency: None,
            hardware_address: None,
            host_name: None,
            port_status: PortStatus::Unknown,
        }
    }

    /// Whether this host is worth reporting
    pub fn has_data(&self) -> bool {
        self.latency.is_some()
            || self.hardware_address.is_some()
            || self.host_name.is_some()
            || self.port_status == PortStatus::Available
    }

    /// Latency rendered the way operators read it, e.g. `37ms`
    pub fn latency_text(&self) -> Option<String> {
        self.latency.map(format_latency)
    }
}

fn format_latency(latency: Duration) -> String {
    format!("{}ms", latency.as_millis())
}

fn serialize_latency<S: Serializer>(
    latency: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match latency {
        Some(latency) => serializer.serialize_some(&format_latency(*latency)),
        None => serializer.serialize_none(),
    }
}
