//! Configuration loading

use anyhow::Result;
use lanscan_discovery::{Capabilities, ProbeTimeouts, ScanConfig, SweepOptions};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub sweep: SweepSettings,
    #[serde(default)]
    pub resolve: ResolveSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// TCP port probed on every live host
    #[serde(default = "default_port")]
    pub port: u16,
    /// Local address to scan from (default: adapter with the default gateway)
    #[serde(default)]
    pub local_address: Option<Ipv4Addr>,
    /// Subnet mask (default: the adapter's own)
    #[serde(default)]
    pub netmask: Option<Ipv4Addr>,
    /// Hosts enriched at the same time
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Refuse to scan subnets with more usable hosts than this
    #[serde(default = "default_max_hosts")]
    pub max_hosts: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            local_address: None,
            netmask: None,
            max_parallel: default_max_parallel(),
            max_hosts: default_max_hosts(),
        }
    }
}

fn default_port() -> u16 {
    lanscan_discovery::DEFAULT_PORT
}

fn default_max_parallel() -> usize {
    32
}

fn default_max_hosts() -> u64 {
    lanscan_discovery::DEFAULT_MAX_HOSTS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_ping_ms")]
    pub ping_ms: u64,
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,
    #[serde(default = "default_io_ms")]
    pub io_ms: u64,
    /// Wait for late echo replies after the sweep's last request, on top of `ping_ms`
    #[serde(default = "default_sweep_grace_ms")]
    pub sweep_grace_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            ping_ms: default_ping_ms(),
            connect_ms: default_connect_ms(),
            io_ms: default_io_ms(),
            sweep_grace_ms: default_sweep_grace_ms(),
        }
    }
}

fn default_ping_ms() -> u64 {
    5000
}

fn default_connect_ms() -> u64 {
    5000
}

fn default_io_ms() -> u64 {
    2000
}

fn default_sweep_grace_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Echo requests sent between pauses
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    16
}

fn default_batch_pause_ms() -> u64 {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveSettings {
    /// Neighbor table lookups per host before giving up on its MAC
    #[serde(default = "default_arp_attempts")]
    pub arp_attempts: u32,
    #[serde(default = "default_true")]
    pub reverse_dns: bool,
    #[serde(default = "default_true")]
    pub hardware: bool,
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            arp_attempts: default_arp_attempts(),
            reverse_dns: true,
            hardware: true,
        }
    }
}

fn default_arp_attempts() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Convert to the engine's ScanConfig
    pub fn to_scan_config(&self) -> ScanConfig {
        ScanConfig {
            port: self.scan.port,
            local_address: self.scan.local_address,
            netmask: self.scan.netmask,
            max_parallel: self.scan.max_parallel,
            max_hosts: self.scan.max_hosts,
            timeouts: ProbeTimeouts {
                ping: Duration::from_millis(self.timeouts.ping_ms),
                connect: Duration::from_millis(self.timeouts.connect_ms),
                io: Duration::from_millis(self.timeouts.io_ms),
            },
            sweep: SweepOptions {
                batch_size: self.sweep.batch_size,
                batch_pause: Duration::from_millis(self.sweep.batch_pause_ms),
                ..SweepOptions::default()
            },
            sweep_grace: Duration::from_millis(self.timeouts.sweep_grace_ms),
        }
    }

    /// System capabilities with the resolvers switched off as configured
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::system(self.resolve.arp_attempts);
        if !self.resolve.hardware {
            capabilities = capabilities.without_hardware();
        }
        if !self.resolve.reverse_dns {
            capabilities = capabilities.without_reverse_dns();
        }
        capabilities
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
