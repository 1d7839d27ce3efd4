//! Local adapter and subnet mask discovery

use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::process::Command;
use tracing::{debug, warn};

use crate::capability::{LocalAdapter, LocalNetwork};

/// Reads adapters from the OS and default routes from `ip route`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNetwork;

impl LocalNetwork for SystemNetwork {
    fn adapters(&self) -> Vec<LocalAdapter> {
        let interfaces = match NetworkInterface::show() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                warn!(error = %e, "Failed to list network interfaces");
                return Vec::new();
            }
        };

        let gateways = default_route_interfaces();
        let adapters = group_adapters(interfaces, &gateways);
        debug!("Found {} network adapters", adapters.len());
        adapters
    }

    fn subnet_mask(&self, ip: Ipv4Addr) -> Option<Ipv4Addr> {
        NetworkInterface::show()
            .unwrap_or_default()
            .into_iter()
            .flat_map(|iface| iface.addr)
            .find_map(|addr| match addr {
                Addr::V4(v4) if v4.ip == ip => v4.netmask,
                _ => None,
            })
    }
}

/// Merge per-address interface entries into one adapter per name, in OS order
fn group_adapters(
    interfaces: Vec<NetworkInterface>,
    gateways: &HashSet<String>,
) -> Vec<LocalAdapter> {
    let mut adapters: Vec<LocalAdapter> = Vec::new();

    for iface in interfaces {
        let addresses = iface.addr.iter().filter_map(|addr| match addr {
            Addr::V4(v4) if is_unicast(v4.ip) => Some(v4.ip),
            _ => None,
        });

        let idx = match adapters.iter().position(|a| a.name == iface.name) {
            Some(idx) => idx,
            None => {
                adapters.push(LocalAdapter {
                    name: iface.name.clone(),
                    gateway_present: gateways.contains(&iface.name),
                    addresses: Vec::new(),
                });
                adapters.len() - 1
            }
        };

        for ip in addresses {
            if !adapters[idx].addresses.contains(&ip) {
                adapters[idx].addresses.push(ip);
            }
        }
    }

    adapters
}

fn is_unicast(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_broadcast() || ip.is_multicast())
}

/// Names of the interfaces that carry a default route
fn default_route_interfaces() -> HashSet<String> {
    let output = match Command::new("ip")
        .args(["-4", "route", "show", "default"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Failed to read default routes"
            );
            return HashSet::new();
        }
        Err(e) => {
            debug!(error = %e, "ip route not available");
            return HashSet::new();
        }
    };

    parse_default_routes(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `ip route show default` output
/// Format: "default via 192.168.1.1 dev eth0 proto dhcp metric 100"
fn parse_default_routes(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter(|line| line.starts_with("default"))
        .filter(|line| line.split_whitespace().any(|p| p == "via"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let dev_idx = parts.iter().position(|&p| p == "dev")?;
            parts.get(dev_idx + 1).map(|s| s.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use network_interface::V4IfAddr;

    fn iface(name: &str, ips: &[Ipv4Addr]) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            addr: ips
                .iter()
                .map(|ip| {
                    Addr::V4(V4IfAddr {
                        ip: *ip,
                        broadcast: None,
                        netmask: Some(Ipv4Addr::new(255, 255, 255, 0)),
                    })
                })
                .collect(),
            mac_addr: None,
            index: 0,
            internal: false,
        }
    }

    #[test]
    fn test_parse_default_routes() {
        let output = "default via 192.168.1.1 dev wlan0 proto dhcp metric 600\n\
                      default via 10.0.0.1 dev eth0 proto static metric 100\n";
        let routes = parse_default_routes(output);
        assert_eq!(routes.len(), 2);
        assert!(routes.contains("wlan0"));
        assert!(routes.contains("eth0"));
    }

    #[test]
    fn test_parse_default_route_without_gateway() {
        let output = "default dev tun0 scope link\n";
        assert!(parse_default_routes(output).is_empty());
    }

    #[test]
    fn test_group_adapters_merges_by_name() {
        let gateways: HashSet<String> = ["eth0".to_string()].into_iter().collect();
        let interfaces = vec![
            iface("lo", &[Ipv4Addr::LOCALHOST]),
            iface("eth0", &[Ipv4Addr::new(192, 168, 1, 50)]),
            iface("eth0", &[Ipv4Addr::new(192, 168, 2, 50)]),
            iface("docker0", &[Ipv4Addr::new(172, 17, 0, 1)]),
        ];

        let adapters = group_adapters(interfaces, &gateways);
        assert_eq!(adapters.len(), 3);

        assert_eq!(adapters[0].name, "lo");
        assert!(adapters[0].addresses.is_empty());

        assert_eq!(adapters[1].name, "eth0");
        assert!(adapters[1].gateway_present);
        assert_eq!(
            adapters[1].addresses,
            vec![Ipv4Addr::new(192, 168, 1, 50), Ipv4Addr::new(192, 168, 2, 50)]
        );

        assert!(!adapters[2].gateway_present);
    }
}
