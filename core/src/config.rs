use crate::error::ConfigError;
use crate::ports;
use serde::Deserialize;
use std::time::Duration;

/// Tunables for one scan run. Every field may be omitted from a config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    /// Addresses probed per network range after expansion.
    pub max_ips_per_range: usize,
    /// Upper bound on the size of a single CIDR expansion.
    pub enumerator_cap: usize,
    /// Simultaneous liveness probes across all ranges.
    pub max_concurrent_ips: usize,
    /// Live hosts port-scanned in parallel.
    pub max_concurrent_hosts: usize,
    /// Simultaneous port probes against one host.
    pub max_concurrent_ports: usize,
    pub host_probe_timeout_ms: u64,
    pub port_scan_timeout_ms: u64,
    pub web_service_timeout_ms: u64,
    pub dns_timeout_ms: u64,
    pub dns_dial_timeout_ms: u64,
    pub resolve_hostnames: bool,
    pub discovery_ports: Vec<u16>,
    pub web_ports: Vec<u16>,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            max_ips_per_range: 254,
            enumerator_cap: 65_536,
            max_concurrent_ips: 50,
            max_concurrent_hosts: 20,
            max_concurrent_ports: 10,
            host_probe_timeout_ms: 1_000,
            port_scan_timeout_ms: 1_000,
            web_service_timeout_ms: 5_000,
            dns_timeout_ms: 3_000,
            dns_dial_timeout_ms: 2_000,
            resolve_hostnames: true,
            discovery_ports: ports::default_discovery_ports(),
            web_ports: ports::default_web_ports(),
            max_redirects: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

impl ScanConfig {
    pub fn host_probe_timeout(&self) -> Duration { Duration::from_millis(self.host_probe_timeout_ms) }
    pub fn port_scan_timeout(&self) -> Duration { Duration::from_millis(self.port_scan_timeout_ms) }
    pub fn web_service_timeout(&self) -> Duration { Duration::from_millis(self.web_service_timeout_ms) }
    pub fn dns_timeout(&self) -> Duration { Duration::from_millis(self.dns_timeout_ms) }
    pub fn dns_dial_timeout(&self) -> Duration { Duration::from_millis(self.dns_dial_timeout_ms) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("max_ips_per_range", self.max_ips_per_range),
            ("enumerator_cap", self.enumerator_cap),
            ("max_concurrent_ips", self.max_concurrent_ips),
            ("max_concurrent_hosts", self.max_concurrent_hosts),
            ("max_concurrent_ports", self.max_concurrent_ports),
        ];
        for (name, v) in counts {
            if v == 0 { return Err(ConfigError::Zero(name)); }
        }
        let timeouts = [
            ("host_probe_timeout_ms", self.host_probe_timeout_ms),
            ("port_scan_timeout_ms", self.port_scan_timeout_ms),
            ("web_service_timeout_ms", self.web_service_timeout_ms),
            ("dns_timeout_ms", self.dns_timeout_ms),
            ("dns_dial_timeout_ms", self.dns_dial_timeout_ms),
        ];
        for (name, v) in timeouts {
            if v == 0 { return Err(ConfigError::Zero(name)); }
        }
        if self.discovery_ports.is_empty() { return Err(ConfigError::NoPorts("discovery_ports")); }
        if self.web_ports.is_empty() { return Err(ConfigError::NoPorts("web_ports")); }
        Ok(())
    }
}
