use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

pub type ScanId = Uuid;

/// A CIDR block attributed to a target by the upstream range collectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRange {
    pub cidr: String,
    pub asn: Option<String>,
    pub organization: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub source: Option<String>,
}

impl NetworkRange {
    pub fn new(cidr: impl Into<String>) -> Self {
        NetworkRange { cidr: cidr.into(), asn: None, organization: None, description: None, country: None, source: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    DiscoveringIps,
    PortScanning,
    Success,
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::DiscoveringIps => "discovering_ips",
            ScanStatus::PortScanning => "port_scanning",
            ScanStatus::Success => "success",
            ScanStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Success | ScanStatus::Error)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ScanStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "pending" => ScanStatus::Pending,
            "discovering_ips" => ScanStatus::DiscoveringIps,
            "port_scanning" => ScanStatus::PortScanning,
            "success" => ScanStatus::Success,
            "error" => ScanStatus::Error,
            other => anyhow::bail!("unknown scan status: {other}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => anyhow::bail!("unknown protocol: {other}"),
        }
    }
}

/// Counters written together with a status transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounters {
    pub total_network_ranges: u32,
    pub processed_network_ranges: u32,
    pub total_ips_discovered: u32,
    pub total_ports_scanned: u32,
    pub live_web_servers_found: u32,
}

/// One discovery execution for a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRun {
    pub scan_id: ScanId,
    pub target_id: String,
    pub status: ScanStatus,
    #[serde(flatten)]
    pub counters: ScanCounters,
    pub error_message: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub created_at_ms: i64,
    pub session_id: Option<String>,
}

impl ScanRun {
    pub fn pending(target_id: impl Into<String>, session_id: Option<String>, created_at_ms: i64) -> Self {
        ScanRun {
            scan_id: Uuid::now_v7(),
            target_id: target_id.into(),
            status: ScanStatus::Pending,
            counters: ScanCounters::default(),
            error_message: None,
            execution_time_ms: None,
            created_at_ms,
            session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredHost {
    pub scan_id: ScanId,
    pub ip_address: IpAddr,
    pub hostname: Option<String>,
    pub network_range: String,
    pub latency_ms: Option<f64>,
    pub discovered_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveWebService {
    pub scan_id: ScanId,
    pub ip_address: IpAddr,
    pub hostname: Option<String>,
    pub port: u16,
    pub protocol: Protocol,
    pub url: String,
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub server_header: Option<String>,
    pub content_length: Option<i64>,
    pub technologies: Vec<String>,
    pub response_time_ms: Option<f64>,
    pub last_checked_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for s in [ScanStatus::Pending, ScanStatus::DiscoveringIps, ScanStatus::PortScanning, ScanStatus::Success, ScanStatus::Error] {
            assert_eq!(s.as_str().parse::<ScanStatus>().unwrap(), s);
        }
        assert!("done".parse::<ScanStatus>().is_err());
    }

    #[test]
    fn only_success_and_error_are_terminal() {
        assert!(ScanStatus::Success.is_terminal());
        assert!(ScanStatus::Error.is_terminal());
        assert!(!ScanStatus::PortScanning.is_terminal());
    }

    #[test]
    fn pending_run_starts_at_zero() {
        let run = ScanRun::pending("target-1", None, 42);
        assert_eq!(run.status, ScanStatus::Pending);
        assert_eq!(run.counters, ScanCounters::default());
        assert_eq!(run.created_at_ms, 42);
    }
}
