//! Curated port lists shared by discovery and the web port scan.

/// Ports tried, in order, when deciding whether a host is alive.
pub const DISCOVERY_PORTS: &[u16] = &[80, 443, 22, 21, 25, 53, 110, 995, 993, 143];

/// Ports checked on every live host for an HTTP(S) speaking service.
pub const WEB_PORTS: &[u16] = &[
    80, 443, 8080, 8443, 8000, 8001, 8008, 8888, 9000, 9001, 9080, 9443, 3000, 3001, 4000, 4001,
    5000, 5001, 7000, 7001, 10000, 10001, 8090, 8181, 8009, 8006, 8005, 8002, 8007, 8200, 8500,
    9090, 9200, 9300, 5432, 3306, 1433, 27017, 6379, 11211,
];

pub fn default_discovery_ports() -> Vec<u16> { DISCOVERY_PORTS.to_vec() }

pub fn default_web_ports() -> Vec<u16> { WEB_PORTS.to_vec() }
