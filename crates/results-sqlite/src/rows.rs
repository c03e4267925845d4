//! Row <-> model mapping.

use netsweep_core::{DiscoveredHost, LiveWebService, NetworkRange, ScanCounters, ScanRun};
use rusqlite::types::Type;
use rusqlite::Row;
use std::str::FromStr;
use uuid::Uuid;

pub(crate) const SCAN_COLUMNS: &str = "scan_id, target_id, status, total_network_ranges, processed_network_ranges, \
     total_ips_discovered, total_ports_scanned, live_web_servers_found, error_message, execution_time_ms, \
     created_at_ms, session_id";

pub(crate) const HOST_COLUMNS: &str = "scan_id, ip_address, hostname, network_range, latency_ms, discovered_at_ms";

pub(crate) const SERVICE_COLUMNS: &str = "scan_id, ip_address, hostname, port, protocol, url, status_code, title, \
     server_header, content_length, technologies_json, response_time_ms, last_checked_ms";

pub(crate) const RANGE_COLUMNS: &str = "cidr_block, asn, organization, description, country, source";

fn parse_col<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn uuid_col(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn scan_run(row: &Row) -> rusqlite::Result<ScanRun> {
    Ok(ScanRun {
        scan_id: uuid_col(row, 0)?,
        target_id: row.get(1)?,
        status: parse_col(row, 2)?,
        counters: ScanCounters {
            total_network_ranges: row.get(3)?,
            processed_network_ranges: row.get(4)?,
            total_ips_discovered: row.get(5)?,
            total_ports_scanned: row.get(6)?,
            live_web_servers_found: row.get(7)?,
        },
        error_message: row.get(8)?,
        execution_time_ms: row.get(9)?,
        created_at_ms: row.get(10)?,
        session_id: row.get(11)?,
    })
}

pub(crate) fn discovered_host(row: &Row) -> rusqlite::Result<DiscoveredHost> {
    Ok(DiscoveredHost {
        scan_id: uuid_col(row, 0)?,
        ip_address: parse_col(row, 1)?,
        hostname: row.get(2)?,
        network_range: row.get(3)?,
        latency_ms: row.get(4)?,
        discovered_at_ms: row.get(5)?,
    })
}

pub(crate) fn live_web_service(row: &Row) -> rusqlite::Result<LiveWebService> {
    let tech_json: String = row.get(10)?;
    let technologies: Vec<String> = serde_json::from_str(&tech_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;
    Ok(LiveWebService {
        scan_id: uuid_col(row, 0)?,
        ip_address: parse_col(row, 1)?,
        hostname: row.get(2)?,
        port: row.get(3)?,
        protocol: parse_col(row, 4)?,
        url: row.get(5)?,
        status_code: row.get(6)?,
        title: row.get(7)?,
        server_header: row.get(8)?,
        content_length: row.get(9)?,
        technologies,
        response_time_ms: row.get(11)?,
        last_checked_ms: row.get(12)?,
    })
}

pub(crate) fn network_range(row: &Row) -> rusqlite::Result<NetworkRange> {
    Ok(NetworkRange {
        cidr: row.get(0)?,
        asn: row.get(1)?,
        organization: row.get(2)?,
        description: row.get(3)?,
        country: row.get(4)?,
        source: row.get(5)?,
    })
}
