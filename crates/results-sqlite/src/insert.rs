use crate::Db;
use anyhow::{bail, Result};
use netsweep_core::{DiscoveredHost, LiveWebService, NetworkRange, ScanCounters, ScanId, ScanRun, ScanStatus};
use rusqlite::params;

impl Db {
    pub fn create_scan(&self, run: &ScanRun) -> Result<()> {
        let c = &run.counters;
        self.conn()?.execute(
            "INSERT INTO scan_runs(scan_id, target_id, status, total_network_ranges, processed_network_ranges, total_ips_discovered, total_ports_scanned, live_web_servers_found, error_message, execution_time_ms, created_at_ms, session_id)
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?)",
            params![
                run.scan_id.to_string(), run.target_id, run.status.as_str(),
                c.total_network_ranges, c.processed_network_ranges, c.total_ips_discovered, c.total_ports_scanned, c.live_web_servers_found,
                run.error_message, run.execution_time_ms, run.created_at_ms, run.session_id,
            ],
        )?;
        Ok(())
    }

    pub fn update_progress(&self, scan_id: &ScanId, status: ScanStatus, c: &ScanCounters) -> Result<()> {
        let n = self.conn()?.execute(
            "UPDATE scan_runs SET status=?, total_network_ranges=?, processed_network_ranges=?, total_ips_discovered=?, total_ports_scanned=?, live_web_servers_found=? WHERE scan_id=?",
            params![status.as_str(), c.total_network_ranges, c.processed_network_ranges, c.total_ips_discovered, c.total_ports_scanned, c.live_web_servers_found, scan_id.to_string()],
        )?;
        if n == 0 { bail!("unknown scan: {scan_id}"); }
        Ok(())
    }

    pub fn mark_failed(&self, scan_id: &ScanId, message: &str) -> Result<()> {
        let n = self.conn()?.execute(
            "UPDATE scan_runs SET status='error', error_message=? WHERE scan_id=?",
            params![message, scan_id.to_string()],
        )?;
        if n == 0 { bail!("unknown scan: {scan_id}"); }
        Ok(())
    }

    pub fn record_duration(&self, scan_id: &ScanId, execution_time_ms: i64) -> Result<()> {
        self.conn()?.execute(
            "UPDATE scan_runs SET execution_time_ms=? WHERE scan_id=?",
            params![execution_time_ms, scan_id.to_string()],
        )?;
        Ok(())
    }

    pub fn insert_discovered_host(&self, h: &DiscoveredHost) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO discovered_hosts(scan_id, ip_address, hostname, network_range, latency_ms, discovered_at_ms) VALUES (?,?,?,?,?,?)
             ON CONFLICT(scan_id, ip_address) DO NOTHING",
            params![h.scan_id.to_string(), h.ip_address.to_string(), h.hostname, h.network_range, h.latency_ms, h.discovered_at_ms],
        )?;
        Ok(())
    }

    pub fn upsert_live_web_service(&self, s: &LiveWebService) -> Result<()> {
        let tech_json = serde_json::to_string(&s.technologies)?;
        self.conn()?.execute(
            "INSERT INTO live_web_services(scan_id, ip_address, hostname, port, protocol, url, status_code, title, server_header, content_length, technologies_json, response_time_ms, last_checked_ms)
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?)
             ON CONFLICT(scan_id, ip_address, port, protocol) DO UPDATE SET hostname=excluded.hostname, url=excluded.url, status_code=excluded.status_code, title=excluded.title, server_header=excluded.server_header, content_length=excluded.content_length, technologies_json=excluded.technologies_json, response_time_ms=excluded.response_time_ms, last_checked_ms=excluded.last_checked_ms",
            params![
                s.scan_id.to_string(), s.ip_address.to_string(), s.hostname, s.port, s.protocol.as_str(), s.url,
                s.status_code, s.title, s.server_header, s.content_length, tech_json, s.response_time_ms, s.last_checked_ms,
            ],
        )?;
        Ok(())
    }

    /// Insert a range for a target, refreshing its metadata if the CIDR is already listed.
    pub fn add_network_range(&self, target_id: &str, r: &NetworkRange) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO network_ranges(target_id, cidr_block, asn, organization, description, country, source) VALUES (?,?,?,?,?,?,?)
             ON CONFLICT(target_id, cidr_block) DO UPDATE SET asn=excluded.asn, organization=excluded.organization, description=excluded.description, country=excluded.country, source=excluded.source",
            params![target_id, r.cidr.trim(), r.asn, r.organization, r.description, r.country, r.source],
        )?;
        Ok(())
    }
}
