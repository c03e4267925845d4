use crate::rows::{self, HOST_COLUMNS, RANGE_COLUMNS, SCAN_COLUMNS, SERVICE_COLUMNS};
use crate::Db;
use anyhow::Result;
use netsweep_core::{DiscoveredHost, LiveWebService, NetworkRange, ScanId, ScanRun};
use rusqlite::{params, OptionalExtension};

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let cnt: i64 = self.conn()?.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    pub fn scan(&self, scan_id: &ScanId) -> Result<Option<ScanRun>> {
        let sql = format!("SELECT {SCAN_COLUMNS} FROM scan_runs WHERE scan_id=?");
        let run = self.conn()?.query_row(&sql, [scan_id.to_string()], rows::scan_run).optional()?;
        Ok(run)
    }

    pub fn scans_for_target(&self, target_id: &str) -> Result<Vec<ScanRun>> {
        let sql = format!("SELECT {SCAN_COLUMNS} FROM scan_runs WHERE target_id=? ORDER BY created_at_ms DESC, scan_id DESC");
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let runs = stmt.query_map([target_id], rows::scan_run)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    pub fn discovered_hosts(&self, scan_id: &ScanId) -> Result<Vec<DiscoveredHost>> {
        let sql = format!("SELECT {HOST_COLUMNS} FROM discovered_hosts WHERE scan_id=?");
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut hosts = stmt.query_map([scan_id.to_string()], rows::discovered_host)?.collect::<rusqlite::Result<Vec<_>>>()?;
        hosts.sort_by_key(|h| h.ip_address);
        Ok(hosts)
    }

    pub fn live_web_services(&self, scan_id: &ScanId) -> Result<Vec<LiveWebService>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM live_web_services WHERE scan_id=?");
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut services = stmt.query_map(params![scan_id.to_string()], rows::live_web_service)?.collect::<rusqlite::Result<Vec<_>>>()?;
        services.sort_by_key(|s| (s.ip_address, s.port, s.protocol.as_str()));
        Ok(services)
    }

    pub fn network_ranges(&self, target_id: &str) -> Result<Vec<NetworkRange>> {
        let sql = format!("SELECT {RANGE_COLUMNS} FROM network_ranges WHERE target_id=? ORDER BY cidr_block ASC");
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let ranges = stmt.query_map([target_id], rows::network_range)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ranges)
    }
}
