use crate::Db;
use anyhow::Result;
use netsweep_core::{
    DiscoveredHost, LiveWebService, NetworkRange, RangeSource, ScanCounters, ScanId, ScanRun, ScanStatus, ScanStore,
};

impl ScanStore for Db {
    fn create_scan(&self, run: &ScanRun) -> Result<()> { Db::create_scan(self, run) }
    fn update_progress(&self, scan_id: &ScanId, status: ScanStatus, counters: &ScanCounters) -> Result<()> {
        Db::update_progress(self, scan_id, status, counters)
    }
    fn mark_failed(&self, scan_id: &ScanId, message: &str) -> Result<()> { Db::mark_failed(self, scan_id, message) }
    fn record_duration(&self, scan_id: &ScanId, execution_time_ms: i64) -> Result<()> {
        Db::record_duration(self, scan_id, execution_time_ms)
    }
    fn insert_discovered_host(&self, host: &DiscoveredHost) -> Result<()> { Db::insert_discovered_host(self, host) }
    fn upsert_live_web_service(&self, service: &LiveWebService) -> Result<()> {
        Db::upsert_live_web_service(self, service)
    }
    fn scan(&self, scan_id: &ScanId) -> Result<Option<ScanRun>> { Db::scan(self, scan_id) }
    fn scans_for_target(&self, target_id: &str) -> Result<Vec<ScanRun>> { Db::scans_for_target(self, target_id) }
    fn discovered_hosts(&self, scan_id: &ScanId) -> Result<Vec<DiscoveredHost>> { Db::discovered_hosts(self, scan_id) }
    fn live_web_services(&self, scan_id: &ScanId) -> Result<Vec<LiveWebService>> { Db::live_web_services(self, scan_id) }
}

impl RangeSource for Db {
    fn network_ranges(&self, target_id: &str) -> Result<Vec<NetworkRange>> { Db::network_ranges(self, target_id) }
}
