//! Persistence ports. The orchestrator only ever talks to storage through these.

use crate::models::{DiscoveredHost, LiveWebService, NetworkRange, ScanCounters, ScanId, ScanRun, ScanStatus};
use anyhow::Result;

pub trait ScanStore: Send + Sync {
    fn create_scan(&self, run: &ScanRun) -> Result<()>;

    /// Write a status transition and all counters in one statement.
    fn update_progress(&self, scan_id: &ScanId, status: ScanStatus, counters: &ScanCounters) -> Result<()>;

    /// Move a scan to `error`. Counters are left as they are.
    fn mark_failed(&self, scan_id: &ScanId, message: &str) -> Result<()>;

    fn record_duration(&self, scan_id: &ScanId, execution_time_ms: i64) -> Result<()>;

    /// Insert a live host. A second insert for the same (scan, ip) is a no-op.
    fn insert_discovered_host(&self, host: &DiscoveredHost) -> Result<()>;

    /// Insert or replace the row keyed by (scan, ip, port, protocol).
    fn upsert_live_web_service(&self, service: &LiveWebService) -> Result<()>;

    fn scan(&self, scan_id: &ScanId) -> Result<Option<ScanRun>>;

    /// Newest first.
    fn scans_for_target(&self, target_id: &str) -> Result<Vec<ScanRun>>;

    fn discovered_hosts(&self, scan_id: &ScanId) -> Result<Vec<DiscoveredHost>>;

    fn live_web_services(&self, scan_id: &ScanId) -> Result<Vec<LiveWebService>>;
}

/// Supplies the already-consolidated network ranges of a target.
pub trait RangeSource: Send + Sync {
    fn network_ranges(&self, target_id: &str) -> Result<Vec<NetworkRange>>;
}
