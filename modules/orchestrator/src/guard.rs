use anyhow::Result;
use netsweep_core::{ScanCounters, ScanId, ScanStatus, ScanStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

pub(crate) const ABORTED_MESSAGE: &str = "scan stopped before reaching a final status";

/// Owns the terminal write of one scan run. Whatever path leaves `run_scan`,
/// the row ends in `success` or `error`.
pub(crate) struct FinalizeGuard {
    store: Arc<dyn ScanStore>,
    scan_id: ScanId,
    started: Instant,
    finalized: bool,
}

impl FinalizeGuard {
    pub(crate) fn new(store: Arc<dyn ScanStore>, scan_id: ScanId) -> Self {
        FinalizeGuard { store, scan_id, started: Instant::now(), finalized: false }
    }

    pub(crate) fn elapsed_ms(&self) -> i64 {
        self.started.elapsed().as_millis() as i64
    }

    /// Record `success` with the final counters and the run duration.
    /// On a store failure the guard stays armed and falls back to `error` on drop.
    pub(crate) fn succeed(mut self, counters: &ScanCounters) -> Result<()> {
        self.store.update_progress(&self.scan_id, ScanStatus::Success, counters)?;
        self.finalized = true;
        self.write_duration();
        Ok(())
    }

    pub(crate) fn fail(mut self, message: &str) {
        self.write_failure(message);
    }

    fn write_failure(&mut self, message: &str) {
        if let Err(e) = self.store.mark_failed(&self.scan_id, message) {
            error!(scan_id = %self.scan_id, error = %e, "could not record scan failure");
        }
        self.finalized = true;
        self.write_duration();
    }

    fn write_duration(&self) {
        if let Err(e) = self.store.record_duration(&self.scan_id, self.elapsed_ms()) {
            warn!(scan_id = %self.scan_id, error = %e, "could not record scan duration");
        }
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if !self.finalized {
            error!(scan_id = %self.scan_id, "scan ended without a final status");
            self.write_failure(ABORTED_MESSAGE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsweep_core::{DiscoveredHost, LiveWebService, ScanRun};
    use std::sync::Mutex;

    /// Records status writes; optionally refuses `success`.
    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<(ScanStatus, Option<String>)>>,
        durations: Mutex<Vec<i64>>,
        reject_success: bool,
    }

    impl ScanStore for Recorder {
        fn create_scan(&self, _: &ScanRun) -> Result<()> { Ok(()) }
        fn update_progress(&self, _: &ScanId, status: ScanStatus, _: &ScanCounters) -> Result<()> {
            if self.reject_success && status == ScanStatus::Success {
                anyhow::bail!("read-only");
            }
            self.writes.lock().unwrap().push((status, None));
            Ok(())
        }
        fn mark_failed(&self, _: &ScanId, message: &str) -> Result<()> {
            self.writes.lock().unwrap().push((ScanStatus::Error, Some(message.to_string())));
            Ok(())
        }
        fn record_duration(&self, _: &ScanId, ms: i64) -> Result<()> {
            self.durations.lock().unwrap().push(ms);
            Ok(())
        }
        fn insert_discovered_host(&self, _: &DiscoveredHost) -> Result<()> { Ok(()) }
        fn upsert_live_web_service(&self, _: &LiveWebService) -> Result<()> { Ok(()) }
        fn scan(&self, _: &ScanId) -> Result<Option<ScanRun>> { Ok(None) }
        fn scans_for_target(&self, _: &str) -> Result<Vec<ScanRun>> { Ok(vec![]) }
        fn discovered_hosts(&self, _: &ScanId) -> Result<Vec<DiscoveredHost>> { Ok(vec![]) }
        fn live_web_services(&self, _: &ScanId) -> Result<Vec<LiveWebService>> { Ok(vec![]) }
    }

    fn guard(rec: &Arc<Recorder>) -> FinalizeGuard {
        FinalizeGuard::new(rec.clone(), ScanId::nil())
    }

    #[test]
    fn success_is_written_once() {
        let rec = Arc::new(Recorder::default());
        guard(&rec).succeed(&ScanCounters::default()).unwrap();
        assert_eq!(*rec.writes.lock().unwrap(), vec![(ScanStatus::Success, None)]);
        assert_eq!(rec.durations.lock().unwrap().len(), 1);
    }

    #[test]
    fn failure_keeps_message() {
        let rec = Arc::new(Recorder::default());
        guard(&rec).fail("no ranges");
        assert_eq!(*rec.writes.lock().unwrap(), vec![(ScanStatus::Error, Some("no ranges".to_string()))]);
    }

    #[test]
    fn dropping_unfinished_guard_writes_error() {
        let rec = Arc::new(Recorder::default());
        drop(guard(&rec));
        assert_eq!(*rec.writes.lock().unwrap(), vec![(ScanStatus::Error, Some(ABORTED_MESSAGE.to_string()))]);
    }

    #[test]
    fn rejected_success_falls_back_to_error() {
        let rec = Arc::new(Recorder { reject_success: true, ..Default::default() });
        assert!(guard(&rec).succeed(&ScanCounters::default()).is_err());
        let writes = rec.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, ScanStatus::Error);
    }
}
