//! SQLite persistence for scan runs, discovered hosts, live web services and network ranges.

mod insert;
mod open;
mod query;
mod rows;
mod schema;
mod store_impl;

pub use open::Db;

#[cfg(test)]
mod tests {
    use super::*;
    use netsweep_core::{DiscoveredHost, LiveWebService, NetworkRange, Protocol, RangeSource, ScanCounters, ScanRun, ScanStatus, ScanStore};
    use std::net::IpAddr;
    use uuid::Uuid;

    fn db_with_scan(target: &str, created_at_ms: i64) -> (Db, ScanRun) {
        let db = Db::open_in_memory().unwrap();
        let run = ScanRun::pending(target, None, created_at_ms);
        db.create_scan(&run).unwrap();
        (db, run)
    }

    fn service(scan: &ScanRun, title: &str, checked: i64) -> LiveWebService {
        LiveWebService {
            scan_id: scan.scan_id,
            ip_address: "203.0.113.2".parse().unwrap(),
            hostname: None,
            port: 80,
            protocol: Protocol::Http,
            url: "http://203.0.113.2:80".into(),
            status_code: Some(200),
            title: Some(title.into()),
            server_header: Some("nginx".into()),
            content_length: Some(12),
            technologies: vec!["nginx".into()],
            response_time_ms: Some(1.5),
            last_checked_ms: checked,
        }
    }

    #[test]
    fn schema_is_created() {
        let db = Db::open_in_memory().unwrap();
        for t in ["scan_runs", "discovered_hosts", "live_web_services", "network_ranges"] {
            assert!(db.table_exists(t).unwrap(), "{t}");
        }
    }

    #[test]
    fn scan_roundtrips_through_progress_updates() {
        let (db, run) = db_with_scan("t1", 1_000);
        let counters = ScanCounters { total_network_ranges: 2, processed_network_ranges: 2, total_ips_discovered: 5, ..Default::default() };
        db.update_progress(&run.scan_id, ScanStatus::PortScanning, &counters).unwrap();
        let got = db.scan(&run.scan_id).unwrap().unwrap();
        assert_eq!(got.status, ScanStatus::PortScanning);
        assert_eq!(got.counters, counters);
        assert_eq!(got.target_id, "t1");
        assert_eq!(got.created_at_ms, 1_000);
        assert!(db.scan(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn progress_for_unknown_scan_fails() {
        let db = Db::open_in_memory().unwrap();
        assert!(db.update_progress(&Uuid::new_v4(), ScanStatus::Success, &ScanCounters::default()).is_err());
    }

    #[test]
    fn mark_failed_keeps_counters() {
        let (db, run) = db_with_scan("t1", 1_000);
        let counters = ScanCounters { total_network_ranges: 3, ..Default::default() };
        db.update_progress(&run.scan_id, ScanStatus::DiscoveringIps, &counters).unwrap();
        db.mark_failed(&run.scan_id, "boom").unwrap();
        db.record_duration(&run.scan_id, 42).unwrap();
        let got = db.scan(&run.scan_id).unwrap().unwrap();
        assert_eq!(got.status, ScanStatus::Error);
        assert_eq!(got.error_message.as_deref(), Some("boom"));
        assert_eq!(got.counters.total_network_ranges, 3);
        assert_eq!(got.execution_time_ms, Some(42));
    }

    #[test]
    fn scans_for_target_are_newest_first() {
        let (db, older) = db_with_scan("t1", 1_000);
        let newer = ScanRun::pending("t1", Some("s-1".into()), 2_000);
        db.create_scan(&newer).unwrap();
        db.create_scan(&ScanRun::pending("other", None, 3_000)).unwrap();
        let ids: Vec<_> = db.scans_for_target("t1").unwrap().into_iter().map(|r| r.scan_id).collect();
        assert_eq!(ids, vec![newer.scan_id, older.scan_id]);
        assert_eq!(db.scan(&newer.scan_id).unwrap().unwrap().session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn duplicate_host_insert_is_ignored() {
        let (db, run) = db_with_scan("t1", 1_000);
        let mut host = DiscoveredHost {
            scan_id: run.scan_id,
            ip_address: "10.0.0.9".parse().unwrap(),
            hostname: Some("a.example".into()),
            network_range: "10.0.0.0/24".into(),
            latency_ms: Some(0.7),
            discovered_at_ms: 5,
        };
        db.insert_discovered_host(&host).unwrap();
        host.hostname = Some("b.example".into());
        db.insert_discovered_host(&host).unwrap();
        let other = DiscoveredHost { ip_address: "10.0.0.2".parse().unwrap(), hostname: None, ..host.clone() };
        db.insert_discovered_host(&other).unwrap();

        let hosts = db.discovered_hosts(&run.scan_id).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].ip_address, "10.0.0.2".parse::<IpAddr>().unwrap());
        assert_eq!(hosts[1].hostname.as_deref(), Some("a.example"));
    }

    #[test]
    fn web_service_upsert_keeps_one_row_with_latest_values() {
        let (db, run) = db_with_scan("t1", 1_000);
        db.upsert_live_web_service(&service(&run, "First", 10)).unwrap();
        let mut second = service(&run, "Second", 20);
        second.technologies = vec!["nginx".into(), "PHP/8.1".into()];
        db.upsert_live_web_service(&second).unwrap();

        let rows = db.live_web_services(&run.scan_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("Second"));
        assert_eq!(rows[0].last_checked_ms, 20);
        assert_eq!(rows[0].technologies, vec!["nginx", "PHP/8.1"]);

        let mut https = service(&run, "Tls", 30);
        https.protocol = Protocol::Https;
        db.upsert_live_web_service(&https).unwrap();
        assert_eq!(db.live_web_services(&run.scan_id).unwrap().len(), 2);
    }

    #[test]
    fn rows_for_unknown_scan_are_rejected() {
        let (db, run) = db_with_scan("t1", 1_000);
        let mut orphan = service(&run, "x", 1);
        orphan.scan_id = Uuid::new_v4();
        assert!(db.upsert_live_web_service(&orphan).is_err());
    }

    #[test]
    fn network_ranges_are_ordered_and_upserted() {
        let db = Db::open_in_memory().unwrap();
        db.add_network_range("t1", &NetworkRange::new("198.51.100.0/24")).unwrap();
        let mut r = NetworkRange::new("10.0.0.0/30");
        r.asn = Some("AS64500".into());
        db.add_network_range("t1", &r).unwrap();
        r.organization = Some("Example Org".into());
        db.add_network_range("t1", &r).unwrap();
        db.add_network_range("t2", &NetworkRange::new("192.0.2.0/24")).unwrap();

        let ranges = RangeSource::network_ranges(&db, "t1").unwrap();
        let cidrs: Vec<_> = ranges.iter().map(|r| r.cidr.as_str()).collect();
        assert_eq!(cidrs, vec!["10.0.0.0/30", "198.51.100.0/24"]);
        assert_eq!(ranges[0].organization.as_deref(), Some("Example Org"));
        assert!(db.network_ranges("none").unwrap().is_empty());
    }

    #[test]
    fn usable_through_trait_objects() {
        let db = std::sync::Arc::new(Db::open_in_memory().unwrap());
        let store: std::sync::Arc<dyn ScanStore> = db.clone();
        let run = ScanRun::pending("t9", None, 7);
        store.create_scan(&run).unwrap();
        assert_eq!(store.scans_for_target("t9").unwrap().len(), 1);
    }

    #[test]
    fn file_database_reopens() {
        let dir = std::env::temp_dir().join(format!("netsweep-db-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scans.db");
        let run = ScanRun::pending("t1", None, 1);
        {
            let db = Db::open_or_create(&path).unwrap();
            db.create_scan(&run).unwrap();
        }
        let db = Db::open_or_create(&path).unwrap();
        assert!(db.scan(&run.scan_id).unwrap().is_some());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
