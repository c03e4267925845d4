use netsweep_core::{NetworkRange, Protocol, RangeSource, ScanConfig, ScanStatus, ScanStore};
use results_sqlite::Db;
use scan_orchestrator::{Orchestrator, ScanError, NO_RANGES_MESSAGE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const PAGE: &str = "<html><head><title>Hello</title></head><body>hi</body></html>";

/// Plain HTTP server on 127.0.0.2 answering every GET with a small nginx page.
async fn fake_web_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.2:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut seen = Vec::new();
                loop {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            seen.extend_from_slice(&buf[..n]);
                            if seen.windows(4).any(|w| w == b"\r\n\r\n") { break; }
                        }
                    }
                }
                if !seen.starts_with(b"GET") { return; }
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nServer: nginx\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    PAGE.len(),
                    PAGE
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    addr
}

fn test_config(port: u16) -> ScanConfig {
    ScanConfig {
        discovery_ports: vec![port],
        web_ports: vec![port],
        host_probe_timeout_ms: 500,
        port_scan_timeout_ms: 500,
        web_service_timeout_ms: 3000,
        resolve_hostnames: false,
        ..ScanConfig::default()
    }
}

fn setup(config: ScanConfig) -> (Arc<Db>, Orchestrator) {
    let db = Arc::new(Db::open_in_memory().unwrap());
    let store: Arc<dyn ScanStore> = db.clone();
    let ranges: Arc<dyn RangeSource> = db.clone();
    let orch = Orchestrator::new(store, ranges, config).unwrap();
    (db, orch)
}

#[tokio::test]
async fn full_scan_finds_the_web_server() {
    let addr = fake_web_server().await;
    let (db, orch) = setup(test_config(addr.port()));
    db.add_network_range("acme", &NetworkRange::new("127.0.0.0/30")).unwrap();

    let handle = orch.start_scan("acme", Some("session-1".into())).unwrap();
    let scan_id = handle.scan_id;
    let counters = handle.wait().await.unwrap();

    let run = orch.scan_status(&scan_id).unwrap().unwrap();
    assert_eq!(run.status, ScanStatus::Success);
    assert_eq!(run.counters, counters);
    assert_eq!(run.counters.total_network_ranges, 1);
    assert_eq!(run.counters.processed_network_ranges, 1);
    assert_eq!(run.counters.total_ips_discovered, 1);
    assert_eq!(run.counters.total_ports_scanned, 1);
    assert_eq!(run.counters.live_web_servers_found, 1);
    assert_eq!(run.session_id.as_deref(), Some("session-1"));
    assert!(run.execution_time_ms.is_some());
    assert!(run.error_message.is_none());

    let hosts = orch.discovered_hosts(&scan_id).unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].ip_address, addr.ip());
    assert_eq!(hosts[0].network_range, "127.0.0.0/30");
    assert!(hosts[0].latency_ms.is_some());

    let services = orch.live_web_services(&scan_id).unwrap();
    assert_eq!(services.len(), 1);
    let web = &services[0];
    assert_eq!(web.protocol, Protocol::Http);
    assert_eq!(web.port, addr.port());
    assert_eq!(web.url, format!("http://{}", addr));
    assert_eq!(web.status_code, Some(200));
    assert_eq!(web.title.as_deref(), Some("Hello"));
    assert_eq!(web.server_header.as_deref(), Some("nginx"));
    assert!(web.technologies.iter().any(|t| t == "nginx"));
}

#[tokio::test]
async fn zero_ranges_ends_in_error() {
    let (_db, orch) = setup(test_config(9));
    let handle = orch.start_scan("empty-target", None).unwrap();
    let scan_id = handle.scan_id;
    let outcome = handle.wait().await;
    assert!(matches!(outcome, Err(ScanError::NoNetworkRanges)));

    let run = orch.scan_status(&scan_id).unwrap().unwrap();
    assert_eq!(run.status, ScanStatus::Error);
    assert_eq!(run.error_message.as_deref(), Some(NO_RANGES_MESSAGE));
    assert!(orch.discovered_hosts(&scan_id).unwrap().is_empty());
    assert!(orch.live_web_services(&scan_id).unwrap().is_empty());
}

#[tokio::test]
async fn unusable_ranges_still_succeed_with_nothing_found() {
    let (db, orch) = setup(test_config(9));
    db.add_network_range("acme", &NetworkRange::new("bogus")).unwrap();
    db.add_network_range("acme", &NetworkRange::new("2001:db8::/120")).unwrap();
    db.add_network_range("acme", &NetworkRange::new("127.0.0.9/32")).unwrap();

    let handle = orch.start_scan("acme", None).unwrap();
    let scan_id = handle.scan_id;
    let counters = handle.wait().await.unwrap();
    assert_eq!(counters.total_network_ranges, 3);
    assert_eq!(counters.total_ips_discovered, 0);
    assert_eq!(counters.total_ports_scanned, 0);

    let run = orch.scan_status(&scan_id).unwrap().unwrap();
    assert_eq!(run.status, ScanStatus::Success);
}

#[tokio::test]
async fn scans_are_listed_newest_first() {
    let (_db, orch) = setup(test_config(9));
    let first = orch.start_scan("t", None).unwrap();
    let first_id = first.scan_id;
    let _ = first.wait().await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = orch.start_scan("t", None).unwrap();
    let second_id = second.scan_id;
    let _ = second.wait().await;

    let ids: Vec<_> = orch.scans_for_target("t").unwrap().into_iter().map(|r| r.scan_id).collect();
    assert_eq!(ids, vec![second_id, first_id]);
}
