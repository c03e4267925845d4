//! Scan orchestration: loads a target's ranges, sweeps them for live hosts,
//! port-scans the live ones and fingerprints every web service found.
//!
//! Status flow: `pending -> discovering_ips -> port_scanning -> success`,
//! with `error` reachable from any step. Results are written as they are
//! found, so a failed or interrupted scan keeps its partial rows.

mod error;
mod guard;

pub use error::{ScanError, NO_RANGES_MESSAGE};

use guard::FinalizeGuard;
use host_discovery::{discover_hosts, expand_cidr, Candidate, DiscoveryOptions, Expansion, LiveHost, ReverseResolver};
use netsweep_core::{
    now_ms, ConcurrencyLimiter, DiscoveredHost, LiveWebService, NetworkRange, RangeSource, ScanConfig, ScanCounters,
    ScanId, ScanRun, ScanStatus, ScanStore,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use web_surface::{WebFinding, WebProbeOptions, WebProber};

type Hostnames = Arc<Mutex<HashMap<IpAddr, Option<String>>>>;

/// A scan running in the background.
#[derive(Debug)]
pub struct ScanHandle {
    pub scan_id: ScanId,
    task: JoinHandle<Result<ScanCounters, ScanError>>,
}

impl ScanHandle {
    /// Wait for the scan to reach a final status.
    pub async fn wait(self) -> Result<ScanCounters, ScanError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(ScanError::Aborted(e.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn ScanStore>,
    ranges: Arc<dyn RangeSource>,
    config: Arc<ScanConfig>,
    prober: Arc<WebProber>,
    resolver: Option<Arc<ReverseResolver>>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ScanStore>, ranges: Arc<dyn RangeSource>, config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let prober = WebProber::new(&WebProbeOptions {
            timeout: config.web_service_timeout(),
            redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
        })
        .map_err(|e| ScanError::Client(format!("{e:#}")))?;
        let resolver = config
            .resolve_hostnames
            .then(|| Arc::new(ReverseResolver::new(config.dns_timeout(), config.dns_dial_timeout())));
        Ok(Orchestrator { store, ranges, config: Arc::new(config), prober: Arc::new(prober), resolver })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Record a `pending` run and start it in the background. Returns as soon
    /// as the row exists. Must be called from within a Tokio runtime.
    pub fn start_scan(&self, target_id: &str, session_id: Option<String>) -> Result<ScanHandle, ScanError> {
        let run = ScanRun::pending(target_id, session_id, now_ms());
        self.store.create_scan(&run).map_err(ScanError::store)?;
        info!(scan_id = %run.scan_id, target_id = %run.target_id, "scan accepted");

        let this = self.clone();
        let scan_id = run.scan_id;
        let target = run.target_id;
        let task = tokio::spawn(async move { this.run_scan(scan_id, &target).await });
        Ok(ScanHandle { scan_id, task })
    }

    /// Run every phase for an existing scan row and write its final status.
    pub async fn run_scan(&self, scan_id: ScanId, target_id: &str) -> Result<ScanCounters, ScanError> {
        let guard = FinalizeGuard::new(self.store.clone(), scan_id);
        match self.execute(scan_id, target_id).await {
            Ok(counters) => {
                let elapsed_ms = guard.elapsed_ms();
                guard.succeed(&counters).map_err(ScanError::store)?;
                info!(
                    %scan_id,
                    target_id,
                    ips = counters.total_ips_discovered,
                    web_servers = counters.live_web_servers_found,
                    elapsed_ms,
                    "scan finished"
                );
                Ok(counters)
            }
            Err(e) => {
                error!(%scan_id, target_id, error = %e, "scan failed");
                guard.fail(&e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&self, scan_id: ScanId, target_id: &str) -> Result<ScanCounters, ScanError> {
        let ranges = self
            .ranges
            .network_ranges(target_id)
            .map_err(|e| ScanError::RangeQuery(format!("{e:#}")))?;
        if ranges.is_empty() {
            return Err(ScanError::NoNetworkRanges);
        }

        let mut counters = ScanCounters { total_network_ranges: ranges.len() as u32, ..Default::default() };
        self.progress(scan_id, ScanStatus::DiscoveringIps, &counters);
        info!(%scan_id, ranges = ranges.len(), "discovering live hosts");

        let hostnames: Hostnames = Arc::new(Mutex::new(HashMap::new()));
        let live = self.discover(scan_id, &ranges, hostnames.clone()).await;

        counters.processed_network_ranges = counters.total_network_ranges;
        counters.total_ips_discovered = live.len() as u32;
        self.progress(scan_id, ScanStatus::PortScanning, &counters);
        info!(%scan_id, live = live.len(), ports = self.config.web_ports.len(), "scanning web ports");

        let found = self.scan_live_hosts(scan_id, &live, &hostnames).await;
        counters.total_ports_scanned = (live.len() * self.config.web_ports.len()) as u32;
        counters.live_web_servers_found = found as u32;
        Ok(counters)
    }

    fn progress(&self, scan_id: ScanId, status: ScanStatus, counters: &ScanCounters) {
        if let Err(e) = self.store.update_progress(&scan_id, status, counters) {
            warn!(%scan_id, %status, error = %e, "could not record scan progress");
        }
    }

    /// Expand every range, capped per range. Malformed and IPv6 ranges are skipped.
    fn candidates(&self, ranges: &[NetworkRange]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for range in ranges {
            let cidr = range.cidr.trim();
            match expand_cidr(cidr, self.config.enumerator_cap) {
                Ok(Expansion::Hosts(hosts)) => {
                    let take = hosts.len().min(self.config.max_ips_per_range);
                    debug!(cidr, hosts = hosts.len(), probing = take, "expanded range");
                    out.extend(
                        hosts
                            .into_iter()
                            .take(take)
                            .map(|ip| Candidate { ip: IpAddr::V4(ip), network_range: cidr.to_string() }),
                    );
                }
                Ok(Expansion::SkippedIpv6) => info!(cidr, "skipping IPv6 range"),
                Err(e) => warn!(cidr, error = %e, "skipping malformed range"),
            }
        }
        out
    }

    async fn discover(&self, scan_id: ScanId, ranges: &[NetworkRange], hostnames: Hostnames) -> Vec<IpAddr> {
        let candidates = self.candidates(ranges);
        let opts = DiscoveryOptions {
            ports: self.config.discovery_ports.clone(),
            timeout_per_attempt: self.config.host_probe_timeout(),
        };
        let limiter = ConcurrencyLimiter::new(self.config.max_concurrent_ips);
        let store = self.store.clone();

        discover_hosts(candidates, &opts, &limiter, self.resolver.clone(), move |host: LiveHost| {
            if let Ok(mut names) = hostnames.lock() {
                names.insert(host.ip, host.hostname.clone());
            }
            let row = DiscoveredHost {
                scan_id,
                ip_address: host.ip,
                hostname: host.hostname,
                network_range: host.network_range,
                latency_ms: Some(host.latency.as_secs_f64() * 1000.0),
                discovered_at_ms: now_ms(),
            };
            if let Err(e) = store.insert_discovered_host(&row) {
                warn!(%scan_id, ip = %row.ip_address, error = %e, "could not store discovered host");
            }
        })
        .await
    }

    /// Port-scan and fingerprint every live host, at most `max_concurrent_hosts`
    /// at a time. Returns how many web services were found.
    async fn scan_live_hosts(&self, scan_id: ScanId, live: &[IpAddr], hostnames: &Hostnames) -> usize {
        let limiter = ConcurrencyLimiter::new(self.config.max_concurrent_hosts);
        let (tx, mut rx) = mpsc::unbounded_channel::<usize>();

        for &ip in live {
            let Ok(permit) = limiter.acquire().await else { break };
            let hostname = hostnames.lock().ok().and_then(|names| names.get(&ip).cloned().flatten());
            let this = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let found = this.scan_host(scan_id, ip, hostname).await;
                let _ = tx.send(found);
                drop(permit);
            });
        }
        drop(tx);

        let mut total = 0;
        while let Some(n) = rx.recv().await {
            total += n;
        }
        total
    }

    async fn scan_host(&self, scan_id: ScanId, ip: IpAddr, hostname: Option<String>) -> usize {
        let ports_limiter = ConcurrencyLimiter::new(self.config.max_concurrent_ports);
        let open = port_scan::scan_connect_with_limiter(ip, &self.config.web_ports, self.config.port_scan_timeout(), &ports_limiter).await;
        if open.is_empty() {
            return 0;
        }
        debug!(%scan_id, %ip, open = ?open, "open web ports");

        let (tx, mut rx) = mpsc::unbounded_channel::<(u16, WebFinding)>();
        for port in open {
            let tx = tx.clone();
            let prober = self.prober.clone();
            let ports_limiter = ports_limiter.clone();
            tokio::spawn(async move {
                let Ok(_permit) = ports_limiter.acquire().await else { return };
                if let Some(finding) = prober.probe(ip, port).await {
                    let _ = tx.send((port, finding));
                }
            });
        }
        drop(tx);

        let mut found = 0;
        while let Some((port, finding)) = rx.recv().await {
            info!(%scan_id, %ip, port, url = %finding.url, status = finding.status, "live web service");
            let row = web_service_row(scan_id, ip, hostname.clone(), port, finding);
            if let Err(e) = self.store.upsert_live_web_service(&row) {
                warn!(%scan_id, %ip, port, error = %e, "could not store web service");
            }
            found += 1;
        }
        found
    }

    pub fn scan_status(&self, scan_id: &ScanId) -> anyhow::Result<Option<ScanRun>> {
        self.store.scan(scan_id)
    }

    pub fn scans_for_target(&self, target_id: &str) -> anyhow::Result<Vec<ScanRun>> {
        self.store.scans_for_target(target_id)
    }

    pub fn discovered_hosts(&self, scan_id: &ScanId) -> anyhow::Result<Vec<DiscoveredHost>> {
        self.store.discovered_hosts(scan_id)
    }

    pub fn live_web_services(&self, scan_id: &ScanId) -> anyhow::Result<Vec<LiveWebService>> {
        self.store.live_web_services(scan_id)
    }
}

fn web_service_row(scan_id: ScanId, ip: IpAddr, hostname: Option<String>, port: u16, f: WebFinding) -> LiveWebService {
    LiveWebService {
        scan_id,
        ip_address: ip,
        hostname,
        port,
        protocol: f.protocol,
        url: f.url,
        status_code: Some(f.status),
        title: f.title,
        server_header: f.server,
        content_length: f.content_length,
        technologies: f.technologies,
        response_time_ms: Some(f.response_time_ms),
        last_checked_ms: now_ms(),
    }
}
