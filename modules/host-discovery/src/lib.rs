//! Host discovery via TCP connect sweep with timeouts and bounded concurrency.

pub mod cidr;
pub mod rdns;

pub use cidr::{expand_cidr, Expansion};
pub use rdns::ReverseResolver;

use netsweep_core::ConcurrencyLimiter;
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

/// An address to probe and the range it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub ip: IpAddr,
    pub network_range: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveHost {
    pub ip: IpAddr,
    pub hostname: Option<String>,
    pub network_range: String,
    /// Time taken by the connect that succeeded.
    pub latency: Duration,
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub ports: Vec<u16>,
    pub timeout_per_attempt: Duration,
}

/// Drop repeated addresses, keeping the first range that listed each one.
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates.into_iter().filter(|c| seen.insert(c.ip)).collect()
}

/// Try `ports` in order; the first accepted connection makes the host live.
/// Returns how long that connect took.
pub async fn probe_host(ip: IpAddr, ports: &[u16], per_attempt: Duration) -> Option<Duration> {
    for &p in ports {
        let addr = SocketAddr::new(ip, p);
        let started = Instant::now();
        if let Ok(Ok(_)) = timeout(per_attempt, TcpStream::connect(addr)).await {
            return Some(started.elapsed());
        }
    }
    None
}

/// TCP-based liveness check: attempt to connect to given ports; if any succeed within timeout, host is live.
pub async fn is_host_live(ip: IpAddr, ports: &[u16], per_attempt: Duration) -> bool {
    probe_host(ip, ports, per_attempt).await.is_some()
}

/// Probe every candidate with at most `limiter.limit()` probes in flight and
/// return the live addresses, each once. `on_live` runs inside the probe task
/// as soon as a host is confirmed, after its hostname lookup.
pub async fn discover_hosts<F>(
    candidates: Vec<Candidate>,
    opts: &DiscoveryOptions,
    limiter: &ConcurrencyLimiter,
    resolver: Option<Arc<ReverseResolver>>,
    on_live: F,
) -> Vec<IpAddr>
where
    F: Fn(LiveHost) + Send + Sync + 'static,
{
    let candidates = dedup_candidates(candidates);
    let total = candidates.len();
    info!(candidates = total, concurrency = limiter.limit(), "starting host discovery");

    let (tx, mut rx) = mpsc::unbounded_channel::<IpAddr>();
    let on_live = Arc::new(on_live);
    let ports: Arc<[u16]> = opts.ports.clone().into();

    for (idx, cand) in candidates.into_iter().enumerate() {
        let Ok(permit) = limiter.acquire().await else { break };
        if idx % 50 == 0 {
            debug!(probe = idx + 1, total, ip = %cand.ip, cidr = %cand.network_range, "probing");
        }
        let txc = tx.clone();
        let p = ports.clone();
        let resolver = resolver.clone();
        let on_live = on_live.clone();
        let per_attempt = opts.timeout_per_attempt;
        tokio::spawn(async move {
            if let Some(latency) = probe_host(cand.ip, &p, per_attempt).await {
                let hostname = match resolver {
                    Some(r) => r.lookup(cand.ip).await,
                    None => None,
                };
                debug!(ip = %cand.ip, hostname = hostname.as_deref().unwrap_or("-"), "live host");
                let _ = txc.send(cand.ip);
                on_live(LiveHost { ip: cand.ip, hostname, network_range: cand.network_range, latency });
            }
            drop(permit);
        });
    }
    drop(tx);

    let mut seen = HashSet::new();
    let mut live = Vec::new();
    while let Some(ip) = rx.recv().await {
        if seen.insert(ip) { live.push(ip); }
    }
    info!(live = live.len(), "host discovery finished");
    live
}
