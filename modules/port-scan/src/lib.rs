//! TCP connect scan of one host with timeouts and per-host concurrency.

use anyhow::{anyhow, Result};
use netsweep_core::ConcurrencyLimiter;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

/// Parse a comma-separated list of ports/ranges (e.g., "22,80,443", "1-1024,8080").
pub fn parse_ports(spec: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();
    for part in spec.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let s: u16 = start.trim().parse()?;
            let e: u16 = end.trim().parse()?;
            if s == 0 || e == 0 || s > e {
                return Err(anyhow!("invalid port range: {}", part));
            }
            ports.extend(s..=e);
        } else {
            let p: u16 = part.parse()?;
            if p == 0 {
                return Err(anyhow!("invalid port: {}", part));
            }
            ports.push(p);
        }
    }
    ports.sort_unstable();
    ports.dedup();
    Ok(ports)
}

/// Single connect attempt, no retry.
pub async fn is_port_open(ip: IpAddr, port: u16, timeout_per_port: Duration) -> bool {
    matches!(timeout(timeout_per_port, TcpStream::connect(SocketAddr::new(ip, port))).await, Ok(Ok(_)))
}

/// Scan `ports` on `ip`, never running more than `limiter.limit()` connects at once.
/// Returns the open ports sorted ascending.
pub async fn scan_connect_with_limiter(
    ip: IpAddr,
    ports: &[u16],
    timeout_per_port: Duration,
    limiter: &ConcurrencyLimiter,
) -> Vec<u16> {
    let (tx, mut rx) = mpsc::unbounded_channel::<u16>();

    for &port in ports {
        let tx = tx.clone();
        let host_limiter = limiter.clone();
        tokio::spawn(async move {
            let Ok(_permit) = host_limiter.acquire().await else { return };
            if is_port_open(ip, port, timeout_per_port).await {
                let _ = tx.send(port);
            }
        });
    }
    drop(tx);

    let mut open = Vec::new();
    while let Some(p) = rx.recv().await {
        open.push(p);
    }
    open.sort_unstable();
    debug!(%ip, scanned = ports.len(), open = open.len(), "port scan finished");
    open
}

/// Scan with a fresh per-host limit of `per_host_concurrency` connects.
pub async fn scan_connect(
    ip: IpAddr,
    ports: &[u16],
    timeout_per_port: Duration,
    per_host_concurrency: usize,
) -> Vec<u16> {
    let limiter = ConcurrencyLimiter::new(per_host_concurrency);
    scan_connect_with_limiter(ip, ports, timeout_per_port, &limiter).await
}
