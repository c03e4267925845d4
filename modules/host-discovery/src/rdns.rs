//! Best-effort reverse DNS.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

pub struct ReverseResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl ReverseResolver {
    /// `timeout` bounds a whole lookup; `dial_timeout` bounds each query the
    /// resolver sends to a name server.
    pub fn new(timeout: Duration, dial_timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(sys) => sys,
            Err(e) => {
                debug!(error = %e, "system resolver config unavailable, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = dial_timeout;
        opts.attempts = 1;
        ReverseResolver { resolver: TokioAsyncResolver::tokio(config, opts), timeout }
    }

    /// First PTR name for `ip`, or `None` on any failure or empty answer.
    pub async fn lookup(&self, ip: IpAddr) -> Option<String> {
        let answer = match timeout(self.timeout, self.resolver.reverse_lookup(ip)).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                debug!(%ip, error = %e, "reverse lookup failed");
                return None;
            }
            Err(_) => {
                debug!(%ip, "reverse lookup timed out");
                return None;
            }
        };
        let first = answer.iter().next()?;
        normalize_name(&first.to_string())
    }
}

/// Strip the trailing root label dot; empty names count as no name.
pub fn normalize_name(raw: &str) -> Option<String> {
    let name = raw.trim().strip_suffix('.').unwrap_or(raw.trim());
    if name.is_empty() { None } else { Some(name.to_string()) }
}
