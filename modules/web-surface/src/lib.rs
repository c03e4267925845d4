//! HTTP(S) detection on open ports: status, title, server banner and technology hints.

use anyhow::Result;
use netsweep_core::Protocol;
use regex::Regex;
use reqwest::{header::HeaderMap, redirect::Policy, Client, Response};
use std::net::{IpAddr, SocketAddr};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Most body bytes ever read while looking for a title.
pub const TITLE_READ_LIMIT: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct WebProbeOptions {
    pub timeout: Duration,
    pub redirects: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebFinding {
    pub protocol: Protocol,
    pub url: String,
    pub status: u16,
    pub title: Option<String>,
    pub server: Option<String>,
    pub content_length: Option<i64>,
    pub technologies: Vec<String>,
    pub response_time_ms: f64,
}

/// Throwaway-request HTTP client: no certificate validation, no idle connections kept.
pub struct WebProber {
    client: Client,
}

impl WebProber {
    pub fn new(opts: &WebProbeOptions) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::limited(opts.redirects))
            .timeout(opts.timeout)
            .user_agent(opts.user_agent.clone())
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .build()?;
        Ok(WebProber { client })
    }

    /// GET over http, then https. The first protocol that gets any response wins;
    /// `None` when neither does.
    pub async fn probe(&self, ip: IpAddr, port: u16) -> Option<WebFinding> {
        let authority = SocketAddr::new(ip, port);
        for protocol in [Protocol::Http, Protocol::Https] {
            let url = format!("{}://{}", protocol, authority);
            match self.fetch(protocol, &url).await {
                Ok(found) => return Some(found),
                Err(e) => debug!(%url, error = %e, "no response"),
            }
        }
        None
    }

    async fn fetch(&self, protocol: Protocol, url: &str) -> Result<WebFinding> {
        let started = Instant::now();
        let mut resp = self.client.get(url).send().await?;
        let response_time_ms = started.elapsed().as_nanos() as f64 / 1e6;

        let headers = resp.headers().clone();
        let server = header_str(&headers, "server").map(str::to_string);
        let content_length = header_str(&headers, "content-length")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&n| n > 0);
        let technologies = detect_technologies(&headers);
        let title = if is_html(&headers) {
            match read_prefix(&mut resp, TITLE_READ_LIMIT).await {
                Ok(body) => extract_title(&String::from_utf8_lossy(&body)),
                Err(_) => None,
            }
        } else { None };

        Ok(WebFinding {
            protocol,
            url: url.to_string(),
            status: resp.status().as_u16(),
            title,
            server,
            content_length,
            technologies,
            response_time_ms,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|s| !s.is_empty())
}

fn is_html(headers: &HeaderMap) -> bool {
    header_str(headers, "content-type")
        .map(|s| s.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

/// Read at most `limit` bytes of the body and stop.
pub async fn read_prefix(resp: &mut Response, limit: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit.min(4096));
    while buf.len() < limit {
        let Some(chunk) = resp.chunk().await? else { break };
        let take = chunk.len().min(limit - buf.len());
        buf.extend_from_slice(&chunk[..take]);
    }
    Ok(buf)
}

pub fn extract_title(body: &str) -> Option<String> {
    static TITLE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = TITLE.get_or_init(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").ok()).as_ref()?;
    let t = re.captures(body)?.get(1)?.as_str().trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

/// Technology strings from response headers, in a fixed order, not deduplicated.
pub fn detect_technologies(headers: &HeaderMap) -> Vec<String> {
    let mut tech = Vec::new();
    if let Some(v) = header_str(headers, "server") { tech.push(v.to_string()); }
    if let Some(v) = header_str(headers, "x-powered-by") { tech.push(v.to_string()); }
    if let Some(v) = header_str(headers, "x-aspnet-version") { tech.push(format!("ASP.NET {}", v)); }
    if let Some(v) = header_str(headers, "x-generator") { tech.push(v.to_string()); }
    if headers.contains_key("x-drupal-cache") { tech.push("Drupal".into()); }
    if let Some(v) = header_str(headers, "x-powered-cms") { tech.push(v.to_string()); }
    tech
}
