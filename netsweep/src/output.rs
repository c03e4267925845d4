use anyhow::Result;
use clap::ValueEnum;
use netsweep_core::{DiscoveredHost, LiveWebService, NetworkRange, ScanRun};
use serde::Serialize;
use std::io::Write;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat { Text, Json, Jsonl }

/// One human-readable line per record.
pub trait TextRow {
    fn text_row(&self) -> String;
}

pub fn ms_to_rfc3339(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| ms.to_string())
}

fn dash(v: Option<&str>) -> &str {
    v.filter(|s| !s.is_empty()).unwrap_or("-")
}

impl TextRow for ScanRun {
    fn text_row(&self) -> String {
        let c = &self.counters;
        let mut line = format!(
            "{}  {:<15} ranges {}/{}  ips {}  ports {}  web {}  created {}",
            self.scan_id,
            self.status.as_str(),
            c.processed_network_ranges,
            c.total_network_ranges,
            c.total_ips_discovered,
            c.total_ports_scanned,
            c.live_web_servers_found,
            ms_to_rfc3339(self.created_at_ms),
        );
        if let Some(ms) = self.execution_time_ms {
            line.push_str(&format!("  took {}ms", ms));
        }
        if let Some(err) = &self.error_message {
            line.push_str(&format!("  error: {}", err));
        }
        line
    }
}

impl TextRow for DiscoveredHost {
    fn text_row(&self) -> String {
        let latency = self.latency_ms.map(|v| format!("{:.1}ms", v)).unwrap_or_else(|| "-".into());
        format!("{}\t{}\t{}\t{}", self.ip_address, dash(self.hostname.as_deref()), self.network_range, latency)
    }
}

impl TextRow for LiveWebService {
    fn text_row(&self) -> String {
        let status = self.status_code.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.url,
            status,
            dash(self.title.as_deref()),
            dash(self.server_header.as_deref()),
            self.technologies.join(","),
        )
    }
}

impl TextRow for NetworkRange {
    fn text_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.cidr,
            dash(self.asn.as_deref()),
            dash(self.organization.as_deref()),
            dash(self.country.as_deref()),
            dash(self.source.as_deref()),
        )
    }
}

pub fn render<T: Serialize + TextRow>(items: &[T], format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Text => {
            for item in items {
                out.push_str(&item.text_row());
                out.push('\n');
            }
        }
        OutputFormat::Json => {
            out.push_str(&serde_json::to_string_pretty(items)?);
            out.push('\n');
        }
        OutputFormat::Jsonl => {
            for item in items {
                out.push_str(&serde_json::to_string(item)?);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

pub const WEB_CSV_HEADER: [&str; 12] = [
    "ip_address", "hostname", "port", "protocol", "url", "status_code", "title", "server_header",
    "content_length", "technologies", "response_time_ms", "last_checked",
];

pub fn write_web_csv<W: Write>(w: W, services: &[LiveWebService]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(WEB_CSV_HEADER)?;
    for s in services {
        wtr.write_record([
            s.ip_address.to_string(),
            s.hostname.clone().unwrap_or_default(),
            s.port.to_string(),
            s.protocol.to_string(),
            s.url.clone(),
            s.status_code.map(|v| v.to_string()).unwrap_or_default(),
            s.title.clone().unwrap_or_default(),
            s.server_header.clone().unwrap_or_default(),
            s.content_length.map(|v| v.to_string()).unwrap_or_default(),
            s.technologies.join("|"),
            s.response_time_ms.map(|v| format!("{:.3}", v)).unwrap_or_default(),
            ms_to_rfc3339(s.last_checked_ms),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
