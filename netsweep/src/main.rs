use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use netsweep_core::{NetworkRange, RangeSource, ScanConfig, ScanId, ScanStore};
use output::{render, OutputFormat};
use results_sqlite::Db;
use scan_orchestrator::Orchestrator;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod logging;
mod output;

#[derive(Debug, Parser)]
#[command(name = "netsweep", version, about = "Network range sweep and live web service discovery")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./netsweep.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path (overrides `db` from the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Manage the network ranges attributed to a target
    Ranges {
        #[command(subcommand)]
        cmd: RangesCmd,
    },
    /// Start scans and read their results
    Scan {
        #[command(subcommand)]
        cmd: ScanCmd,
    },
}

#[derive(Debug, Subcommand)]
enum RangesCmd {
    /// Add or update one range
    Add {
        target: String,
        cidr: String,
        #[arg(long)]
        asn: Option<String>,
        #[arg(long)]
        org: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Import newline-delimited CIDRs (comments with # and blanks ignored)
    Import {
        target: String,
        file: PathBuf,
        /// Source tag stored with every imported range
        #[arg(long, default_value = "import")]
        source: String,
    },
    /// List a target's ranges
    List {
        target: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Subcommand)]
enum ScanCmd {
    /// Run a full scan of a target and print the final status
    Start {
        target: String,
        /// Parent session identifier
        #[arg(long)]
        session: Option<String>,
        #[command(flatten)]
        overrides: ScanOverrides,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show one scan
    Status {
        scan_id: ScanId,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List a target's scans, newest first
    List {
        target: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the live hosts a scan found
    Hosts {
        scan_id: ScanId,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the web services a scan found
    Web {
        scan_id: ScanId,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Output file (overwrites). Stdout if omitted.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Write CSV instead of the selected format when --out is provided
        #[arg(long, default_value_t = false, requires = "out")]
        csv: bool,
    },
}

/// Command-line overrides for the `scan` section of the config file.
#[derive(Debug, Default, Args)]
struct ScanOverrides {
    /// Web ports to scan on live hosts (e.g., 80,443,8000-8010)
    #[arg(long)]
    ports: Option<String>,
    /// Ports tried, in order, to decide whether a host is live
    #[arg(long)]
    discovery_ports: Option<String>,
    /// Addresses probed per range
    #[arg(long)]
    max_ips_per_range: Option<usize>,
    /// Simultaneous liveness probes
    #[arg(long)]
    ip_concurrency: Option<usize>,
    /// Live hosts port-scanned in parallel
    #[arg(long)]
    host_concurrency: Option<usize>,
    /// Simultaneous port probes per host
    #[arg(long)]
    port_concurrency: Option<usize>,
    /// Liveness connect timeout in milliseconds
    #[arg(long)]
    host_timeout_ms: Option<u64>,
    /// Port connect timeout in milliseconds
    #[arg(long)]
    port_timeout_ms: Option<u64>,
    /// HTTP(S) request timeout in milliseconds
    #[arg(long)]
    web_timeout_ms: Option<u64>,
    /// Skip reverse DNS for live hosts
    #[arg(long, default_value_t = false)]
    no_rdns: bool,
}

impl ScanOverrides {
    fn apply(&self, cfg: &mut ScanConfig) -> Result<()> {
        if let Some(spec) = &self.ports {
            cfg.web_ports = port_scan::parse_ports(spec).context("--ports")?;
        }
        if let Some(spec) = &self.discovery_ports {
            // liveness tries ports in the order given
            cfg.discovery_ports = parse_ordered_ports(spec).context("--discovery-ports")?;
        }
        if let Some(v) = self.max_ips_per_range { cfg.max_ips_per_range = v; }
        if let Some(v) = self.ip_concurrency { cfg.max_concurrent_ips = v; }
        if let Some(v) = self.host_concurrency { cfg.max_concurrent_hosts = v; }
        if let Some(v) = self.port_concurrency { cfg.max_concurrent_ports = v; }
        if let Some(v) = self.host_timeout_ms { cfg.host_probe_timeout_ms = v; }
        if let Some(v) = self.port_timeout_ms { cfg.port_scan_timeout_ms = v; }
        if let Some(v) = self.web_timeout_ms { cfg.web_service_timeout_ms = v; }
        if self.no_rdns { cfg.resolve_hostnames = false; }
        Ok(())
    }
}

fn parse_ordered_ports(spec: &str) -> Result<Vec<u16>> {
    let mut out = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        for p in port_scan::parse_ports(part)? {
            if !out.contains(&p) { out.push(p); }
        }
    }
    Ok(out)
}

fn validate_cidr(cidr: &str) -> Result<String> {
    let trimmed = cidr.trim();
    trimmed
        .parse::<ipnet::IpNet>()
        .map_err(|e| anyhow!("invalid CIDR {}: {}", trimmed, e))?;
    Ok(trimmed.to_string())
}

/// CIDRs from a newline-delimited list; malformed lines are reported and skipped.
fn read_cidr_list(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        match validate_cidr(line) {
            Ok(c) => out.push(c),
            Err(e) => warn!(line = n + 1, error = %e, "skipping line"),
        }
    }
    out
}

fn print(s: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(s.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn open_db(path: &Path) -> Result<Arc<Db>> {
    Ok(Arc::new(Db::open_or_create(path)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();
    let loaded = config::load_config(cli.config.as_deref())?;
    let db_path = cli.db.clone().unwrap_or_else(|| loaded.db_path());

    match cli.command {
        Commands::Version => {
            println!("netsweep {} (core {})", env!("CARGO_PKG_VERSION"), netsweep_core::version());
        }
        Commands::Ranges { cmd } => {
            let db = open_db(&db_path)?;
            match cmd {
                RangesCmd::Add { target, cidr, asn, org, description, country, source } => {
                    let range = NetworkRange {
                        cidr: validate_cidr(&cidr)?,
                        asn,
                        organization: org,
                        description,
                        country,
                        source,
                    };
                    db.add_network_range(&target, &range)?;
                    info!(target_id = %target, cidr = %range.cidr, "range saved");
                }
                RangesCmd::Import { target, file, source } => {
                    let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
                    let cidrs = read_cidr_list(&text);
                    for cidr in &cidrs {
                        let mut range = NetworkRange::new(cidr.clone());
                        range.source = Some(source.clone());
                        db.add_network_range(&target, &range)?;
                    }
                    println!("imported {} ranges for {}", cidrs.len(), target);
                }
                RangesCmd::List { target, format } => {
                    print(&render(&RangeSource::network_ranges(db.as_ref(), &target)?, format)?)?;
                }
            }
        }
        Commands::Scan { cmd } => {
            let db = open_db(&db_path)?;
            match cmd {
                ScanCmd::Start { target, session, overrides, format } => {
                    let mut scan_cfg = loaded.scan.clone();
                    overrides.apply(&mut scan_cfg)?;
                    let store: Arc<dyn ScanStore> = db.clone();
                    let ranges: Arc<dyn RangeSource> = db.clone();
                    let orch = Orchestrator::new(store, ranges, scan_cfg)?;

                    let rt = tokio::runtime::Runtime::new()?;
                    let scan_id = rt.block_on(async move {
                        let handle = orch.start_scan(&target, session)?;
                        let scan_id = handle.scan_id;
                        eprintln!("scan {} started", scan_id);
                        if let Err(e) = handle.wait().await {
                            warn!(%scan_id, error = %e, "scan did not succeed");
                        }
                        anyhow::Ok(scan_id)
                    })?;
                    let run = db.scan(&scan_id)?.ok_or_else(|| anyhow!("scan {} vanished", scan_id))?;
                    print(&render(&[run], format)?)?;
                }
                ScanCmd::Status { scan_id, format } => {
                    let run = db.scan(&scan_id)?.ok_or_else(|| anyhow!("no scan {}", scan_id))?;
                    print(&render(&[run], format)?)?;
                }
                ScanCmd::List { target, format } => {
                    print(&render(&db.scans_for_target(&target)?, format)?)?;
                }
                ScanCmd::Hosts { scan_id, format } => {
                    print(&render(&db.discovered_hosts(&scan_id)?, format)?)?;
                }
                ScanCmd::Web { scan_id, format, out, csv } => {
                    let services = db.live_web_services(&scan_id)?;
                    match out {
                        Some(path) => {
                            let fh = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
                            if csv {
                                output::write_web_csv(fh, &services)?;
                            } else {
                                let mut w = std::io::BufWriter::new(fh);
                                w.write_all(render(&services, format)?.as_bytes())?;
                                w.flush()?;
                            }
                            eprintln!("wrote {} services to {}", services.len(), path.display());
                        }
                        None => print(&render(&services, format)?)?,
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_scan_start_overrides() {
        let cli = Cli::try_parse_from([
            "netsweep", "--db", "x.db", "scan", "start", "acme", "--ports", "80,8000-8002", "--no-rdns",
            "--ip-concurrency", "5", "--format", "jsonl",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        let Commands::Scan { cmd: ScanCmd::Start { target, overrides, format, .. } } = cli.command else {
            panic!("expected scan start");
        };
        assert_eq!(target, "acme");
        assert_eq!(format, OutputFormat::Jsonl);
        let mut cfg = ScanConfig::default();
        overrides.apply(&mut cfg).unwrap();
        assert_eq!(cfg.web_ports, vec![80, 8000, 8001, 8002]);
        assert_eq!(cfg.max_concurrent_ips, 5);
        assert!(!cfg.resolve_hostnames);
        assert_eq!(cfg.max_concurrent_hosts, 20);
    }

    #[test]
    fn csv_requires_out() {
        let id = uuid::Uuid::nil().to_string();
        assert!(Cli::try_parse_from(["netsweep", "scan", "web", id.as_str(), "--csv"]).is_err());
        assert!(Cli::try_parse_from(["netsweep", "scan", "web", id.as_str(), "--csv", "--out", "w.csv"]).is_ok());
    }

    #[test]
    fn discovery_ports_keep_their_order() {
        assert_eq!(parse_ordered_ports("443, 80,22,80").unwrap(), vec![443, 80, 22]);
        assert!(parse_ordered_ports("0").is_err());
    }

    #[test]
    fn cidr_list_skips_comments_and_garbage() {
        let text = "# ranges\n10.0.0.0/24\n\n  192.0.2.0/28  \nnot-a-range\n2001:db8::/64\n";
        assert_eq!(read_cidr_list(text), vec!["10.0.0.0/24", "192.0.2.0/28", "2001:db8::/64"]);
    }

    #[test]
    fn bad_cidr_is_rejected() {
        assert!(validate_cidr("10.0.0.0/33").is_err());
        assert_eq!(validate_cidr(" 10.0.0.0/8 ").unwrap(), "10.0.0.0/8");
    }
}
