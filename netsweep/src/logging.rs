use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "NETSWEEP_LOG";
const DEFAULT_FILTER: &str = "netsweep=info,scan_orchestrator=info,host_discovery=warn,port_scan=warn,web_surface=warn";

/// Install the stderr subscriber. `RUST_LOG` wins over `NETSWEEP_LOG`.
pub fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
