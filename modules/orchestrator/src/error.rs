use netsweep_core::ConfigError;
use thiserror::Error;

/// Shown on a scan whose target has no ranges to sweep.
pub const NO_RANGES_MESSAGE: &str =
    "No consolidated network ranges found. Run Amass Intel and Metabigor scans first, then consolidate.";

/// Reasons a scan cannot start or cannot finish.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid scan configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build web client: {0}")]
    Client(String),
    #[error("failed to load network ranges: {0}")]
    RangeQuery(String),
    #[error("{}", NO_RANGES_MESSAGE)]
    NoNetworkRanges,
    #[error("store error: {0}")]
    Store(String),
    #[error("scan task aborted: {0}")]
    Aborted(String),
}

impl ScanError {
    pub(crate) fn store(e: anyhow::Error) -> Self {
        ScanError::Store(format!("{e:#}"))
    }
}
