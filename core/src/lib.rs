//! Core utilities and shared types for the netsweep engine.

pub mod config;
pub mod error;
pub mod limiter;
pub mod models;
pub mod ports;
pub mod store;

pub use config::ScanConfig;
pub use error::{CidrError, ConfigError};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use models::*;
pub use store::{RangeSource, ScanStore};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Current wall-clock time as unix milliseconds, the timestamp unit of every stored row.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
