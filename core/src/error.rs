use thiserror::Error;

/// A network range that cannot be expanded into candidate addresses.
#[derive(Debug, Error)]
pub enum CidrError {
    #[error("invalid CIDR {cidr}: {source}")]
    Malformed {
        cidr: String,
        #[source]
        source: ipnet::AddrParseError,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{0} must list at least one port")]
    NoPorts(&'static str),
}
