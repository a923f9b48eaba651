//! Server configuration from the environment.

use anyhow::Context;
use std::net::SocketAddr;

/// Listen address used when `SERVER_ADDR` is unset
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub log_filter: String,
}

impl ServerConfig {
    /// Read `SERVER_ADDR` and `RUST_LOG`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(
            std::env::var("SERVER_ADDR").ok(),
            std::env::var("RUST_LOG").ok(),
        )
    }

    fn from_vars(addr: Option<String>, log_filter: Option<String>) -> anyhow::Result<Self> {
        let raw_addr = addr.unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = raw_addr
            .parse()
            .with_context(|| format!("SERVER_ADDR is not a socket address: {:?}", raw_addr))?;

        Ok(Self {
            addr,
            log_filter: log_filter
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_vars(None, None).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_vars(
            Some("127.0.0.1:9001".into()),
            Some("ludo_server=debug".into()),
        )
        .unwrap();
        assert_eq!(config.addr.port(), 9001);
        assert_eq!(config.log_filter, "ludo_server=debug");
    }

    #[test]
    fn test_bad_address() {
        let err = ServerConfig::from_vars(Some("localhost".into()), None).unwrap_err();
        assert!(err.to_string().contains("SERVER_ADDR"));
    }
}
