//! Configuration module for Socksgate
//!
//! This module provides configuration types and parsing for the server.

mod server;
mod socks;
mod tcp;

pub use server::{ServerConfig, ShutdownPolicy, VersionPolicy};
pub use socks::{SocksConfig, UserEntry};
pub use tcp::TcpConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Listener and supervisor configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// SOCKS protocol configuration
    #[serde(default)]
    pub socks: SocksConfig,

    /// Socket options for accepted and dialed connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Config {
    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.socks.validate()?;
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:1080");
        assert_eq!(config.server.version, VersionPolicy::Any);
        assert!(!config.socks.auth_required);
        assert!(config.socks.users.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[server]
listen_addr = "0.0.0.0:1081"
version = "socks4"
shutdown = "drain"
drain_timeout = 5

[socks]
auth_required = true
connect_timeout = 3
bind_timeout = 30
allow_bind = false
relay_buffer_size = 32768

[[socks.users]]
username = "alice"
password = "wonderland"

[[socks.users]]
username = "bob"
password = "builder"

[tcp]
nodelay = false
keepalive_secs = 60
keepalive_interval = 15
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:1081");
        assert_eq!(config.server.version, VersionPolicy::Socks4);
        assert_eq!(config.server.shutdown, ShutdownPolicy::Drain);
        assert_eq!(config.server.drain_timeout, 5);
        assert!(config.socks.auth_required);
        assert_eq!(config.socks.connect_timeout, 3);
        assert_eq!(config.socks.bind_timeout, 30);
        assert!(!config.socks.allow_bind);
        assert_eq!(config.socks.relay_buffer_size, 32768);
        assert_eq!(config.socks.users.len(), 2);
        assert_eq!(config.socks.users[1].username, "bob");
        assert!(!config.tcp.nodelay);
        assert_eq!(config.tcp.keepalive_secs, 60);
    }

    #[test]
    fn test_parse_config_rejects_invalid() {
        let config_str = r#"
[socks]
auth_required = true
"#;
        let err = parse_config(config_str).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_version() {
        let config_str = r#"
[server]
version = "socks6"
"#;
        assert!(parse_config(config_str).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten_addr = \"127.0.0.1:9050\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9050");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/socksgate.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
