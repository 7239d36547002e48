//! SOCKS protocol configuration

use crate::helper::{
    DEFAULT_BIND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_RELAY_BUFFER_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default connect timeout in seconds
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Default BIND accept timeout in seconds
fn default_bind_timeout() -> u64 {
    DEFAULT_BIND_TIMEOUT_SECS
}

/// Default relay buffer size in bytes
fn default_relay_buffer_size() -> usize {
    DEFAULT_RELAY_BUFFER_SIZE
}

fn default_allow_bind() -> bool {
    true
}

/// A username/password pair accepted by the built-in verifier
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserEntry {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl fmt::Debug for UserEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserEntry")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// SOCKS server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SocksConfig {
    /// Refuse SOCKS5 clients that do not authenticate
    ///
    /// SOCKS4 has no authentication and is unaffected; restrict the
    /// version policy to SOCKS5 to enforce authentication for everyone.
    #[serde(default)]
    pub auth_required: bool,

    /// Users for SOCKS5 username/password authentication
    #[serde(default)]
    pub users: Vec<UserEntry>,

    /// CONNECT dial timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// BIND accept timeout in seconds
    #[serde(default = "default_bind_timeout")]
    pub bind_timeout: u64,

    /// Allow the BIND command
    #[serde(default = "default_allow_bind")]
    pub allow_bind: bool,

    /// Per-direction relay buffer size in bytes
    #[serde(default = "default_relay_buffer_size")]
    pub relay_buffer_size: usize,
}

impl Default for SocksConfig {
    fn default() -> Self {
        Self {
            auth_required: false,
            users: Vec::new(),
            connect_timeout: default_connect_timeout(),
            bind_timeout: default_bind_timeout(),
            allow_bind: default_allow_bind(),
            relay_buffer_size: default_relay_buffer_size(),
        }
    }
}

impl SocksConfig {
    /// Check if authentication credentials are configured
    pub fn has_credentials(&self) -> bool {
        !self.users.is_empty()
    }

    /// CONNECT timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// BIND accept timeout as a Duration
    pub fn bind_timeout(&self) -> Duration {
        Duration::from_secs(self.bind_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_required && !self.has_credentials() {
            return Err("Authentication required but no users configured".to_string());
        }
        self.validate_limits()
    }

    /// Validate everything except the user table, for servers whose
    /// credentials come from an external verifier
    pub fn validate_limits(&self) -> Result<(), String> {
        if self.users.iter().any(|u| u.username.is_empty() || u.username.len() > 255) {
            return Err("Usernames must be 1 to 255 bytes".to_string());
        }
        if self.users.iter().any(|u| u.password.len() > 255) {
            return Err("Passwords must be at most 255 bytes".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("connect_timeout must be greater than 0".to_string());
        }
        if self.bind_timeout == 0 {
            return Err("bind_timeout must be greater than 0".to_string());
        }
        if self.relay_buffer_size == 0 {
            return Err("relay_buffer_size must be greater than 0".to_string());
        }
        Ok(())
    }
}
