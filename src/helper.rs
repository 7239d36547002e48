//! Helper utilities for Socksgate
//!
//! This module provides defaults and socket tuning shared by the listener
//! and the command executor.

use crate::config::TcpConfig;
use std::time::Duration;
use tokio::net::TcpStream;

/// Default per-direction relay buffer size
pub const DEFAULT_RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Default CONNECT timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default BIND accept timeout in seconds
pub const DEFAULT_BIND_TIMEOUT_SECS: u64 = 120;

/// Socket options applied to client and target sockets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(20),
            keepalive_interval: Some(8),
        }
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        let keepalive = (config.keepalive_secs > 0).then_some(config.keepalive_secs);
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs: keepalive,
            keepalive_interval: keepalive.map(|_| config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }

    /// Apply the options, logging instead of failing
    pub fn hint(&self, stream: &TcpStream) {
        if let Err(e) = self.apply(stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_RELAY_BUFFER_SIZE, 16384);
        assert_eq!(DEFAULT_CONNECT_TIMEOUT_SECS, 10);
        assert_eq!(DEFAULT_BIND_TIMEOUT_SECS, 120);
    }

    #[test]
    fn test_socket_opts_from_tcp_config() {
        let opts = SocketOpts::from_tcp_config(&TcpConfig::default());
        assert_eq!(opts, SocketOpts::default());

        let config = TcpConfig {
            nodelay: false,
            keepalive_secs: 0,
            keepalive_interval: 8,
        };
        let opts = SocketOpts::from_tcp_config(&config);
        assert!(!opts.nodelay);
        assert_eq!(opts.keepalive_secs, None);
        assert_eq!(opts.keepalive_interval, None);
    }

    #[tokio::test]
    async fn test_socket_opts_apply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let client = client.unwrap();
        drop(accepted);

        SocketOpts::default().apply(&client).unwrap();
        assert!(client.nodelay().unwrap());
    }
}
