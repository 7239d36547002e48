//! Test utilities for Socksgate
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use socksgate::config::{Config, ShutdownPolicy, UserEntry, VersionPolicy};
use socksgate::{ServerHandle, SocksServer};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address on localhost that refuses connections
pub async fn closed_port() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// Start an echo server that handles any number of connections
///
/// Each connection echoes until the client half-closes, then closes its own
/// write side.
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Bind and spawn a proxy for `config`
pub async fn spawn_proxy(config: Config) -> ServerHandle {
    SocksServer::bind(&config).await.unwrap().spawn().unwrap()
}

/// Connect a plain TCP client to the proxy
pub async fn connect_proxy(handle: &ServerHandle) -> TcpStream {
    TcpStream::connect(handle.local_addr()).await.unwrap()
}

/// Read until the proxy closes the connection
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf).await;
    buf
}

/// Test configuration builder
pub struct TestConfigBuilder {
    version: VersionPolicy,
    shutdown: ShutdownPolicy,
    auth_required: bool,
    users: Vec<UserEntry>,
    allow_bind: bool,
    connect_timeout: u64,
    bind_timeout: u64,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        TestConfigBuilder {
            version: VersionPolicy::Any,
            shutdown: ShutdownPolicy::Abort,
            auth_required: false,
            users: Vec::new(),
            allow_bind: true,
            connect_timeout: 2,
            bind_timeout: 5,
        }
    }
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict protocol versions
    pub fn version(mut self, version: VersionPolicy) -> Self {
        self.version = version;
        self
    }

    /// Set shutdown policy
    pub fn shutdown(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown = policy;
        self
    }

    /// Set authentication required
    pub fn auth_required(mut self, required: bool) -> Self {
        self.auth_required = required;
        self
    }

    /// Add a user
    pub fn user(mut self, username: &str, password: &str) -> Self {
        self.users.push(UserEntry {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Allow BIND
    pub fn allow_bind(mut self, allow: bool) -> Self {
        self.allow_bind = allow;
        self
    }

    /// Set CONNECT timeout in seconds
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = secs;
        self
    }

    /// Set BIND accept timeout in seconds
    pub fn bind_timeout(mut self, secs: u64) -> Self {
        self.bind_timeout = secs;
        self
    }

    /// Build the configuration, listening on an ephemeral localhost port
    pub fn build(self) -> Config {
        let mut config = Config::default();
        config.server.listen_addr = "127.0.0.1:0".to_string();
        config.server.version = self.version;
        config.server.shutdown = self.shutdown;
        config.socks.auth_required = self.auth_required;
        config.socks.users = self.users;
        config.socks.allow_bind = self.allow_bind;
        config.socks.connect_timeout = self.connect_timeout;
        config.socks.bind_timeout = self.bind_timeout;
        config
    }
}

/// Raw SOCKS frames for tests that bypass the client helpers
pub mod socks_mock {
    use socksgate::socks::*;

    /// Create a method selection request offering `methods`
    pub fn create_greeting(methods: &[u8]) -> Vec<u8> {
        let mut greeting = vec![SOCKS5_VERSION, methods.len() as u8];
        greeting.extend_from_slice(methods);
        greeting
    }

    /// Create a SOCKS5 connect command to an IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
        ];
        cmd.extend_from_slice(&ip);
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }

    /// Create a SOCKS4a connect request for `host`
    pub fn create_socks4a_connect(user_id: &[u8], host: &str, port: u16) -> Vec<u8> {
        let mut request = vec![SOCKS4_VERSION, SOCKS_CMD_TCP_CONNECT];
        request.extend_from_slice(&port.to_be_bytes());
        request.extend_from_slice(&[0, 0, 0, 1]);
        request.extend_from_slice(user_id);
        request.push(0);
        request.extend_from_slice(host.as_bytes());
        request.push(0);
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_listener() {
        let (listener, addr) = create_test_listener().await;
        assert!(addr.port() > 0);
        drop(listener);
    }

    #[test]
    fn test_config_builder() {
        let config = TestConfigBuilder::new()
            .version(VersionPolicy::Socks5)
            .auth_required(true)
            .user("alice", "secret")
            .allow_bind(false)
            .build();

        assert_eq!(config.server.version, VersionPolicy::Socks5);
        assert!(config.socks.auth_required);
        assert_eq!(config.socks.users.len(), 1);
        assert!(!config.socks.allow_bind);
        assert!(config.validate().is_ok());
    }
}
