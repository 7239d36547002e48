//! # Socksgate - SOCKS4/4a/5 Proxy Engine
//!
//! Socksgate accepts SOCKS clients on a local TCP listener, negotiates the
//! protocol on each connection, executes the requested command and relays
//! bytes between the client and its target.
//!
//! ## Features
//!
//! - **SOCKS4, SOCKS4a and SOCKS5** on the same port, detected from the first byte
//! - **Username/password authentication** (RFC 1929) through a pluggable verifier
//! - **CONNECT and BIND**; UDP ASSOCIATE is answered with "command not supported"
//! - **Graceful shutdown** that detaches, aborts or drains in-flight sessions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksgate::config::load_config;
//! use socksgate::server::run_server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_server(config, shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Listener -> Session (negotiate) -> Command executor -> Tunnel
//! ```
//!
//! Every accepted connection runs on its own task; sessions share nothing
//! but the configuration and the credential verifier.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod helper;
pub mod server;
pub mod socks;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{ProtocolError, Socks4Status, Socks5Status, SocksError};
pub use server::{run_server, ServerHandle, SocksServer};

/// Version of the Socksgate library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
