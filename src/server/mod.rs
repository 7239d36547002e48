//! Server module for Socksgate
//!
//! This module contains the listener that accepts SOCKS clients and
//! supervises one session task per connection.

mod guard;
mod handle;
#[allow(clippy::module_inception)]
mod server;

pub use handle::ServerHandle;
pub use server::SocksServer;

use crate::config::Config;
use anyhow::{Context, Result};
use tokio::sync::broadcast;

/// Run the server with the given configuration until shutdown
pub async fn run_server(config: Config, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    let server = SocksServer::bind(&config)
        .await
        .with_context(|| format!("Failed to start server on {}", config.server.listen_addr))?;

    server.run(shutdown_rx).await?;
    Ok(())
}
