//! Handle to a server running in the background

use crate::error::SocksError;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Controls a server started with [`SocksServer::spawn`](super::SocksServer::spawn)
///
/// Dropping the handle without calling [`shutdown`](ServerHandle::shutdown)
/// also stops the accept loop, since the shutdown channel closes.
pub struct ServerHandle {
    local_addr: SocketAddr,
    active: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<bool>,
    join_handle: Option<JoinHandle<Result<(), SocksError>>>,
}

impl ServerHandle {
    pub(crate) fn new(
        local_addr: SocketAddr,
        active: Arc<AtomicUsize>,
        shutdown_tx: broadcast::Sender<bool>,
        join_handle: JoinHandle<Result<(), SocksError>>,
    ) -> Self {
        ServerHandle {
            local_addr,
            active,
            shutdown_tx,
            join_handle: Some(join_handle),
        }
    }

    /// Address the server accepts clients on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of sessions currently running
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Check if the accept loop is still running
    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop accepting and wait for the server to apply its shutdown policy
    pub async fn shutdown(mut self) -> Result<(), SocksError> {
        let _ = self.shutdown_tx.send(true);

        match self.join_handle.take() {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Ok(()),
                Err(e) => Err(io::Error::other(format!("server task panicked: {}", e)).into()),
            },
            None => Ok(()),
        }
    }
}
