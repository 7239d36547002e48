//! Listener and session supervisor

use super::guard::SessionGuard;
use super::handle::ServerHandle;
use crate::config::{Config, ShutdownPolicy};
use crate::error::{ProtocolError, SocksError};
use crate::socks::{CredentialVerifier, Session, SessionContext};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Pause after a failed accept, so a full descriptor table does not spin
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// SOCKS server bound to a local address
pub struct SocksServer {
    listener: TcpListener,
    ctx: Arc<SessionContext>,
    shutdown: ShutdownPolicy,
    drain_timeout: Duration,
    active: Arc<AtomicUsize>,
}

impl SocksServer {
    /// Bind the listener; the configured users become the credential table
    pub async fn bind(config: &Config) -> Result<Self, SocksError> {
        config.validate().map_err(SocksError::Config)?;
        Self::listen(config, SessionContext::from_config(config)).await
    }

    /// Bind the listener with an external credential verifier
    ///
    /// The configured user table is ignored.
    pub async fn bind_with_verifier(
        config: &Config,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, SocksError> {
        config.server.validate().map_err(SocksError::Config)?;
        config.socks.validate_limits().map_err(SocksError::Config)?;
        let ctx = SessionContext::from_config(config).with_verifier(verifier);
        Self::listen(config, ctx).await
    }

    async fn listen(config: &Config, ctx: SessionContext) -> Result<Self, SocksError> {
        let listener = TcpListener::bind(&config.server.listen_addr).await?;
        info!("SOCKS server listening on {}", listener.local_addr()?);

        Ok(SocksServer {
            listener,
            ctx: Arc::new(ctx),
            shutdown: config.server.shutdown,
            drain_timeout: config.server.drain_timeout(),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, SocksError> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of sessions currently running
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Run the server on a background task
    pub fn spawn(self) -> Result<ServerHandle, SocksError> {
        let local_addr = self.local_addr()?;
        let active = self.active.clone();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let join_handle = tokio::spawn(self.run(shutdown_rx));

        Ok(ServerHandle::new(local_addr, active, shutdown_tx, join_handle))
    }

    /// Accept clients until shutdown is signalled
    ///
    /// The listener is closed as soon as the signal arrives. In-flight
    /// sessions are then handled according to the shutdown policy.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<(), SocksError> {
        let SocksServer {
            listener,
            ctx,
            shutdown,
            drain_timeout,
            active,
        } = self;

        let mut sessions = JoinSet::new();
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        next_id += 1;
                        spawn_session(&mut sessions, next_id, stream, peer, ctx.clone(), active.clone());
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            error!("Session task panicked: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, closing listener");
                    break;
                }
            }
        }

        drop(listener);
        finish_sessions(sessions, shutdown, drain_timeout).await;

        info!("SOCKS server stopped");
        Ok(())
    }
}

fn spawn_session(
    sessions: &mut JoinSet<()>,
    id: u64,
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<SessionContext>,
    active: Arc<AtomicUsize>,
) {
    let guard = SessionGuard::new(active);
    let span = info_span!("session", id, %peer);

    sessions.spawn(
        async move {
            let _guard = guard;
            debug!("Accepted connection");
            ctx.socket_opts.hint(&stream);

            let local_addr = stream.local_addr();
            let mut session = Session::new(id, stream, ctx).with_peer(peer);
            if let Ok(addr) = local_addr {
                session = session.with_local_addr(addr);
            }

            match session.run().await {
                Ok(stats) => debug!(
                    "Session finished: {} bytes up, {} bytes down",
                    stats.client_to_target, stats.target_to_client
                ),
                Err(e) if is_routine(&e) => debug!("Session ended: {}", e),
                Err(e) => warn!("Session failed: {}", e),
            }
        }
        .instrument(span),
    );
}

async fn finish_sessions(mut sessions: JoinSet<()>, policy: ShutdownPolicy, drain_timeout: Duration) {
    match policy {
        ShutdownPolicy::Detach => {
            if !sessions.is_empty() {
                info!("Leaving {} sessions running", sessions.len());
            }
            sessions.detach_all();
        }
        ShutdownPolicy::Abort => {
            info!("Aborting {} sessions", sessions.len());
            sessions.shutdown().await;
        }
        ShutdownPolicy::Drain => {
            info!("Draining {} sessions", sessions.len());
            let drained = tokio::time::timeout(drain_timeout, async {
                while sessions.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!("Drain timeout expired, aborting {} sessions", sessions.len());
                sessions.shutdown().await;
            }
        }
    }
}

/// Whether a session error is routine client behaviour rather than a fault
fn is_routine(error: &SocksError) -> bool {
    matches!(
        error,
        SocksError::Io(_)
            | SocksError::Protocol(ProtocolError::UnexpectedEof)
            | SocksError::AuthenticationFailure(_)
            | SocksError::Dial { .. }
    )
}
