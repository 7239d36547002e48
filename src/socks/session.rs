//! Session negotiator
//!
//! One [`Session`] per accepted client connection. It drives the codec
//! through version detection, method negotiation and authentication (SOCKS5
//! only) and request decoding, then hands the request to the command
//! executor and the resulting sockets to the tunnel.
//!
//! States only ever move forward:
//!
//! ```text
//! Start -> VersionDetected -> MethodNegotiated (v5) -> Authenticated
//!       -> RequestReceived -> Replied -> Tunneling
//! ```
//!
//! `Closed` is reachable from every other state and is terminal.

use crate::config::{Config, SocksConfig, VersionPolicy};
use crate::error::{ProtocolError, SocksError, Socks5Status};
use crate::helper::SocketOpts;
use crate::socks::auth::{
    authenticate_password, negotiate_method, select_auth_method, AuthMethod, CredentialVerifier,
    StaticCredentials,
};
use crate::socks::codec::{
    decode_methods, decode_request, decode_socks4_header, decode_socks4_request, read_version,
    send_reply,
};
use crate::socks::command;
use crate::socks::tunnel::{relay, TunnelStats};
use crate::socks::types::{Reply, Request, Version};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing read yet
    Start,
    /// First byte identified the protocol version
    VersionDetected(Version),
    /// SOCKS5 method selection sent
    MethodNegotiated,
    /// Client may send its request
    Authenticated,
    /// Request decoded
    RequestReceived,
    /// Command executed and success reply sent
    Replied,
    /// Relaying data
    Tunneling,
    /// Terminal
    Closed,
}

impl SessionState {
    fn rank(self) -> u8 {
        match self {
            SessionState::Start => 0,
            SessionState::VersionDetected(_) => 1,
            SessionState::MethodNegotiated => 2,
            SessionState::Authenticated => 3,
            SessionState::RequestReceived => 4,
            SessionState::Replied => 5,
            SessionState::Tunneling => 6,
            SessionState::Closed => 7,
        }
    }

    /// Whether moving from `self` to `next` keeps the session monotonic
    pub fn can_transition_to(self, next: SessionState) -> bool {
        match (self, next) {
            (SessionState::Closed, _) => false,
            (_, SessionState::Closed) => true,
            // Method negotiation only exists in SOCKS5
            (SessionState::VersionDetected(Version::V4), SessionState::MethodNegotiated) => false,
            (current, next) => next.rank() == current.rank() + 1 || skips_method(current, next),
        }
    }

    /// Whether the session has finished
    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }

    /// Whether the client has reached the request phase and may expect a reply
    fn awaits_reply(self) -> bool {
        matches!(
            self,
            SessionState::Authenticated | SessionState::RequestReceived
        )
    }
}

/// SOCKS4 has no method negotiation and goes straight to the request phase
fn skips_method(current: SessionState, next: SessionState) -> bool {
    matches!(
        (current, next),
        (
            SessionState::VersionDetected(Version::V4),
            SessionState::Authenticated
        )
    )
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Start => write!(f, "start"),
            SessionState::VersionDetected(v) => write!(f, "version detected ({})", v),
            SessionState::MethodNegotiated => write!(f, "method negotiated"),
            SessionState::Authenticated => write!(f, "authenticated"),
            SessionState::RequestReceived => write!(f, "request received"),
            SessionState::Replied => write!(f, "replied"),
            SessionState::Tunneling => write!(f, "tunneling"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Authentication progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No authentication performed or needed
    None,
    /// Username/password selected, not yet verified
    Required,
    /// Credentials accepted
    Passed,
}

/// Settings shared by every session of a server
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// SOCKS protocol settings
    pub socks: SocksConfig,
    /// Versions the server speaks
    pub version_policy: VersionPolicy,
    /// Options applied to dialed and accepted target sockets
    pub socket_opts: SocketOpts,
    /// Verifier for SOCKS5 username/password authentication
    pub verifier: Option<Arc<dyn CredentialVerifier>>,
}

impl SessionContext {
    /// Build a context from configuration, using the configured users as
    /// the credential table
    pub fn from_config(config: &Config) -> Self {
        let verifier = config.socks.has_credentials().then(|| {
            Arc::new(StaticCredentials::from_users(&config.socks.users))
                as Arc<dyn CredentialVerifier>
        });

        SessionContext {
            socks: config.socks.clone(),
            version_policy: config.server.version,
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
            verifier,
        }
    }

    /// Replace the SOCKS settings
    pub fn with_socks_config(mut self, socks: SocksConfig) -> Self {
        self.socks = socks;
        self
    }

    /// Restrict the accepted versions
    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }

    /// Replace the socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Use `verifier` for username/password authentication
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }
}

/// A single client connection and its negotiation state
pub struct Session<S> {
    id: u64,
    stream: S,
    ctx: Arc<SessionContext>,
    state: SessionState,
    auth: AuthState,
    version: Option<Version>,
    username: Option<String>,
    peer: Option<SocketAddr>,
    local_addr: Option<SocketAddr>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session in the `Start` state
    pub fn new(id: u64, stream: S, ctx: Arc<SessionContext>) -> Self {
        Session {
            id,
            stream,
            ctx,
            state: SessionState::Start,
            auth: AuthState::None,
            version: None,
            username: None,
            peer: None,
            local_addr: None,
        }
    }

    /// Record the client's address
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Record the local address the client connected to; BIND listens on its IP
    pub fn with_local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    /// Identifier assigned by the server
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Negotiated protocol version, once detected
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Authentication progress
    pub fn auth_state(&self) -> AuthState {
        self.auth
    }

    /// Authenticated username, if any
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Client address, when known
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Run negotiation up to a decoded request
    ///
    /// On failure the session is `Closed`. If the client had reached the
    /// request phase it was sent an error reply first.
    pub async fn negotiate(&mut self) -> Result<Request, SocksError> {
        match self.negotiate_request().await {
            Ok(request) => Ok(request),
            Err(e) => {
                self.fail(&e).await;
                Err(e)
            }
        }
    }

    /// Drive the whole session: negotiate, execute the command, relay
    pub async fn run(mut self) -> Result<TunnelStats, SocksError> {
        let request = self.negotiate().await?;
        info!("SOCKS{} {} request to {}", request.version(), request.command(), request.target());

        let local_ip = self
            .local_addr
            .map(|addr| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let target = match command::execute(&mut self.stream, &request, &self.ctx, local_ip).await
        {
            Ok(target) => target,
            Err(e) => {
                warn!("{} to {} failed: {}", request.command(), request.target(), e);
                self.fail(&e).await;
                return Err(e);
            }
        };

        self.transition(SessionState::Replied)?;
        self.transition(SessionState::Tunneling)?;

        let buffer_size = self.ctx.socks.relay_buffer_size;
        let stats = relay(self.stream, target, buffer_size).await;
        info!(
            "Tunnel to {} closed: {} bytes up, {} bytes down",
            request.target(),
            stats.client_to_target,
            stats.target_to_client
        );
        Ok(stats)
    }

    async fn negotiate_request(&mut self) -> Result<Request, SocksError> {
        let version = read_version(&mut self.stream).await?;
        if !self.ctx.version_policy.allows(version) {
            return Err(ProtocolError::UnsupportedVersion(version.to_byte()).into());
        }
        self.version = Some(version);
        self.transition(SessionState::VersionDetected(version))?;

        let request = match version {
            Version::V5 => {
                self.authenticate().await?;
                self.transition(SessionState::Authenticated)?;
                decode_request(&mut self.stream).await?
            }
            Version::V4 => {
                self.transition(SessionState::Authenticated)?;
                let header = decode_socks4_header(&mut self.stream).await?;
                let request = decode_socks4_request(&mut self.stream, &header).await?;
                if !request.target().is_socks4_compatible() {
                    return Err(ProtocolError::AddressTypeNotSupported(
                        request.target().addr_type().to_byte(),
                    )
                    .into());
                }
                request
            }
        };

        self.transition(SessionState::RequestReceived)?;
        Ok(request)
    }

    /// SOCKS5 method negotiation and, if selected, username/password
    async fn authenticate(&mut self) -> Result<(), SocksError> {
        let methods = decode_methods(&mut self.stream).await?;
        let selected = select_auth_method(
            &methods,
            self.ctx.verifier.is_some(),
            self.ctx.socks.auth_required,
        );
        debug!("Client offered methods {:?}, selected {:?}", methods, selected);

        let method = negotiate_method(&mut self.stream, selected).await?;
        self.transition(SessionState::MethodNegotiated)?;

        if method == AuthMethod::Password {
            self.auth = AuthState::Required;
            let verifier = self.ctx.verifier.clone().ok_or_else(|| {
                SocksError::Config("password authentication without a verifier".into())
            })?;
            let username = authenticate_password(&mut self.stream, verifier.as_ref()).await?;
            self.auth = AuthState::Passed;
            self.username = Some(username);
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SocksError> {
        if !self.state.can_transition_to(next) {
            return Err(ProtocolError::InvalidTransition(format!("{} -> {}", self.state, next)).into());
        }
        debug!("Session {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Report `error` to the client if it can still use a reply, then close
    async fn fail(&mut self, error: &SocksError) {
        // Past authentication any wire violation short of EOF still earns a reply
        let status = error.reply_status().or(match error {
            SocksError::Protocol(ProtocolError::UnexpectedEof) => None,
            SocksError::Protocol(_) => Some(Socks5Status::GeneralFailure),
            _ => None,
        });
        if let (true, Some(version), Some(status)) =
            (self.state.awaits_reply(), self.version, status)
        {
            let status = match status {
                Socks5Status::Succeeded => Socks5Status::GeneralFailure,
                status => status,
            };
            if let Err(e) = send_reply(&mut self.stream, &Reply::failure(version, status)).await {
                debug!("Failed to send error reply: {}", e);
            }
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!("Failed to shut down client stream: {}", e);
        }
        debug!("Session {}: {} -> {} ({})", self.id, self.state, SessionState::Closed, error);
        self.state = SessionState::Closed;
    }
}
