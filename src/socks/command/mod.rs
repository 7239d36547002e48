//! Command executor
//!
//! Carries out a decoded request and produces the socket the tunnel will
//! relay to. Every command is a single attempt.

mod bind;
mod connect;

pub use bind::handle_bind;
pub use connect::{dial, handle_connect};

use crate::error::{ProtocolError, SocksError, Socks5Status};
use crate::socks::session::SessionContext;
use crate::socks::types::{Command, Request};
use std::net::IpAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::warn;

/// Execute `request` for the client on `stream`
///
/// Success replies are written here. On failure nothing has been written
/// for the failing step and the error carries the status to report.
pub async fn execute<S>(
    stream: &mut S,
    request: &Request,
    ctx: &SessionContext,
    local_ip: IpAddr,
) -> Result<TcpStream, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match request.command() {
        Command::Connect => {
            handle_connect(
                stream,
                request,
                ctx.socks.connect_timeout(),
                &ctx.socket_opts,
            )
            .await
        }
        Command::Bind => {
            if !ctx.socks.allow_bind {
                warn!("BIND not allowed by configuration");
                return Err(SocksError::CommandRejected {
                    command: Command::Bind,
                    status: Socks5Status::ConnectionNotAllowed,
                });
            }
            handle_bind(
                stream,
                request,
                local_ip,
                ctx.socks.bind_timeout(),
                &ctx.socket_opts,
            )
            .await
        }
        Command::UdpAssociate => {
            // UDP relaying is not provided
            Err(ProtocolError::CommandNotSupported(Command::UdpAssociate.to_byte()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SocksConfig;
    use crate::socks::types::{TargetAddr, Version};
    use std::net::Ipv4Addr;
    use tokio::io::{duplex, AsyncReadExt};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn test_execute_udp_associate_not_supported() {
        let (_client, mut server) = duplex(1024);
        let request = Request::new(
            Version::V5,
            Command::UdpAssociate,
            TargetAddr::unspecified(),
        );

        let err = execute(&mut server, &request, &SessionContext::default(), LOCALHOST)
            .await
            .unwrap_err();
        assert_eq!(err.reply_status(), Some(Socks5Status::CommandNotSupported));
    }

    #[tokio::test]
    async fn test_execute_bind_disabled() {
        let (mut client, mut server) = duplex(1024);
        let ctx = SessionContext::default().with_socks_config(SocksConfig {
            allow_bind: false,
            ..Default::default()
        });
        let request = Request::new(
            Version::V5,
            Command::Bind,
            TargetAddr::ipv4(Ipv4Addr::LOCALHOST, 0),
        );

        let err = execute(&mut server, &request, &ctx, LOCALHOST)
            .await
            .unwrap_err();
        assert_eq!(err.reply_status(), Some(Socks5Status::ConnectionNotAllowed));

        // Nothing was written; the session owns the failure reply
        drop(server);
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_execute_connect() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (mut client, mut server) = duplex(1024);
        let request = Request::new(Version::V5, Command::Connect, TargetAddr::from(addr));

        let target = execute(&mut server, &request, &SessionContext::default(), LOCALHOST)
            .await
            .unwrap();
        assert_eq!(target.peer_addr().unwrap(), addr);

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], 0x00);
    }
}
