//! BIND command
//!
//! Opens a listener for exactly one inbound connection. The client gets a
//! first reply with the listen address and a second one with the address of
//! the peer that connected.

use crate::error::{SocksError, Socks5Status};
use crate::helper::SocketOpts;
use crate::socks::codec::send_reply;
use crate::socks::types::{Reply, Request};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Handle BIND
///
/// The listener is bound on `local_ip`, the address the client connection
/// arrived on, with an ephemeral port. Waiting for the inbound connection
/// is bounded by `timeout` and cancelled if the client closes its side.
/// The listener is closed as soon as the wait ends.
pub async fn handle_bind<S>(
    stream: &mut S,
    request: &Request,
    local_ip: IpAddr,
    timeout: Duration,
    socket_opts: &SocketOpts,
) -> Result<TcpStream, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let listener = TcpListener::bind(SocketAddr::new(local_ip, 0))
        .await
        .map_err(|source| SocksError::Dial {
            status: Socks5Status::GeneralFailure,
            source,
        })?;
    let listen_addr = listener.local_addr()?;

    send_reply(stream, &Reply::success(request.version(), listen_addr)).await?;
    debug!("BIND listening on {} for {}", listen_addr, request.target());

    let (inbound, peer) = accept_one(stream, listener, timeout).await?;
    socket_opts.hint(&inbound);

    send_reply(stream, &Reply::success(request.version(), peer)).await?;
    info!("BIND accepted {} on {}", peer, listen_addr);
    Ok(inbound)
}

/// Accept a single connection, consuming the listener
async fn accept_one<S>(
    stream: &mut S,
    listener: TcpListener,
    timeout: Duration,
) -> Result<(TcpStream, SocketAddr), SocksError>
where
    S: AsyncRead + Unpin,
{
    let mut probe = [0u8; 1];

    tokio::select! {
        accepted = tokio::time::timeout(timeout, listener.accept()) => match accepted {
            Ok(Ok(pair)) => Ok(pair),
            Ok(Err(source)) => Err(SocksError::Dial {
                status: Socks5Status::GeneralFailure,
                source,
            }),
            Err(_) => Err(SocksError::Dial {
                status: Socks5Status::TtlExpired,
                source: io::Error::new(io::ErrorKind::TimedOut, "BIND accept timed out"),
            }),
        },
        // The client must stay silent until the second reply
        read = stream.read(&mut probe) => match read {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "client closed during BIND",
            )
            .into()),
            Ok(_) => Err(crate::error::ProtocolError::Malformed(
                "client sent data before BIND completed".into(),
            )
            .into()),
            Err(e) => Err(e.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socks::types::{Command, TargetAddr, Version};
    use std::net::Ipv4Addr;
    use tokio::io::{duplex, AsyncWriteExt};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn bind_request(version: Version) -> Request {
        Request::new(
            version,
            Command::Bind,
            TargetAddr::ipv4(Ipv4Addr::LOCALHOST, 0),
        )
    }

    async fn read_v5_reply<S: AsyncRead + Unpin>(stream: &mut S) -> (u8, SocketAddr) {
        let mut reply = [0u8; 10];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[0], 0x05);
        assert_eq!(reply[3], 0x01);
        let ip = Ipv4Addr::new(reply[4], reply[5], reply[6], reply[7]);
        let port = u16::from_be_bytes([reply[8], reply[9]]);
        (reply[1], SocketAddr::new(IpAddr::V4(ip), port))
    }

    #[tokio::test]
    async fn test_bind_two_replies() {
        let (mut client, mut server) = duplex(1024);
        let request = bind_request(Version::V5);

        let handle = tokio::spawn(async move {
            let result = handle_bind(
                &mut server,
                &request,
                LOCALHOST,
                Duration::from_secs(5),
                &SocketOpts::default(),
            )
            .await;
            (result, server)
        });

        let (status, listen_addr) = read_v5_reply(&mut client).await;
        assert_eq!(status, 0x00);
        assert_ne!(listen_addr.port(), 0);

        let mut peer = TcpStream::connect(listen_addr).await.unwrap();
        let peer_local = peer.local_addr().unwrap();

        let (status, announced) = read_v5_reply(&mut client).await;
        assert_eq!(status, 0x00);
        assert_eq!(announced, peer_local);

        let (result, _server) = handle.await.unwrap();
        let mut inbound = result.unwrap();
        inbound.write_all(b"bound").await.unwrap();
        let mut buf = [0u8; 5];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"bound");

        // The listener is gone after the single accept
        assert!(TcpStream::connect(listen_addr).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_timeout() {
        let (mut client, mut server) = duplex(1024);
        let request = bind_request(Version::V5);

        let handle = tokio::spawn(async move {
            handle_bind(
                &mut server,
                &request,
                LOCALHOST,
                Duration::from_millis(50),
                &SocketOpts::default(),
            )
            .await
            .map(|_| ())
        });

        let (status, _) = read_v5_reply(&mut client).await;
        assert_eq!(status, 0x00);

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.reply_status(), Some(Socks5Status::TtlExpired));
    }

    #[tokio::test]
    async fn test_bind_cancelled_by_client_close() {
        let (mut client, mut server) = duplex(1024);
        let request = bind_request(Version::V4);

        let handle = tokio::spawn(async move {
            handle_bind(
                &mut server,
                &request,
                LOCALHOST,
                Duration::from_secs(30),
                &SocketOpts::default(),
            )
            .await
            .map(|_| ())
        });

        let mut reply = [0u8; 8];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], 90);
        drop(client);

        let err = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, SocksError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionAborted));
    }
}
