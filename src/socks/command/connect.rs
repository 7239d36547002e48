//! CONNECT command
//!
//! Dials the target once, within the configured timeout, and reports the
//! outcome to the client.

use crate::error::{SocksError, Socks5Status};
use crate::helper::SocketOpts;
use crate::socks::codec::send_reply;
use crate::socks::types::{Reply, Request};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Handle TCP CONNECT
///
/// On success the reply carries the local address of the dialed socket and
/// the connected target stream is returned. Failures are returned without
/// a reply; the status to report is available from
/// [`SocksError::reply_status`].
pub async fn handle_connect<S>(
    stream: &mut S,
    request: &Request,
    timeout: Duration,
    socket_opts: &SocketOpts,
) -> Result<TcpStream, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let target = dial(request, timeout).await?;
    socket_opts.hint(&target);

    let local_addr = target.local_addr()?;
    send_reply(stream, &Reply::success(request.version(), local_addr)).await?;

    info!("Tunnel established to {}", request.target());
    Ok(target)
}

/// Resolve and dial the request target
///
/// Resolution and the connect share one `timeout` budget.
pub async fn dial(request: &Request, timeout: Duration) -> Result<TcpStream, SocksError> {
    let target = request.target();
    let connect = async {
        let socket_addr = target.resolve().await?;
        debug!("Connecting to target: {}", socket_addr);
        TcpStream::connect(socket_addr).await.map_err(|e| {
            debug!("Failed to connect to {}: {}", socket_addr, e);
            SocksError::dial(e)
        })
    };

    match tokio::time::timeout(timeout, connect).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Connection timeout to {}", target);
            Err(SocksError::Dial {
                status: Socks5Status::HostUnreachable,
                source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
            })
        }
    }
}
