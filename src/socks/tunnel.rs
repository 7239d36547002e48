//! Bidirectional relay between a client and its target
//!
//! Each direction copies until EOF or error, then shuts down the write side
//! of its destination so the peer sees a half-close. The tunnel ends when
//! both directions have finished.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tracing::debug;

/// Bytes moved in each direction of a finished tunnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TunnelStats {
    /// Bytes copied from the client to the target
    pub client_to_target: u64,
    /// Bytes copied from the target to the client
    pub target_to_client: u64,
}

impl TunnelStats {
    /// Total bytes in both directions
    pub fn total(&self) -> u64 {
        self.client_to_target + self.target_to_client
    }
}

/// Relay data between `client` and `target` until both directions drain
///
/// I/O errors are local to their direction: the failing direction stops and
/// half-closes its destination while the other keeps running. A direction
/// that ends in error reports zero bytes.
pub async fn relay<C, T>(client: C, target: T, buffer_size: usize) -> TunnelStats
where
    C: AsyncRead + AsyncWrite + Unpin,
    T: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (target_read, target_write) = tokio::io::split(target);

    let (client_to_target, target_to_client) = tokio::join!(
        pump(client_read, target_write, buffer_size, "client->target"),
        pump(target_read, client_write, buffer_size, "target->client"),
    );

    TunnelStats {
        client_to_target,
        target_to_client,
    }
}

/// Copy one direction, then shut down the destination's write side
async fn pump<R, W>(
    reader: ReadHalf<R>,
    mut writer: WriteHalf<W>,
    buffer_size: usize,
    direction: &'static str,
) -> u64
where
    R: AsyncRead,
    W: AsyncWrite,
{
    let mut reader = BufReader::with_capacity(buffer_size.max(1), reader);
    let total = match tokio::io::copy_buf(&mut reader, &mut writer).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("{} error: {}", direction, e);
            0
        }
    };

    if let Err(e) = writer.shutdown().await {
        debug!("{} shutdown error: {}", direction, e);
    }
    debug!("{} finished: {} bytes", direction, total);
    total
}
