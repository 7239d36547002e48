//! Client side of the handshake
//!
//! Small helpers that speak SOCKS4/4a/5 to a proxy over any stream. They
//! return the proxy's [`Reply`] as-is; callers check
//! [`Reply::is_success`].

use crate::error::{ProtocolError, SocksError};
use crate::socks::auth::AuthMethod;
use crate::socks::codec::{decode_reply, encode_greeting, encode_request, encode_userpass, read_exact};
use crate::socks::consts::*;
use crate::socks::types::{Command, Credential, Reply, Request, TargetAddr, Version};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Negotiate a SOCKS5 method, authenticating with `credential` if the proxy
/// selects username/password
///
/// No-auth is always offered; username/password only when a credential is
/// given.
pub async fn socks5_handshake<S>(
    stream: &mut S,
    credential: Option<&Credential>,
) -> Result<AuthMethod, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let methods: &[u8] = if credential.is_some() {
        &[SOCKS5_AUTH_METHOD_NONE, SOCKS5_AUTH_METHOD_PASSWORD]
    } else {
        &[SOCKS5_AUTH_METHOD_NONE]
    };
    stream.write_all(&encode_greeting(methods)?).await?;
    stream.flush().await?;

    let mut selection = [0u8; 2];
    read_exact(stream, &mut selection).await?;
    if selection[0] != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(selection[0]).into());
    }

    let method = match AuthMethod::from_byte(selection[1]) {
        Some(method) => method,
        None if selection[1] == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE => {
            return Err(ProtocolError::NoAcceptableMethod.into())
        }
        None => {
            return Err(ProtocolError::Malformed(format!(
                "proxy selected unoffered method {}",
                selection[1]
            ))
            .into())
        }
    };

    if method == AuthMethod::Password {
        let credential = credential.ok_or_else(|| {
            ProtocolError::Malformed("proxy selected password without an offer".into())
        })?;
        stream.write_all(&encode_userpass(credential)?).await?;
        stream.flush().await?;

        let mut status = [0u8; 2];
        read_exact(stream, &mut status).await?;
        if status[1] != SOCKS5_AUTH_STATUS_SUCCESS {
            return Err(SocksError::AuthenticationFailure(
                credential.username().to_string(),
            ));
        }
    }

    Ok(method)
}

/// Send a SOCKS5 request and read the first reply
pub async fn socks5_request<S>(
    stream: &mut S,
    command: Command,
    target: TargetAddr,
) -> Result<Reply, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_request(stream, Request::new(Version::V5, command, target)).await
}

/// Send a SOCKS4 request, or SOCKS4a for domain targets, and read the reply
pub async fn socks4_request<S>(
    stream: &mut S,
    command: Command,
    target: TargetAddr,
) -> Result<Reply, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_request(stream, Request::new(Version::V4, command, target)).await
}

async fn send_request<S>(stream: &mut S, request: Request) -> Result<Reply, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&encode_request(&request)?).await?;
    stream.flush().await?;
    decode_reply(stream, request.version()).await
}
