//! Username/password authentication handler
//!
//! Implements the server side of RFC 1929.

use super::verifier::CredentialVerifier;
use crate::error::{ProtocolError, SocksError};
use crate::socks::codec::{decode_userpass, encode_auth_status};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Run the username/password sub-negotiation
///
/// On success the status `0` is sent and the username returned. A malformed
/// request or rejected credentials get a failure status; the caller then
/// closes the connection.
pub async fn authenticate_password<S>(
    stream: &mut S,
    verifier: &dyn CredentialVerifier,
) -> Result<String, SocksError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let credential = match decode_userpass(stream).await {
        Ok(credential) => credential,
        Err(e @ SocksError::Protocol(ProtocolError::Malformed(_))) => {
            send_auth_result(stream, false).await?;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if verifier
        .verify(credential.username(), credential.password())
        .await
    {
        send_auth_result(stream, true).await?;
        tracing::debug!("Authentication successful for user: {}", credential.username());
        Ok(credential.username().to_string())
    } else {
        send_auth_result(stream, false).await?;
        Err(SocksError::AuthenticationFailure(
            credential.username().to_string(),
        ))
    }
}

/// Send authentication result to client
async fn send_auth_result<S: AsyncWrite + Unpin>(
    stream: &mut S,
    success: bool,
) -> Result<(), SocksError> {
    stream.write_all(&encode_auth_status(success)).await?;
    stream.flush().await?;
    Ok(())
}
