//! SOCKS5 authentication module
//!
//! Handles method negotiation and username/password authentication.

mod password;
mod verifier;

pub use password::authenticate_password;
pub use verifier::{CredentialVerifier, StaticCredentials};

use crate::error::{ProtocolError, SocksError};
use crate::socks::codec::encode_method_selection;
use crate::socks::consts::*;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::None),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::Password),
            _ => None,
        }
    }
}

/// Select the authentication method for the offered `methods`
///
/// Username/password wins whenever it is offered and a verifier is
/// configured. No-auth is only acceptable when authentication is not
/// required.
pub fn select_auth_method(
    methods: &[u8],
    verifier_configured: bool,
    auth_required: bool,
) -> Option<AuthMethod> {
    if verifier_configured && methods.contains(&SOCKS5_AUTH_METHOD_PASSWORD) {
        return Some(AuthMethod::Password);
    }
    if !auth_required && methods.contains(&SOCKS5_AUTH_METHOD_NONE) {
        return Some(AuthMethod::None);
    }
    None
}

/// Send the method selection for `selected`
///
/// When nothing is acceptable `0xFF` is sent and
/// [`ProtocolError::NoAcceptableMethod`] returned; the caller closes the
/// connection.
pub async fn negotiate_method<S>(
    stream: &mut S,
    selected: Option<AuthMethod>,
) -> Result<AuthMethod, SocksError>
where
    S: AsyncWrite + Unpin,
{
    let byte = selected
        .map(AuthMethod::to_byte)
        .unwrap_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE);
    stream.write_all(&encode_method_selection(byte)).await?;
    stream.flush().await?;

    selected.ok_or_else(|| ProtocolError::NoAcceptableMethod.into())
}
