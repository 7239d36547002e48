//! Username/password sub-negotiation frames (RFC 1929)

use super::{read_exact, read_u8};
use crate::error::{ProtocolError, SocksError};
use crate::socks::consts::*;
use crate::socks::types::Credential;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncRead;

/// Decode a username/password request
///
/// ```text
/// +----+------+----------+------+----------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
/// +----+------+----------+------+----------+
/// | 1  |  1   | 1 to 255 |  1   | 0 to 255 |
/// +----+------+----------+------+----------+
/// ```
pub async fn decode_userpass<S>(stream: &mut S) -> Result<Credential, SocksError>
where
    S: AsyncRead + Unpin,
{
    let version = read_u8(stream).await?;
    if version != SOCKS5_AUTH_VERSION {
        return Err(
            ProtocolError::Malformed(format!("invalid auth version: {}", version)).into(),
        );
    }

    let username_len = read_u8(stream).await? as usize;
    if username_len == 0 {
        return Err(ProtocolError::Malformed("empty username".into()).into());
    }
    let mut username = vec![0u8; username_len];
    read_exact(stream, &mut username).await?;

    let password_len = read_u8(stream).await? as usize;
    let mut password = vec![0u8; password_len];
    read_exact(stream, &mut password).await?;

    let username = String::from_utf8(username)
        .map_err(|_| ProtocolError::Malformed("invalid UTF-8 in username".into()))?;
    let password = String::from_utf8(password)
        .map_err(|_| ProtocolError::Malformed("invalid UTF-8 in password".into()))?;

    Ok(Credential::new(username, password))
}

/// Encode the server's verdict: `[0x05][STATUS]`
pub fn encode_auth_status(success: bool) -> [u8; 2] {
    let status = if success {
        SOCKS5_AUTH_STATUS_SUCCESS
    } else {
        SOCKS5_AUTH_STATUS_FAILURE
    };
    [SOCKS5_AUTH_REPLY_VERSION, status]
}

/// Encode a username/password request as a client would send it
pub fn encode_userpass(credential: &Credential) -> Result<Bytes, SocksError> {
    let username = credential.username().as_bytes();
    let password = credential.password().as_bytes();

    if username.is_empty() || username.len() > u8::MAX as usize {
        return Err(ProtocolError::Malformed(format!(
            "invalid username length: {}",
            username.len()
        ))
        .into());
    }
    if password.len() > u8::MAX as usize {
        return Err(ProtocolError::Malformed(format!(
            "invalid password length: {}",
            password.len()
        ))
        .into());
    }

    let mut buf = BytesMut::with_capacity(3 + username.len() + password.len());
    buf.put_u8(SOCKS5_AUTH_VERSION);
    buf.put_u8(username.len() as u8);
    buf.put_slice(username);
    buf.put_u8(password.len() as u8);
    buf.put_slice(password);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn create_auth_request(username: &str, password: &str) -> Vec<u8> {
        let mut request = Vec::new();
        request.push(SOCKS5_AUTH_VERSION);
        request.push(username.len() as u8);
        request.extend_from_slice(username.as_bytes());
        request.push(password.len() as u8);
        request.extend_from_slice(password.as_bytes());
        request
    }

    #[tokio::test]
    async fn test_decode_userpass() {
        let mut cursor = Cursor::new(create_auth_request("admin", "secret123"));
        let credential = decode_userpass(&mut cursor).await.unwrap();
        assert_eq!(credential.username(), "admin");
        assert_eq!(credential.password(), "secret123");
    }

    #[tokio::test]
    async fn test_decode_userpass_empty_password_allowed() {
        let mut cursor = Cursor::new(create_auth_request("admin", ""));
        let credential = decode_userpass(&mut cursor).await.unwrap();
        assert_eq!(credential.password(), "");
    }

    #[tokio::test]
    async fn test_decode_userpass_zero_username_length() {
        let mut cursor = Cursor::new(create_auth_request("", "pass"));
        let err = decode_userpass(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            SocksError::Protocol(ProtocolError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_decode_userpass_invalid_version() {
        let mut request = create_auth_request("user", "pass");
        request[0] = 0x05;
        let mut cursor = Cursor::new(request);
        let err = decode_userpass(&mut cursor).await.unwrap_err();
        assert!(err.to_string().contains("invalid auth version"));
    }

    #[tokio::test]
    async fn test_decode_userpass_truncated() {
        let mut request = create_auth_request("user", "password");
        request.truncate(9);
        let mut cursor = Cursor::new(request);
        let err = decode_userpass(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            SocksError::Protocol(ProtocolError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_encode_auth_status() {
        assert_eq!(encode_auth_status(true), [0x05, 0x00]);
        assert_eq!(encode_auth_status(false), [0x05, 0x01]);
    }

    #[test]
    fn test_encode_userpass_matches_wire_layout() {
        let bytes = encode_userpass(&Credential::new("user", "pass")).unwrap();
        assert_eq!(&bytes[..], &create_auth_request("user", "pass")[..]);
        assert!(encode_userpass(&Credential::new("", "pass")).is_err());
    }
}
