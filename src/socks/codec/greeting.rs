//! Greeting frames
//!
//! The first frame a client sends. For SOCKS5 it carries the offered
//! authentication methods; for SOCKS4 the greeting is the request header
//! itself.

use super::{read_exact, read_nul_terminated, read_port, read_u8};
use crate::error::{ProtocolError, SocksError};
use crate::socks::consts::*;
use crate::socks::types::Version;
use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;
use tokio::io::AsyncRead;

/// Fixed part of a SOCKS4 request, following the version byte
///
/// ```text
/// +----+----+----+----+----+----+----+----+----+----+....+----+
/// | VN | CD | DSTPORT |      DSTIP        | USERID       |NULL|
/// +----+----+----+----+----+----+----+----+----+----+....+----+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks4Header {
    /// Raw command byte
    pub command: u8,
    /// Destination port
    pub port: u16,
    /// Destination IPv4 address, or the SOCKS4a sentinel `0.0.0.x`
    pub ip: Ipv4Addr,
    /// User id, discarded by the server
    pub user_id: Vec<u8>,
}

impl Socks4Header {
    /// Whether the address is the SOCKS4a `0.0.0.x` (x != 0) sentinel
    pub fn is_socks4a(&self) -> bool {
        let octets = self.ip.octets();
        octets[..3] == [0, 0, 0] && octets[3] != 0
    }
}

/// Decoded client greeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Greeting {
    /// SOCKS5 method offer
    V5 {
        /// Offered authentication method identifiers
        methods: Vec<u8>,
    },
    /// SOCKS4 request header
    V4(Socks4Header),
}

impl Greeting {
    /// Protocol version of the greeting
    pub fn version(&self) -> Version {
        match self {
            Greeting::V5 { .. } => Version::V5,
            Greeting::V4(_) => Version::V4,
        }
    }
}

/// Read the leading version byte of a connection
pub async fn read_version<S>(stream: &mut S) -> Result<Version, SocksError>
where
    S: AsyncRead + Unpin,
{
    let byte = read_u8(stream).await?;
    Version::from_byte(byte).ok_or_else(|| ProtocolError::UnsupportedVersion(byte).into())
}

/// Decode a complete greeting, version byte included
pub async fn decode_greeting<S>(stream: &mut S) -> Result<Greeting, SocksError>
where
    S: AsyncRead + Unpin,
{
    match read_version(stream).await? {
        Version::V5 => Ok(Greeting::V5 {
            methods: decode_methods(stream).await?,
        }),
        Version::V4 => Ok(Greeting::V4(decode_socks4_header(stream).await?)),
    }
}

/// Decode the SOCKS5 method list that follows the version byte
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 1 to 255 |
/// +----+----------+----------+
/// ```
pub async fn decode_methods<S>(stream: &mut S) -> Result<Vec<u8>, SocksError>
where
    S: AsyncRead + Unpin,
{
    let num_methods = read_u8(stream).await?;
    if num_methods == 0 {
        return Err(ProtocolError::Malformed("no authentication methods offered".into()).into());
    }

    let mut methods = vec![0u8; num_methods as usize];
    read_exact(stream, &mut methods).await?;
    Ok(methods)
}

/// Decode the SOCKS4 header that follows the version byte
pub async fn decode_socks4_header<S>(stream: &mut S) -> Result<Socks4Header, SocksError>
where
    S: AsyncRead + Unpin,
{
    let command = read_u8(stream).await?;
    let port = read_port(stream).await?;
    let mut ip = [0u8; 4];
    read_exact(stream, &mut ip).await?;
    let user_id = read_nul_terminated(stream, MAX_SOCKS4_FIELD_LEN, "SOCKS4 user id").await?;

    Ok(Socks4Header {
        command,
        port,
        ip: Ipv4Addr::from(ip),
        user_id,
    })
}

/// Encode the server's method selection: `[0x05][METHOD]`
pub fn encode_method_selection(method: u8) -> [u8; 2] {
    [SOCKS5_VERSION, method]
}

/// Encode a SOCKS5 client greeting offering `methods`
pub fn encode_greeting(methods: &[u8]) -> Result<Bytes, SocksError> {
    if methods.is_empty() || methods.len() > u8::MAX as usize {
        return Err(ProtocolError::Malformed(format!(
            "cannot offer {} methods",
            methods.len()
        ))
        .into());
    }

    let mut buf = BytesMut::with_capacity(2 + methods.len());
    buf.put_u8(SOCKS5_VERSION);
    buf.put_u8(methods.len() as u8);
    buf.put_slice(methods);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_decode_greeting_v5() {
        let mut cursor = Cursor::new(vec![
            SOCKS5_VERSION,
            2,
            SOCKS5_AUTH_METHOD_NONE,
            SOCKS5_AUTH_METHOD_PASSWORD,
        ]);
        let greeting = decode_greeting(&mut cursor).await.unwrap();
        assert_eq!(
            greeting,
            Greeting::V5 {
                methods: vec![SOCKS5_AUTH_METHOD_NONE, SOCKS5_AUTH_METHOD_PASSWORD]
            }
        );
        assert_eq!(greeting.version(), Version::V5);
    }

    #[tokio::test]
    async fn test_decode_greeting_v4() {
        let mut data = vec![SOCKS4_VERSION, SOCKS_CMD_TCP_CONNECT, 0x00, 0x50, 10, 0, 0, 1];
        data.extend_from_slice(b"fred\0");
        let mut cursor = Cursor::new(data);

        let greeting = decode_greeting(&mut cursor).await.unwrap();
        match greeting {
            Greeting::V4(header) => {
                assert_eq!(header.command, SOCKS_CMD_TCP_CONNECT);
                assert_eq!(header.port, 80);
                assert_eq!(header.ip, Ipv4Addr::new(10, 0, 0, 1));
                assert_eq!(header.user_id, b"fred");
                assert!(!header.is_socks4a());
            }
            other => panic!("Expected SOCKS4 greeting, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decode_greeting_unsupported_version() {
        for first in [0u8, 1, 3, 6, 0x47, 0xFF] {
            let mut cursor = Cursor::new(vec![first, 1, 0]);
            let err = decode_greeting(&mut cursor).await.unwrap_err();
            assert!(matches!(
                err,
                SocksError::Protocol(ProtocolError::UnsupportedVersion(v)) if v == first
            ));
        }
    }

    #[tokio::test]
    async fn test_decode_methods_zero_count() {
        let mut cursor = Cursor::new(vec![0u8]);
        assert!(decode_methods(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn test_decode_methods_truncated() {
        let mut cursor = Cursor::new(vec![3u8, 0]);
        let err = decode_methods(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            SocksError::Protocol(ProtocolError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_socks4a_sentinel() {
        let mut header = Socks4Header {
            command: SOCKS_CMD_TCP_CONNECT,
            port: 80,
            ip: Ipv4Addr::new(0, 0, 0, 1),
            user_id: Vec::new(),
        };
        assert!(header.is_socks4a());

        header.ip = Ipv4Addr::new(0, 0, 0, 0);
        assert!(!header.is_socks4a());

        header.ip = Ipv4Addr::new(0, 0, 1, 1);
        assert!(!header.is_socks4a());
    }

    #[test]
    fn test_encode_method_selection() {
        assert_eq!(encode_method_selection(SOCKS5_AUTH_METHOD_PASSWORD), [5, 2]);
        assert_eq!(
            encode_method_selection(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE),
            [5, 0xFF]
        );
    }

    #[test]
    fn test_encode_greeting() {
        let bytes = encode_greeting(&[SOCKS5_AUTH_METHOD_NONE]).unwrap();
        assert_eq!(&bytes[..], &[5, 1, 0]);
        assert!(encode_greeting(&[]).is_err());
    }
}
