//! Request frames
//!
//! Decodes SOCKS5 and SOCKS4/4a requests and encodes them for the client
//! side of the protocol.

use super::greeting::Socks4Header;
use super::{read_exact, read_nul_terminated, read_port, read_u8};
use crate::error::{ProtocolError, SocksError};
use crate::socks::consts::*;
use crate::socks::types::{AddressType, Command, Request, TargetAddr, Version};
use bytes::{BufMut, Bytes, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::AsyncRead;

/// Decode a SOCKS5 request
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
pub async fn decode_request<S>(stream: &mut S) -> Result<Request, SocksError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    read_exact(stream, &mut header).await?;

    let [version, cmd_byte, _reserved, addr_type] = header;

    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version).into());
    }

    let command = Command::from_byte(cmd_byte).ok_or(ProtocolError::CommandNotSupported(cmd_byte))?;
    let addr_type =
        AddressType::from_byte(addr_type).ok_or(ProtocolError::AddressTypeNotSupported(addr_type))?;

    let target = decode_address(stream, addr_type).await?;

    tracing::debug!("Decoded SOCKS5 request: {} to {}", command, target);

    Ok(Request::new(Version::V5, command, target))
}

/// Decode the address portion of a SOCKS5 request or reply
pub(crate) async fn decode_address<S>(
    stream: &mut S,
    addr_type: AddressType,
) -> Result<TargetAddr, SocksError>
where
    S: AsyncRead + Unpin,
{
    match addr_type {
        AddressType::Ipv4 => {
            let mut addr = [0u8; 4];
            read_exact(stream, &mut addr).await?;
            let port = read_port(stream).await?;
            Ok(TargetAddr::ipv4(Ipv4Addr::from(addr), port))
        }
        AddressType::Domain => {
            let domain_len = read_u8(stream).await? as usize;
            if domain_len == 0 {
                return Err(ProtocolError::Malformed("empty domain name".into()).into());
            }

            let mut domain = vec![0u8; domain_len];
            read_exact(stream, &mut domain).await?;
            let domain = String::from_utf8(domain)
                .map_err(|_| ProtocolError::Malformed("invalid UTF-8 in domain name".into()))?;

            let port = read_port(stream).await?;
            Ok(TargetAddr::domain(domain, port))
        }
        AddressType::Ipv6 => {
            let mut addr = [0u8; 16];
            read_exact(stream, &mut addr).await?;
            let port = read_port(stream).await?;
            Ok(TargetAddr::ipv6(Ipv6Addr::from(addr), port))
        }
    }
}

/// Complete a SOCKS4 request from its already decoded header
///
/// When the header carries the SOCKS4a sentinel `0.0.0.x`, a NUL-terminated
/// hostname follows the user id and becomes the target.
pub async fn decode_socks4_request<S>(
    stream: &mut S,
    header: &Socks4Header,
) -> Result<Request, SocksError>
where
    S: AsyncRead + Unpin,
{
    let command = match Command::from_byte(header.command) {
        Some(Command::UdpAssociate) | None => {
            return Err(ProtocolError::CommandNotSupported(header.command).into())
        }
        Some(command) => command,
    };

    let target = if header.is_socks4a() {
        let hostname = read_nul_terminated(stream, MAX_SOCKS4_FIELD_LEN, "SOCKS4a hostname").await?;
        if hostname.is_empty() {
            return Err(ProtocolError::Malformed("empty SOCKS4a hostname".into()).into());
        }
        let hostname = String::from_utf8(hostname)
            .map_err(|_| ProtocolError::Malformed("invalid UTF-8 in SOCKS4a hostname".into()))?;
        TargetAddr::domain(hostname, header.port)
    } else {
        TargetAddr::ipv4(header.ip, header.port)
    };

    tracing::debug!("Decoded SOCKS4 request: {} to {}", command, target);

    Ok(Request::new(Version::V4, command, target))
}

/// Encode a request as a client would send it
///
/// SOCKS4 requests carry an empty user id; domain targets use SOCKS4a.
/// IPv6 targets cannot be expressed in SOCKS4.
pub fn encode_request(request: &Request) -> Result<Bytes, SocksError> {
    match request.version() {
        Version::V5 => {
            let mut buf = BytesMut::with_capacity(4 + 1 + MAX_DOMAIN_LEN + 2);
            buf.put_u8(SOCKS5_VERSION);
            buf.put_u8(request.command().to_byte());
            buf.put_u8(SOCKS5_RESERVED);
            encode_address(&mut buf, request.target())?;
            Ok(buf.freeze())
        }
        Version::V4 => encode_socks4_request(request),
    }
}

fn encode_socks4_request(request: &Request) -> Result<Bytes, SocksError> {
    if request.command() == Command::UdpAssociate {
        return Err(ProtocolError::CommandNotSupported(request.command().to_byte()).into());
    }

    let mut buf = BytesMut::with_capacity(9);
    buf.put_u8(SOCKS4_VERSION);
    buf.put_u8(request.command().to_byte());
    buf.put_u16(request.target().port());

    match request.target() {
        TargetAddr::Ip(SocketAddr::V4(addr)) => {
            buf.put_slice(&addr.ip().octets());
            buf.put_u8(0);
        }
        TargetAddr::Domain(domain, _) if request.target().is_socks4_compatible() => {
            if domain.is_empty() || domain.len() > MAX_SOCKS4_FIELD_LEN || domain.contains('\0') {
                return Err(ProtocolError::Malformed(format!("invalid hostname: {}", domain)).into());
            }
            buf.put_slice(&[0, 0, 0, 1]);
            buf.put_u8(0);
            buf.put_slice(domain.as_bytes());
            buf.put_u8(0);
        }
        _ => {
            return Err(ProtocolError::AddressTypeNotSupported(SOCKS5_ADDR_TYPE_IPV6).into());
        }
    }

    Ok(buf.freeze())
}

/// Append `ATYP ADDR PORT` for a SOCKS5 frame
pub(crate) fn encode_address(buf: &mut BytesMut, addr: &TargetAddr) -> Result<(), SocksError> {
    match addr {
        TargetAddr::Ip(SocketAddr::V4(addr)) => {
            buf.put_u8(SOCKS5_ADDR_TYPE_IPV4);
            buf.put_slice(&addr.ip().octets());
            buf.put_u16(addr.port());
        }
        TargetAddr::Ip(SocketAddr::V6(addr)) => {
            buf.put_u8(SOCKS5_ADDR_TYPE_IPV6);
            buf.put_slice(&addr.ip().octets());
            buf.put_u16(addr.port());
        }
        TargetAddr::Domain(domain, port) => {
            if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
                return Err(ProtocolError::Malformed(format!(
                    "invalid domain length: {}",
                    domain.len()
                ))
                .into());
            }
            buf.put_u8(SOCKS5_ADDR_TYPE_DOMAIN);
            buf.put_u8(domain.len() as u8);
            buf.put_slice(domain.as_bytes());
            buf.put_u16(*port);
        }
    }
    Ok(())
}
