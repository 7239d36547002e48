//! Reply frames
//!
//! Constructs SOCKS5 and SOCKS4 reply messages.

use super::read_exact;
use super::request::{decode_address, encode_address};
use crate::error::{ProtocolError, Socks4Status, Socks5Status, SocksError};
use crate::socks::consts::*;
use crate::socks::types::{AddressType, Reply, Version};
use bytes::{BufMut, Bytes, BytesMut};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Encode a reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// # SOCKS4 Reply Format
///
/// ```text
/// +----+----+----+----+----+----+----+----+
/// | VN | CD | DSTPORT |      DSTIP        |
/// +----+----+----+----+----+----+----+----+
/// ```
pub fn encode_reply(reply: &Reply) -> Result<Bytes, SocksError> {
    match reply {
        Reply::V5 { status, bound } => {
            let mut buf = BytesMut::with_capacity(4 + 16 + 2);
            buf.put_u8(SOCKS5_VERSION);
            buf.put_u8((*status).into());
            buf.put_u8(SOCKS5_RESERVED);
            encode_address(&mut buf, bound)?;
            Ok(buf.freeze())
        }
        Reply::V4 { status, bound } => {
            let mut buf = BytesMut::with_capacity(8);
            buf.put_u8(SOCKS4_REPLY_VERSION);
            buf.put_u8((*status).into());
            buf.put_u16(bound.port());
            buf.put_slice(&bound.ip().octets());
            Ok(buf.freeze())
        }
    }
}

/// Encode and flush a reply
pub async fn send_reply<S>(stream: &mut S, reply: &Reply) -> Result<(), SocksError>
where
    S: AsyncWrite + Unpin,
{
    let bytes = encode_reply(reply)?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Decode a reply as a client would receive it
pub async fn decode_reply<S>(stream: &mut S, version: Version) -> Result<Reply, SocksError>
where
    S: AsyncRead + Unpin,
{
    match version {
        Version::V5 => {
            let mut header = [0u8; 4];
            read_exact(stream, &mut header).await?;
            let [ver, status, _reserved, addr_type] = header;

            if ver != SOCKS5_VERSION {
                return Err(ProtocolError::UnsupportedVersion(ver).into());
            }
            let status = Socks5Status::try_from(status)?;
            let addr_type = AddressType::from_byte(addr_type)
                .ok_or(ProtocolError::AddressTypeNotSupported(addr_type))?;
            let bound = decode_address(stream, addr_type).await?;

            Ok(Reply::V5 { status, bound })
        }
        Version::V4 => {
            let mut frame = [0u8; 8];
            read_exact(stream, &mut frame).await?;

            if frame[0] != SOCKS4_REPLY_VERSION {
                return Err(ProtocolError::Malformed(format!(
                    "SOCKS4 reply version must be 0, got {}",
                    frame[0]
                ))
                .into());
            }
            let status = Socks4Status::try_from(frame[1])?;
            let port = u16::from_be_bytes([frame[2], frame[3]]);
            let ip = Ipv4Addr::new(frame[4], frame[5], frame[6], frame[7]);

            Ok(Reply::V4 {
                status,
                bound: SocketAddrV4::new(ip, port),
            })
        }
    }
}
