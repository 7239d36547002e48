//! SOCKS wire codec
//!
//! Byte-exact translation between protocol frames and the values in
//! [`crate::socks::types`]. Decoders read exactly the bytes a frame needs;
//! a stream that ends early yields [`ProtocolError::UnexpectedEof`].

mod greeting;
mod reply;
mod request;
mod userpass;

pub use greeting::{
    decode_greeting, decode_methods, decode_socks4_header, encode_greeting,
    encode_method_selection, read_version, Greeting, Socks4Header,
};
pub use reply::{decode_reply, encode_reply, send_reply};
pub use request::{decode_request, decode_socks4_request, encode_request};
pub use userpass::{decode_userpass, encode_auth_status, encode_userpass};

use crate::error::{ProtocolError, SocksError};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Fill `buf` completely, mapping a premature end of stream to a protocol error
pub(crate) async fn read_exact<S>(stream: &mut S, buf: &mut [u8]) -> Result<(), SocksError>
where
    S: AsyncRead + Unpin,
{
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::UnexpectedEof.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn read_u8<S>(stream: &mut S) -> Result<u8, SocksError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; 1];
    read_exact(stream, &mut buf).await?;
    Ok(buf[0])
}

pub(crate) async fn read_port<S>(stream: &mut S) -> Result<u16, SocksError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; 2];
    read_exact(stream, &mut buf).await?;
    Ok(u16::from_be_bytes(buf))
}

/// Read a NUL-terminated field of at most `max_len` bytes (terminator excluded)
pub(crate) async fn read_nul_terminated<S>(
    stream: &mut S,
    max_len: usize,
    what: &str,
) -> Result<Vec<u8>, SocksError>
where
    S: AsyncRead + Unpin,
{
    let mut field = Vec::new();
    loop {
        let byte = read_u8(stream).await?;
        if byte == 0 {
            return Ok(field);
        }
        if field.len() == max_len {
            return Err(ProtocolError::Malformed(format!(
                "{} exceeds {} bytes",
                what, max_len
            ))
            .into());
        }
        field.push(byte);
    }
}
