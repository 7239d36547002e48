//! Error types for Socksgate
//!
//! This module defines the error taxonomy of the proxy engine and the
//! reply status codes those errors are reported with on the wire.

use crate::socks::Command;
use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for Socksgate operations
#[derive(Error, Debug)]
pub enum SocksError {
    /// Malformed or unsupported wire data; always fatal to the session
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Username/password rejected by the credential verifier
    #[error("Authentication failed for user: {0}")]
    AuthenticationFailure(String),

    /// The target could not be reached
    #[error("Dial failure ({status}): {source}")]
    Dial {
        /// Status reported to the client
        status: Socks5Status,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The command was understood but is refused by this server
    #[error("{command} rejected: {status}")]
    CommandRejected {
        /// Refused command
        command: Command,
        /// Status reported to the client
        status: Socks5Status,
    },

    /// Socket level error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SocksError {
    /// Build a dial failure, deriving the status from the IO error kind
    pub fn dial(source: io::Error) -> Self {
        SocksError::Dial {
            status: Socks5Status::from(&source),
            source,
        }
    }

    /// Status code a client should see for this error, if any
    pub fn reply_status(&self) -> Option<Socks5Status> {
        match self {
            SocksError::Protocol(ProtocolError::CommandNotSupported(_)) => {
                Some(Socks5Status::CommandNotSupported)
            }
            SocksError::Protocol(ProtocolError::AddressTypeNotSupported(_)) => {
                Some(Socks5Status::AddressTypeNotSupported)
            }
            SocksError::Protocol(ProtocolError::Malformed(_)) => Some(Socks5Status::GeneralFailure),
            SocksError::Dial { status, .. } => Some(*status),
            SocksError::CommandRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Wire-level protocol violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// First byte was neither 4 nor 5, or the version is disabled
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Frame content is invalid
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// Stream ended before the frame was complete
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Unknown command byte
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Unknown or unrepresentable address type
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// None of the offered authentication methods is acceptable
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// The session state machine was driven backwards
    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5Status {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5Status> for u8 {
    fn from(code: Socks5Status) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5Status {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5Status::Succeeded),
            0x01 => Ok(Socks5Status::GeneralFailure),
            0x02 => Ok(Socks5Status::ConnectionNotAllowed),
            0x03 => Ok(Socks5Status::NetworkUnreachable),
            0x04 => Ok(Socks5Status::HostUnreachable),
            0x05 => Ok(Socks5Status::ConnectionRefused),
            0x06 => Ok(Socks5Status::TtlExpired),
            0x07 => Ok(Socks5Status::CommandNotSupported),
            0x08 => Ok(Socks5Status::AddressTypeNotSupported),
            _ => Err(ProtocolError::Malformed(format!(
                "unknown SOCKS5 reply status: {}",
                value
            ))),
        }
    }
}

impl From<&io::Error> for Socks5Status {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Socks5Status::ConnectionRefused,
            io::ErrorKind::TimedOut => Socks5Status::HostUnreachable,
            io::ErrorKind::HostUnreachable => Socks5Status::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => Socks5Status::HostUnreachable,
            io::ErrorKind::NetworkUnreachable => Socks5Status::NetworkUnreachable,
            io::ErrorKind::PermissionDenied => Socks5Status::ConnectionNotAllowed,
            _ => Socks5Status::GeneralFailure,
        }
    }
}

impl fmt::Display for Socks5Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Socks5Status::Succeeded => "succeeded",
            Socks5Status::GeneralFailure => "general failure",
            Socks5Status::ConnectionNotAllowed => "connection not allowed by ruleset",
            Socks5Status::NetworkUnreachable => "network unreachable",
            Socks5Status::HostUnreachable => "host unreachable",
            Socks5Status::ConnectionRefused => "connection refused",
            Socks5Status::TtlExpired => "TTL expired",
            Socks5Status::CommandNotSupported => "command not supported",
            Socks5Status::AddressTypeNotSupported => "address type not supported",
        };
        f.write_str(text)
    }
}

/// Reply codes for SOCKS4 protocol
///
/// 92 and 93 exist on the wire but are never produced by this server,
/// as there is no identd lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks4Status {
    /// Request granted
    Granted = 90,
    /// Request rejected or failed
    Rejected = 91,
    /// Rejected because identd is unreachable
    NoIdentd = 92,
    /// Rejected because identd reported a different user id
    IdentdMismatch = 93,
}

impl From<Socks4Status> for u8 {
    fn from(code: Socks4Status) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks4Status {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            90 => Ok(Socks4Status::Granted),
            91 => Ok(Socks4Status::Rejected),
            92 => Ok(Socks4Status::NoIdentd),
            93 => Ok(Socks4Status::IdentdMismatch),
            _ => Err(ProtocolError::Malformed(format!(
                "unknown SOCKS4 reply status: {}",
                value
            ))),
        }
    }
}

impl From<Socks5Status> for Socks4Status {
    fn from(status: Socks5Status) -> Self {
        match status {
            Socks5Status::Succeeded => Socks4Status::Granted,
            _ => Socks4Status::Rejected,
        }
    }
}
