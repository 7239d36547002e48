//! SOCKS type definitions
//!
//! Defines the values exchanged between the codec, the session negotiator
//! and the command executor.

use super::consts::*;
use crate::error::{Socks4Status, Socks5Status, SocksError};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4};

/// SOCKS protocol version spoken on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// SOCKS4 and its SOCKS4a extension
    V4,
    /// SOCKS5 (RFC 1928)
    V5,
}

impl Version {
    /// Parse the leading version byte of a client frame
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS4_VERSION => Some(Version::V4),
            SOCKS5_VERSION => Some(Version::V5),
            _ => None,
        }
    }

    /// Version byte as sent by clients
    pub fn to_byte(self) -> u8 {
        match self {
            Version::V4 => SOCKS4_VERSION,
            Version::V5 => SOCKS5_VERSION,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V4 => write!(f, "SOCKS4"),
            Version::V5 => write!(f, "SOCKS5"),
        }
    }
}

/// SOCKS command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for one incoming connection
    Bind,
    /// UDP ASSOCIATE - answered with "command not supported"
    UdpAssociate,
}

impl Command {
    /// Parse a command byte into Command
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS_CMD_TCP_CONNECT => Some(Command::Connect),
            SOCKS_CMD_TCP_BIND => Some(Command::Bind),
            SOCKS_CMD_UDP_ASSOCIATE => Some(Command::UdpAssociate),
            _ => None,
        }
    }

    /// Convert Command to byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::Connect => SOCKS_CMD_TCP_CONNECT,
            Command::Bind => SOCKS_CMD_TCP_BIND,
            Command::UdpAssociate => SOCKS_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Connect => write!(f, "CONNECT"),
            Command::Bind => write!(f, "BIND"),
            Command::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// SOCKS5 address types (ATYP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// 4 byte IPv4 address
    Ipv4,
    /// Length-prefixed domain name
    Domain,
    /// 16 byte IPv6 address
    Ipv6,
}

impl AddressType {
    /// Parse an ATYP byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_ADDR_TYPE_IPV4 => Some(AddressType::Ipv4),
            SOCKS5_ADDR_TYPE_DOMAIN => Some(AddressType::Domain),
            SOCKS5_ADDR_TYPE_IPV6 => Some(AddressType::Ipv6),
            _ => None,
        }
    }

    /// Convert to ATYP byte
    pub fn to_byte(self) -> u8 {
        match self {
            AddressType::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
            AddressType::Domain => SOCKS5_ADDR_TYPE_DOMAIN,
            AddressType::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

/// Target address for SOCKS requests
///
/// Represents the destination address in a request or the bound address
/// in a reply. Can be an IP address (v4 or v6) or a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        TargetAddr::Domain(domain.into(), port)
    }

    /// `0.0.0.0:0`, used in failure replies
    pub fn unspecified() -> Self {
        TargetAddr::ipv4(Ipv4Addr::UNSPECIFIED, 0)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Get the SOCKS5 address type
    pub fn addr_type(&self) -> AddressType {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => AddressType::Ipv4,
            TargetAddr::Ip(SocketAddr::V6(_)) => AddressType::Ipv6,
            TargetAddr::Domain(_, _) => AddressType::Domain,
        }
    }

    /// Whether this address can be expressed in a SOCKS4/4a frame
    ///
    /// Domain names that are literal IPv6 addresses count as IPv6.
    pub fn is_socks4_compatible(&self) -> bool {
        match self {
            TargetAddr::Ip(addr) => addr.is_ipv4(),
            TargetAddr::Domain(domain, _) => domain.parse::<Ipv6Addr>().is_err(),
        }
    }

    /// Resolve the address to a SocketAddr
    ///
    /// For IP addresses, this returns immediately.
    /// For domain names, this performs DNS resolution; a failure is a
    /// dial failure with status host unreachable.
    pub async fn resolve(&self) -> Result<SocketAddr, SocksError> {
        match self {
            TargetAddr::Ip(addr) => Ok(*addr),
            TargetAddr::Domain(domain, port) => {
                let unreachable = |source| SocksError::Dial {
                    status: Socks5Status::HostUnreachable,
                    source,
                };
                let mut addrs = tokio::net::lookup_host((domain.as_str(), *port))
                    .await
                    .map_err(unreachable)?;
                addrs.next().ok_or_else(|| {
                    unreachable(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("No addresses found for domain: {}", domain),
                    ))
                })
            }
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

impl Default for TargetAddr {
    fn default() -> Self {
        TargetAddr::unspecified()
    }
}

/// A decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    version: Version,
    command: Command,
    target: TargetAddr,
}

impl Request {
    /// Create a new request
    pub fn new(version: Version, command: Command, target: TargetAddr) -> Self {
        Request {
            version,
            command,
            target,
        }
    }

    /// Protocol version the request arrived on
    pub fn version(&self) -> Version {
        self.version
    }

    /// Requested command
    pub fn command(&self) -> Command {
        self.command
    }

    /// Destination of the request
    pub fn target(&self) -> &TargetAddr {
        &self.target
    }
}

/// A reply sent back to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// SOCKS5 reply: status and bound address
    V5 {
        /// Reply status
        status: Socks5Status,
        /// Bound address
        bound: TargetAddr,
    },
    /// SOCKS4 reply: status and bound IPv4 address
    V4 {
        /// Reply status
        status: Socks4Status,
        /// Bound address
        bound: SocketAddrV4,
    },
}

impl Reply {
    /// Build a reply for `version` from a SOCKS5 status
    ///
    /// SOCKS4 cannot carry an IPv6 bound address; such an address is
    /// reported as `0.0.0.0` with the port preserved.
    pub fn new(version: Version, status: Socks5Status, bound: SocketAddr) -> Self {
        match version {
            Version::V5 => Reply::V5 {
                status,
                bound: TargetAddr::Ip(bound),
            },
            Version::V4 => {
                let bound = match bound {
                    SocketAddr::V4(addr) => addr,
                    SocketAddr::V6(addr) => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, addr.port()),
                };
                Reply::V4 {
                    status: Socks4Status::from(status),
                    bound,
                }
            }
        }
    }

    /// Successful reply with the given bound address
    pub fn success(version: Version, bound: SocketAddr) -> Self {
        Reply::new(version, Socks5Status::Succeeded, bound)
    }

    /// Failure reply with an unspecified bound address
    pub fn failure(version: Version, status: Socks5Status) -> Self {
        Reply::new(
            version,
            status,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        )
    }

    /// Protocol version of the reply
    pub fn version(&self) -> Version {
        match self {
            Reply::V5 { .. } => Version::V5,
            Reply::V4 { .. } => Version::V4,
        }
    }

    /// Whether the reply grants the request
    pub fn is_success(&self) -> bool {
        match self {
            Reply::V5 { status, .. } => *status == Socks5Status::Succeeded,
            Reply::V4 { status, .. } => *status == Socks4Status::Granted,
        }
    }

    /// Bound address announced in the reply
    pub fn bound(&self) -> TargetAddr {
        match self {
            Reply::V5 { bound, .. } => bound.clone(),
            Reply::V4 { bound, .. } => TargetAddr::Ip(SocketAddr::V4(*bound)),
        }
    }
}

/// Username/password pair from the SOCKS5 sub-negotiation
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    /// Create a new credential
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credential {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
