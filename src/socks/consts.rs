//! SOCKS protocol constants
//!
//! Defines the constants of the SOCKS4, SOCKS4a and SOCKS5 wire formats.

/// SOCKS4 protocol version
pub const SOCKS4_VERSION: u8 = 0x04;

/// Version byte of a SOCKS4 reply (always 0)
pub const SOCKS4_REPLY_VERSION: u8 = 0x00;

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

/// SOCKS5 authentication sub-negotiation version
pub const SOCKS5_AUTH_VERSION: u8 = 0x01;

/// Version byte of the username/password status reply
pub const SOCKS5_AUTH_REPLY_VERSION: u8 = 0x05;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// GSSAPI authentication (not implemented)
pub const SOCKS5_AUTH_METHOD_GSSAPI: u8 = 0x01;
/// Username/password authentication
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Username/password sub-negotiation status
/// Credentials accepted
pub const SOCKS5_AUTH_STATUS_SUCCESS: u8 = 0x00;
/// Credentials rejected
pub const SOCKS5_AUTH_STATUS_FAILURE: u8 = 0x01;

// Commands (shared by SOCKS4 and SOCKS5)
/// TCP CONNECT command
pub const SOCKS_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command
pub const SOCKS_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command (SOCKS5 only)
pub const SOCKS_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// SOCKS4 reply codes
/// Request granted
pub const SOCKS4_REPLY_GRANTED: u8 = 90;
/// Request rejected or failed
pub const SOCKS4_REPLY_REJECTED: u8 = 91;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

// Buffer sizes
/// Maximum domain name length
pub const MAX_DOMAIN_LEN: usize = 255;
/// Maximum length of a NUL-terminated SOCKS4 user id or hostname
pub const MAX_SOCKS4_FIELD_LEN: usize = 255;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions() {
        assert_eq!(SOCKS4_VERSION, 4);
        assert_eq!(SOCKS5_VERSION, 5);
        assert_eq!(SOCKS4_REPLY_VERSION, 0);
    }

    #[test]
    fn test_auth_methods() {
        assert_eq!(SOCKS5_AUTH_METHOD_NONE, 0);
        assert_eq!(SOCKS5_AUTH_METHOD_PASSWORD, 2);
        assert_eq!(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE, 255);
    }

    #[test]
    fn test_socks4_reply_codes() {
        assert_eq!(SOCKS4_REPLY_GRANTED, 0x5A);
        assert_eq!(SOCKS4_REPLY_REJECTED, 0x5B);
    }
}
