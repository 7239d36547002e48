//! SOCKS module for Socksgate
//!
//! This module implements the SOCKS4, SOCKS4a and SOCKS5 protocols: the
//! wire codec, the per-connection session negotiator, the command executor
//! and the bidirectional tunnel.

pub mod auth;
pub mod client;
pub mod codec;
pub mod command;
mod consts;
pub mod session;
pub mod tunnel;
mod types;

pub use auth::{AuthMethod, CredentialVerifier, StaticCredentials};
pub use consts::*;
pub use session::{AuthState, Session, SessionContext, SessionState};
pub use tunnel::{relay, TunnelStats};
pub use types::{AddressType, Command, Credential, Reply, Request, TargetAddr, Version};
