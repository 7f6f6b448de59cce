//! teller core library
//!
//! At-most-once remote operations over an unreliable datagram channel. The
//! client numbers its requests and retransmits until it hears back; the
//! server executes each request id once, caches the reply for replay, and
//! forgets it when the client acknowledges.

pub mod account;
pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

// Re-export main types
pub use account::Account;
pub use client::{ClientSession, Reply, RetryPolicy, Sequencer, SessionState, SessionStats};
pub use error::{Error, Result};
pub use protocol::{
    DatagramTransport, Message, MessageKind, Operation, OperationCode, RequestId, UdpTransport,
};
pub use server::{Dispatch, ReplyCache, Server, ServerSession};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Local address the client socket binds to
    pub bind: SocketAddr,
    /// Server address requests are sent to
    pub server: SocketAddr,
    pub response_timeout_ms: u64,
    pub failure_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                protocol::DEFAULT_CLIENT_PORT,
            ),
            server: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                protocol::DEFAULT_SERVER_PORT,
            ),
            response_timeout_ms: protocol::RESPONSE_TIMEOUT.as_millis() as u64,
            failure_timeout_ms: protocol::ASSUMED_FAILURE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    /// Create a test configuration
    pub fn test() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            response_timeout_ms: 100,
            failure_timeout_ms: 500,
            ..Self::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.response_timeout_ms, self.failure_timeout_ms)
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server socket binds to
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                protocol::DEFAULT_SERVER_PORT,
            ),
        }
    }
}
