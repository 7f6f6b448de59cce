//! teller UDP protocol implementation
//!
//! This module implements the at-most-once request/reply protocol:
//! - `transport`: datagram transport shim and the UDP implementation
//! - `codec`: message encoding/decoding for single datagrams
//! - `messages`: message, request id and operation types
//! - `error`: protocol error types

pub mod codec;
pub mod error;
pub mod messages;
pub mod transport;

// Re-export main types
pub use error::{ProtocolError, Result};
pub use messages::{Message, MessageKind, Operation, OperationCode, RequestId};
pub use transport::{DatagramTransport, MessageChannel, UdpTransport};

use std::time::Duration;

/// Receive buffer budget per datagram
pub const MAX_DATAGRAM_SIZE: usize = 256;

/// Default server listening port
pub const DEFAULT_SERVER_PORT: u16 = 25565;

/// Default client port
pub const DEFAULT_CLIENT_PORT: u16 = 25566;

/// How long the client waits for a reply before retransmitting
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Cumulative wait after which the server is assumed to be down
pub const ASSUMED_FAILURE_TIMEOUT: Duration = Duration::from_millis(5000 * 5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_constants() {
        assert_eq!(MAX_DATAGRAM_SIZE, 256);
        assert_eq!(DEFAULT_SERVER_PORT, 25565);
        assert_eq!(DEFAULT_CLIENT_PORT, 25566);
        assert_eq!(RESPONSE_TIMEOUT, Duration::from_secs(5));
        assert_eq!(ASSUMED_FAILURE_TIMEOUT, RESPONSE_TIMEOUT * 5);
    }
}
