//! Protocol-specific error types
//!
//! This module defines error types for the wire codec and datagram transport.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol-specific error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Receive timeout
    #[error("Receive timeout after {0:?}")]
    Timeout(Duration),

    /// Datagram shorter than the fixed header
    #[error("Datagram of {len} bytes is shorter than the {header_len}-byte header")]
    BufferTooShort { len: usize, header_len: usize },

    /// Kind byte is not Request, Reply or Acknowledgement
    #[error("Unknown message kind: {0}")]
    UnknownMessageKind(u8),

    /// Request IDs are non-negative int32 values on the wire
    #[error("Negative request id on the wire: {0}")]
    NegativeRequestId(i32),

    /// Payload length field disagrees with the datagram size
    #[error("Payload length field says {declared} bytes but {actual} remain")]
    LengthMismatch { declared: usize, actual: usize },

    /// Payload is not valid UTF-8
    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Packet too large
    #[error("Packet size {size} exceeds maximum {max_size}")]
    PacketTooLarge { size: usize, max_size: usize },

    /// Empty datagram
    #[error("Invalid packet: {message}")]
    InvalidPacket { message: String },

    /// Operation code with no known operation
    #[error("Unsupported operation code: {code}")]
    InvalidOperation { code: i32 },

    /// Deposit/withdraw amount that is not a non-negative integer
    #[error("Invalid amount '{payload}': {reason}")]
    InvalidAmount { payload: String, reason: String },
}

impl ProtocolError {
    /// Create an invalid packet error
    pub fn invalid_packet(message: impl Into<String>) -> Self {
        Self::InvalidPacket {
            message: message.into(),
        }
    }

    /// Create a packet too large error
    pub fn packet_too_large(size: usize, max_size: usize) -> Self {
        Self::PacketTooLarge { size, max_size }
    }

    /// Create a buffer too short error
    pub fn buffer_too_short(len: usize, header_len: usize) -> Self {
        Self::BufferTooShort { len, header_len }
    }

    /// Create a length mismatch error
    pub fn length_mismatch(declared: usize, actual: usize) -> Self {
        Self::LengthMismatch { declared, actual }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(code: i32) -> Self {
        Self::InvalidOperation { code }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(payload: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            payload: payload.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is transient and can be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout(_))
    }

    /// Check if this error came from a datagram that could not be decoded.
    ///
    /// Receivers drop such datagrams and keep their loop running.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::BufferTooShort { .. }
                | Self::UnknownMessageKind(_)
                | Self::NegativeRequestId(_)
                | Self::LengthMismatch { .. }
                | Self::InvalidUtf8(_)
                | Self::InvalidPacket { .. }
        )
    }
}
