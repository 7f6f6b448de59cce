//! Message encoding and decoding
//!
//! This module handles the conversion between [`Message`] values and the raw
//! bytes of a single datagram. There is no fragmentation: one message is one
//! datagram, and a datagram that does not decode cleanly is rejected whole.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  offset  size  field
//!  0       1     kind            0 = request, 1 = reply, 2 = acknowledgement
//!  1       4     request id      int32, never negative
//!  5       4     operation code  int32
//!  9       2     payload length  u16
//!  11      n     payload         UTF-8
//! ```
//!
//! [`Message`]: crate::protocol::messages::Message

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;

use crate::protocol::error::Result;
use crate::protocol::messages::Message;
use bytes::Bytes;
use log::trace;

/// Byte length of the fixed header
pub const HEADER_LEN: usize = 11;

/// Largest payload that still fits in one datagram
pub const MAX_PAYLOAD_LEN: usize = crate::protocol::MAX_DATAGRAM_SIZE - HEADER_LEN;

// Byte offsets of each header field.
const OFF_KIND: usize = 0;
const OFF_REQUEST_ID: usize = 1;
const OFF_OPERATION: usize = 5;
const OFF_PAYLOAD_LEN: usize = 9;

/// Codec for encoding and decoding protocol messages
pub struct Codec {
    encoder: Encoder,
    decoder: Decoder,
}

impl Codec {
    /// Create a new codec instance
    pub fn new() -> Self {
        Self {
            encoder: Encoder::new(),
            decoder: Decoder::new(),
        }
    }

    /// Encode a message into one datagram
    pub fn encode(&mut self, message: &Message) -> Result<Bytes> {
        trace!("Codec encoding {message}");
        self.encoder.encode(message)
    }

    /// Decode one datagram into a message
    pub fn decode(&self, data: &[u8]) -> Result<Message> {
        trace!("Codec decoding {} bytes", data.len());
        self.decoder.decode(data)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error::ProtocolError;
    use crate::protocol::messages::{MessageKind, Operation, RequestId};

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = Codec::new();
        let request = Message::request(RequestId::new(12), &Operation::Deposit(100));

        let encoded = codec.encode(&request).unwrap();
        let decoded = codec.decode(&encoded).unwrap();

        assert_eq!(decoded, request);
    }

    #[test]
    fn test_codec_preserves_reply_text_exactly() {
        let mut codec = Codec::new();
        let request = Message::request(RequestId::new(0), &Operation::Deposit(100));
        let reply = Message::reply_to(&request, "Deposited 100. Your balance is now:100");

        let encoded = codec.encode(&reply).unwrap();
        let decoded = codec.decode(&encoded).unwrap();

        assert_eq!(decoded.kind, MessageKind::Reply);
        assert_eq!(decoded.payload, "Deposited 100. Your balance is now:100");
    }

    #[test]
    fn test_codec_rejects_garbage() {
        let codec = Codec::new();
        assert!(matches!(
            codec.decode(&[0xde, 0xad]),
            Err(ProtocolError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_header_len_constant_is_correct() {
        // kind(1) + request id(4) + operation(4) + payload length(2)
        assert_eq!(HEADER_LEN, 11);
        assert_eq!(OFF_PAYLOAD_LEN + 2, HEADER_LEN);
        assert_eq!(MAX_PAYLOAD_LEN, 245);
    }
}
