//! Message encoder
//!
//! This module handles encoding of messages into bytes for transmission.

use super::{HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::Message;
use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};

/// Encoder for protocol messages
pub struct Encoder {
    /// Buffer for encoding
    buffer: BytesMut,
}

impl Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(crate::protocol::MAX_DATAGRAM_SIZE),
        }
    }

    /// Encode a message into one datagram
    pub fn encode(&mut self, message: &Message) -> Result<Bytes> {
        self.buffer.clear();

        let payload = message.payload.as_bytes();
        if payload.len() > MAX_PAYLOAD_LEN {
            debug!(
                "Payload too large: {} bytes (max: {MAX_PAYLOAD_LEN})",
                payload.len()
            );
            return Err(ProtocolError::packet_too_large(
                HEADER_LEN + payload.len(),
                crate::protocol::MAX_DATAGRAM_SIZE,
            ));
        }

        self.buffer.put_u8(message.kind.as_byte());
        self.buffer.put_i32(message.request_id.to_wire()?);
        self.buffer.put_i32(message.operation);
        // MAX_PAYLOAD_LEN is far below u16::MAX.
        self.buffer.put_u16(payload.len() as u16);
        self.buffer.put_slice(payload);

        let result = self.buffer.split().freeze();
        trace!("Encoded bytes: {:?}", &result[..]);
        Ok(result)
    }

    /// Get the current buffer capacity
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{OFF_KIND, OFF_OPERATION, OFF_PAYLOAD_LEN, OFF_REQUEST_ID};
    use super::*;
    use crate::protocol::messages::{MessageKind, Operation, RequestId};

    #[test]
    fn test_encode_layout_is_big_endian() {
        let mut encoder = Encoder::new();
        let message = Message::new(
            MessageKind::Reply,
            RequestId::new(0x0102_0304),
            0x0506_0708,
            "ok",
        );

        let bytes = encoder.encode(&message).unwrap();

        assert_eq!(bytes[OFF_KIND], 1);
        assert_eq!(
            &bytes[OFF_REQUEST_ID..OFF_REQUEST_ID + 4],
            &[0x01, 0x02, 0x03, 0x04]
        );
        assert_eq!(
            &bytes[OFF_OPERATION..OFF_OPERATION + 4],
            &[0x05, 0x06, 0x07, 0x08]
        );
        assert_eq!(&bytes[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2], &[0x00, 0x02]);
        assert_eq!(&bytes[HEADER_LEN..], b"ok");
    }

    #[test]
    fn test_encode_negative_operation_code() {
        let mut encoder = Encoder::new();
        let message = Message::new(MessageKind::Request, RequestId::new(1), -1, "");
        let bytes = encoder.encode(&message).unwrap();
        assert_eq!(
            &bytes[OFF_OPERATION..OFF_OPERATION + 4],
            &(-1i32).to_be_bytes()
        );
        assert_eq!(bytes.len(), HEADER_LEN);
    }

    #[test]
    fn test_encode_oversized_payload() {
        let mut encoder = Encoder::new();
        let message = Message::new(
            MessageKind::Reply,
            RequestId::new(1),
            1,
            "A".repeat(MAX_PAYLOAD_LEN + 1),
        );
        let result = encoder.encode(&message);
        assert!(matches!(
            result.unwrap_err(),
            ProtocolError::PacketTooLarge { size: 257, max_size: 256 }
        ));
    }

    #[test]
    fn test_encode_payload_at_limit() {
        let mut encoder = Encoder::new();
        let message = Message::new(
            MessageKind::Reply,
            RequestId::new(1),
            1,
            "A".repeat(MAX_PAYLOAD_LEN),
        );
        let bytes = encoder.encode(&message).unwrap();
        assert_eq!(bytes.len(), crate::protocol::MAX_DATAGRAM_SIZE);
    }

    #[test]
    fn test_encoder_reuses_buffer() {
        let mut encoder = Encoder::new();
        let first = encoder
            .encode(&Message::request(RequestId::new(0), &Operation::Deposit(5)))
            .unwrap();
        let second = encoder
            .encode(&Message::request(RequestId::new(1), &Operation::ViewBalance))
            .unwrap();
        assert_eq!(first.len(), HEADER_LEN + 1);
        assert_eq!(second.len(), HEADER_LEN);
        assert!(encoder.capacity() > 0);
    }
}
