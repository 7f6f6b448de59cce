//! Message decoder
//!
//! This module handles decoding of received datagrams into messages.

use super::HEADER_LEN;
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::{Message, MessageKind, RequestId};
use bytes::Buf;
use log::{debug, trace};

/// Decoder for protocol messages.
///
/// Datagrams arrive whole or not at all, so the decoder keeps no state
/// between calls.
#[derive(Debug, Default)]
pub struct Decoder;

impl Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode one datagram
    pub fn decode(&self, data: &[u8]) -> Result<Message> {
        trace!("Decoder::decode called with {} bytes", data.len());

        if data.len() < HEADER_LEN {
            debug!("Datagram too short: {} bytes", data.len());
            return Err(ProtocolError::buffer_too_short(data.len(), HEADER_LEN));
        }

        let mut buf = data;
        let kind = MessageKind::from_byte(buf.get_u8())?;
        let request_id = RequestId::from_wire(buf.get_i32())?;
        let operation = buf.get_i32();
        let declared = usize::from(buf.get_u16());

        if buf.remaining() != declared {
            debug!(
                "Payload length mismatch: declared {declared}, remaining {}",
                buf.remaining()
            );
            return Err(ProtocolError::length_mismatch(declared, buf.remaining()));
        }

        let payload = String::from_utf8(buf.to_vec())?;

        Ok(Message {
            kind,
            request_id,
            operation,
            payload,
        })
    }
}
