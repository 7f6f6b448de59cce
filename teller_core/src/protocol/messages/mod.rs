//! Type-safe message definitions for the teller protocol
//!
//! Every datagram is a [`Message`]: a request, the reply to it, or the
//! client's acknowledgement of that reply. All three carry the request id the
//! client assigned when it created the request.

pub mod operation;

pub use operation::{Operation, OperationCode};

use crate::protocol::error::{ProtocolError, Result};
use std::fmt;

/// Client-assigned identifier of one request.
///
/// Ids are strictly increasing within a client session and never reused.
/// They travel as non-negative int32 values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u32);

impl RequestId {
    /// Largest id representable on the wire
    pub const MAX: RequestId = RequestId(i32::MAX as u32);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Convert to the wire representation
    pub fn to_wire(self) -> Result<i32> {
        i32::try_from(self.0).map_err(|_| {
            ProtocolError::invalid_packet(format!("request id {} exceeds int32", self.0))
        })
    }

    /// Convert from the wire representation
    pub fn from_wire(raw: i32) -> Result<Self> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| ProtocolError::NegativeRequestId(raw))
    }
}

impl From<u32> for RequestId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message kind, encoded as a single byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Request = 0,
    Reply = 1,
    Acknowledgement = 2,
}

impl MessageKind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Request),
            1 => Ok(Self::Reply),
            2 => Ok(Self::Acknowledgement),
            other => Err(ProtocolError::UnknownMessageKind(other)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Request => write!(f, "REQUEST"),
            MessageKind::Reply => write!(f, "REPLY"),
            MessageKind::Acknowledgement => write!(f, "ACK"),
        }
    }
}

/// The only entity on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub request_id: RequestId,
    /// Raw operation code; unknown codes are representable so the server can
    /// answer them instead of dropping them.
    pub operation: i32,
    pub payload: String,
}

impl Message {
    pub fn new(
        kind: MessageKind,
        request_id: RequestId,
        operation: i32,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            request_id,
            operation,
            payload: payload.into(),
        }
    }

    /// Build the request for `operation` under `request_id`
    pub fn request(request_id: RequestId, operation: &Operation) -> Self {
        let (code, payload) = operation.to_request_parts();
        Self::new(MessageKind::Request, request_id, code.code(), payload)
    }

    /// Build the reply to `request` carrying `text`
    pub fn reply_to(request: &Message, text: impl Into<String>) -> Self {
        Self::new(
            MessageKind::Reply,
            request.request_id,
            request.operation,
            text,
        )
    }

    /// Build the acknowledgement of `reply`; it carries no payload
    pub fn acknowledge(reply: &Message) -> Self {
        Self::new(
            MessageKind::Acknowledgement,
            reply.request_id,
            reply.operation,
            "",
        )
    }

    pub fn is_request(&self) -> bool {
        self.kind == MessageKind::Request
    }

    pub fn is_reply(&self) -> bool {
        self.kind == MessageKind::Reply
    }

    pub fn is_acknowledgement(&self) -> bool {
        self.kind == MessageKind::Acknowledgement
    }

    /// Parse the operation this message asks for
    pub fn parse_operation(&self) -> Result<Operation> {
        Operation::from_request(self.operation, &self.payload)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} op={} \"{}\"",
            self.kind, self.request_id, self.operation, self.payload
        )
    }
}
