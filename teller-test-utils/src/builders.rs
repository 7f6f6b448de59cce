//! Builders for protocol messages used in tests

use teller_core::protocol::codec::Codec;
use teller_core::{Message, MessageKind, Operation, RequestId};

/// Fluent builder for any [`Message`], including ones a well-behaved peer
/// would never send
///
/// # Examples
///
/// ```rust
/// use teller_test_utils::MessageBuilder;
///
/// let bytes = MessageBuilder::request(3).deposit(100).encode();
/// assert_eq!(bytes[0], 0);
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    kind: MessageKind,
    request_id: RequestId,
    operation: i32,
    payload: String,
}

impl MessageBuilder {
    pub fn new(kind: MessageKind, request_id: u32) -> Self {
        Self {
            kind,
            request_id: RequestId::new(request_id),
            operation: 1,
            payload: String::new(),
        }
    }

    pub fn request(request_id: u32) -> Self {
        Self::new(MessageKind::Request, request_id)
    }

    pub fn reply(request_id: u32) -> Self {
        Self::new(MessageKind::Reply, request_id)
    }

    pub fn ack(request_id: u32) -> Self {
        Self::new(MessageKind::Acknowledgement, request_id)
    }

    /// Use the code and payload of `operation`
    pub fn operation(mut self, operation: Operation) -> Self {
        let (code, payload) = operation.to_request_parts();
        self.operation = code.code();
        self.payload = payload;
        self
    }

    pub fn view_balance(self) -> Self {
        self.operation(Operation::ViewBalance)
    }

    pub fn deposit(self, amount: i64) -> Self {
        self.operation(Operation::Deposit(amount))
    }

    pub fn withdraw(self, amount: i64) -> Self {
        self.operation(Operation::Withdraw(amount))
    }

    /// Raw operation code, known or not
    pub fn code(mut self, code: i32) -> Self {
        self.operation = code;
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn build(self) -> Message {
        Message::new(self.kind, self.request_id, self.operation, self.payload)
    }

    /// Build and encode; panics on messages the codec refuses
    pub fn encode(self) -> Vec<u8> {
        Codec::new()
            .encode(&self.build())
            .expect("builder produced an unencodable message")
            .to_vec()
    }
}

/// Datagrams no decoder should accept
pub fn malformed_datagrams() -> Vec<Vec<u8>> {
    let valid = MessageBuilder::request(1).deposit(5).encode();

    let mut unknown_kind = valid.clone();
    unknown_kind[0] = 9;

    let mut negative_id = valid.clone();
    negative_id[1..5].copy_from_slice(&(-1i32).to_be_bytes());

    let mut trailing = valid.clone();
    trailing.push(0);

    vec![
        Vec::new(),
        valid[..5].to_vec(),
        unknown_kind,
        negative_id,
        valid[..valid.len() - 1].to_vec(),
        trailing,
    ]
}
