//! Server session state
//!
//! The server keeps two watermarks next to the account and the reply cache:
//! the highest request id it has executed and the highest one the client has
//! acknowledged. Together they classify every incoming request. All of it is
//! owned by one receive loop, so nothing here is shared or locked.

use super::reply_cache::ReplyCache;
use crate::account::Account;
use crate::protocol::{Message, MessageKind, RequestId};
use log::debug;

/// What to do with an incoming request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    /// The client already has the reply; drop silently
    AlreadyAcknowledged,
    /// Executed but unacknowledged; resend the cached reply
    Replay,
    /// Never seen; execute it
    New,
}

/// Why a datagram produced no reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Request at or below the acknowledged watermark
    AlreadyAcknowledged,
    /// Replay requested but no cached reply exists
    MissingCacheEntry,
    /// A reply arrived at the server
    StrayReply,
    /// Acknowledgement for an id that was never replied to
    AckBeyondProcessed,
    /// Datagram did not decode
    Malformed,
}

/// Result of handling one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A new request was executed; send this reply
    Executed(Message),
    /// A duplicate of an unacknowledged request; resend this cached reply
    Replayed(Message),
    /// An acknowledgement was applied
    Acknowledged { request_id: RequestId, evicted: usize },
    /// Nothing to send
    Dropped(DropReason),
}

impl Dispatch {
    /// The reply to send, if any
    pub fn reply(&self) -> Option<&Message> {
        match self {
            Dispatch::Executed(reply) | Dispatch::Replayed(reply) => Some(reply),
            Dispatch::Acknowledged { .. } | Dispatch::Dropped(_) => None,
        }
    }
}

/// Counters describing what the server has done
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServerStats {
    pub executed: u64,
    pub replayed: u64,
    pub duplicates_dropped: u64,
    pub acknowledgements: u64,
    pub malformed_dropped: u64,
    pub stray_dropped: u64,
}

/// Server-side protocol state machine.
///
/// Invariants: `last_acknowledged <= last_processed`; every cached reply has
/// an id in `(last_acknowledged, last_processed]`; no id is executed twice.
#[derive(Debug, Default)]
pub struct ServerSession {
    pub(super) account: Account,
    pub(super) last_processed: Option<RequestId>,
    pub(super) last_acknowledged: Option<RequestId>,
    pub(super) cache: ReplyCache,
    pub(super) stats: ServerStats,
}

impl ServerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing account
    pub fn with_account(account: Account) -> Self {
        Self {
            account,
            ..Self::default()
        }
    }

    /// Classify a request id against the watermarks
    pub fn classify(&self, id: RequestId) -> RequestDisposition {
        if self.last_acknowledged.is_some_and(|acked| id <= acked) {
            RequestDisposition::AlreadyAcknowledged
        } else if self.last_processed.is_some_and(|processed| id <= processed) {
            RequestDisposition::Replay
        } else {
            RequestDisposition::New
        }
    }

    /// Handle any decoded message
    pub fn handle(&mut self, message: &Message) -> Dispatch {
        match message.kind {
            MessageKind::Request => self.handle_request(message),
            MessageKind::Acknowledgement => self.handle_acknowledgement(message),
            MessageKind::Reply => {
                debug!("Discarding stray {message}");
                self.stats.stray_dropped += 1;
                Dispatch::Dropped(DropReason::StrayReply)
            }
        }
    }

    /// Record a datagram that could not be decoded
    pub fn record_malformed(&mut self) -> Dispatch {
        self.stats.malformed_dropped += 1;
        Dispatch::Dropped(DropReason::Malformed)
    }

    pub fn balance(&self) -> i64 {
        self.account.balance()
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn last_processed(&self) -> Option<RequestId> {
        self.last_processed
    }

    pub fn last_acknowledged(&self) -> Option<RequestId> {
        self.last_acknowledged
    }

    pub fn cache(&self) -> &ReplyCache {
        &self.cache
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}
