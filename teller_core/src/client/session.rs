//! Client session
//!
//! One session talks to one server, with at most one request in flight.

use super::retry::RetryPolicy;
use super::sequencer::Sequencer;
use crate::error::{Error, Result};
use crate::protocol::{DatagramTransport, Message, MessageChannel, Operation, RequestId};
use log::{debug, info, warn};
use std::net::SocketAddr;

/// Lifecycle of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Requests may be issued
    Active,
    /// The server stopped answering; nothing more is sent
    Aborted,
}

/// Counters describing what a session has done
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Distinct requests issued
    pub requests_issued: u64,
    /// Resends of a request already sent once
    pub retransmissions: u64,
    /// Replies or other datagrams discarded while awaiting a different reply
    pub stale_discarded: u64,
    /// Acknowledgements sent
    pub acknowledgements_sent: u64,
}

/// The server's answer to one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub request_id: RequestId,
    pub operation: i32,
    pub text: String,
}

impl From<Message> for Reply {
    fn from(message: Message) -> Self {
        Self {
            request_id: message.request_id,
            operation: message.operation,
            text: message.payload,
        }
    }
}

/// Client side of the at-most-once protocol
pub struct ClientSession<T> {
    pub(super) channel: MessageChannel<T>,
    pub(super) server_addr: SocketAddr,
    pub(super) policy: RetryPolicy,
    pub(super) stats: SessionStats,
    sequencer: Sequencer,
    state: SessionState,
}

impl<T: DatagramTransport> ClientSession<T> {
    /// Create a session that sends to `server_addr` over `transport`
    pub fn new(transport: T, server_addr: SocketAddr, policy: RetryPolicy) -> Self {
        debug!("Creating client session for server {server_addr} with {policy:?}");
        Self {
            channel: MessageChannel::new(transport),
            server_addr,
            policy,
            stats: SessionStats::default(),
            sequencer: Sequencer::new(),
            state: SessionState::Active,
        }
    }

    /// Execute `operation` on the server and return its reply.
    ///
    /// Fails with [`Error::ServerUnresponsive`] once the failure threshold is
    /// exceeded, or with [`Error::RequestIdsExhausted`] when no wire id is
    /// left. Either way the session is aborted from then on and every later
    /// call fails with [`Error::SessionAborted`] without sending.
    pub async fn execute(&mut self, operation: Operation) -> Result<Reply> {
        if self.state == SessionState::Aborted {
            return Err(Error::SessionAborted);
        }

        let Some(request_id) = self.sequencer.next_id() else {
            let error = Error::RequestIdsExhausted {
                last: RequestId::MAX,
            };
            warn!("Aborting client session: {error}");
            self.state = SessionState::Aborted;
            return Err(error);
        };
        self.stats.requests_issued += 1;
        let request = Message::request(request_id, &operation);
        debug!("Issuing {operation} as request {request_id}");

        let reply = match self.deliver(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                self.sequencer.abandon_pending();
                if e.is_session_fatal() {
                    warn!("Aborting client session: {e}");
                    self.state = SessionState::Aborted;
                }
                return Err(e);
            }
        };

        self.acknowledge(&reply).await?;
        info!("Request {request_id} answered: {}", reply.payload);
        Ok(reply.into())
    }

    /// Send the acknowledgement for `reply`, exactly once.
    ///
    /// A transient send failure is treated like a lost acknowledgement: the
    /// next acknowledgement covers it.
    async fn acknowledge(&mut self, reply: &Message) -> Result<()> {
        let ack = Message::acknowledge(reply);
        match self.channel.send_message(&ack, self.server_addr).await {
            Ok(()) => {}
            Err(e) if e.is_transient() => {
                warn!("Sending ack for reply {} failed: {e}", reply.request_id);
            }
            Err(e) => return Err(e.into()),
        }
        self.sequencer.record_acknowledged(reply.request_id);
        self.stats.acknowledgements_sent += 1;
        debug!("Sent ack for reply {}", reply.request_id);
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.channel.local_addr()?)
    }

    pub fn transport(&self) -> &T {
        self.channel.transport()
    }
}
