//! Send / await / retransmit loop
//!
//! A request is sent and the client waits up to the response timeout for the
//! matching reply. Each timeout adds the response timeout to the cumulative
//! wait and resends the identical request. Once the cumulative wait exceeds
//! the failure threshold the server is assumed to be down.
//!
//! Datagrams that are not the awaited reply (stale replies to earlier
//! requests, malformed data, strangers) are discarded without extending the
//! current wait.

use super::session::ClientSession;
use crate::error::{Error, Result};
use crate::protocol::{DatagramTransport, Message, RequestId};
use log::{debug, warn};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Retransmission timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// How long to wait for a reply before resending
    response_timeout: Duration,
    /// Cumulative wait after which the session is abandoned
    failure_threshold: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            response_timeout: crate::protocol::RESPONSE_TIMEOUT,
            failure_threshold: crate::protocol::ASSUMED_FAILURE_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// A zero response timeout is raised to one millisecond, otherwise the
    /// cumulative wait would never grow.
    pub fn new(response_timeout: Duration, failure_threshold: Duration) -> Self {
        Self {
            response_timeout: response_timeout.max(Duration::from_millis(1)),
            failure_threshold,
        }
    }

    /// Build a policy from millisecond values as they appear in configuration
    pub fn from_millis(response_timeout_ms: u64, failure_threshold_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(response_timeout_ms),
            Duration::from_millis(failure_threshold_ms),
        )
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn failure_threshold(&self) -> Duration {
        self.failure_threshold
    }

    /// Retransmissions a request gets before the session gives up.
    ///
    /// Every timeout whose cumulative wait stays within the threshold earns
    /// one resend.
    pub fn max_retransmissions(&self) -> u32 {
        let timeout = self.response_timeout.as_nanos();
        let threshold = self.failure_threshold.as_nanos();
        u32::try_from(threshold / timeout).unwrap_or(u32::MAX)
    }

    /// Whether a cumulative wait means the server is gone
    pub fn is_exhausted(&self, waited: Duration) -> bool {
        waited > self.failure_threshold
    }
}

impl<T: DatagramTransport> ClientSession<T> {
    /// Deliver `request` and return the matching reply
    pub(super) async fn deliver(&mut self, request: &Message) -> Result<Message> {
        let mut waited = Duration::ZERO;
        let mut attempts = 0u32;

        loop {
            match self.channel.send_message(request, self.server_addr).await {
                Ok(()) => {}
                // A failed send is a lost datagram as far as the retry loop cares
                Err(e) if e.is_transient() => {
                    warn!("Sending request {} failed: {e}", request.request_id);
                }
                Err(e) => return Err(e.into()),
            }
            attempts += 1;
            if attempts > 1 {
                self.stats.retransmissions += 1;
            }

            if let Some(reply) = self.await_reply(request.request_id).await? {
                debug!(
                    "Reply to request {} after {attempts} attempt(s)",
                    request.request_id
                );
                return Ok(reply);
            }

            waited += self.policy.response_timeout;
            if self.policy.is_exhausted(waited) {
                warn!(
                    "Server is assumed to be unresponsive. Stopping retransmission of request {}",
                    request.request_id
                );
                return Err(Error::ServerUnresponsive {
                    request_id: request.request_id,
                    waited,
                    attempts,
                });
            }

            warn!(
                "Did not receive response from server after {:?}. Retransmitting request {}",
                self.policy.response_timeout, request.request_id
            );
        }
    }

    /// Wait one response timeout for the reply to `request_id`.
    ///
    /// Returns `None` when the deadline passes first.
    async fn await_reply(&mut self, request_id: RequestId) -> Result<Option<Message>> {
        let deadline = Instant::now() + self.policy.response_timeout;

        loop {
            let (decoded, source) = match timeout_at(deadline, self.channel.recv_message()).await
            {
                Err(_) => return Ok(None),
                Ok(Ok(received)) => received,
                Ok(Err(e)) if e.is_transient() => {
                    warn!("Receive failed while awaiting request {request_id}: {e}");
                    return Ok(None);
                }
                Ok(Err(e)) => return Err(e.into()),
            };

            if source != self.server_addr {
                debug!("Ignoring datagram from {source}, expected {}", self.server_addr);
                continue;
            }

            let message = match decoded {
                Ok(message) => message,
                Err(e) => {
                    warn!("Dropping malformed datagram from {source}: {e}");
                    continue;
                }
            };

            if !message.is_reply() || message.request_id != request_id {
                debug!("Discarding stale {message} while awaiting request {request_id}");
                self.stats.stale_discarded += 1;
                continue;
            }

            return Ok(Some(message));
        }
    }
}
