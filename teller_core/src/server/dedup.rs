//! Duplicate suppression for incoming requests

use super::session::{Dispatch, DropReason, RequestDisposition, ServerSession};
use crate::protocol::codec::MAX_PAYLOAD_LEN;
use crate::protocol::{Message, ProtocolError};
use log::{debug, info, warn};

impl ServerSession {
    /// Decide what an incoming request gets: nothing, a replay, or execution
    pub fn handle_request(&mut self, request: &Message) -> Dispatch {
        let id = request.request_id;

        match self.classify(id) {
            RequestDisposition::AlreadyAcknowledged => {
                debug!("Received old duplicate, already acknowledged, with request id {id}");
                self.stats.duplicates_dropped += 1;
                Dispatch::Dropped(DropReason::AlreadyAcknowledged)
            }
            RequestDisposition::Replay => match self.cache.get(id) {
                Some(reply) => {
                    info!("Received old duplicate with request id {id}; resending reply");
                    self.stats.replayed += 1;
                    Dispatch::Replayed(reply.clone())
                }
                None => {
                    warn!("No cached reply for processed request {id}; dropping it");
                    self.stats.duplicates_dropped += 1;
                    Dispatch::Dropped(DropReason::MissingCacheEntry)
                }
            },
            RequestDisposition::New => Dispatch::Executed(self.execute(request)),
        }
    }

    /// Execute a new request, advance the processed watermark, cache the reply
    fn execute(&mut self, request: &Message) -> Message {
        let text = match request.parse_operation() {
            Ok(operation) => self.account.apply(&operation),
            Err(e) => {
                warn!("Rejecting request {}: {e}", request.request_id);
                rejection_text(&e)
            }
        };

        let reply = Message::reply_to(request, text);
        self.last_processed = Some(request.request_id);
        self.cache.insert(request.request_id, reply.clone());
        self.stats.executed += 1;
        info!("Executed request {}: \"{}\"", request.request_id, reply.payload);
        reply
    }
}

/// Reply text for a request that could not be parsed, cut to fit one datagram
fn rejection_text(error: &ProtocolError) -> String {
    let mut text = format!("Request rejected: {error}");
    if text.len() > MAX_PAYLOAD_LEN {
        let mut end = MAX_PAYLOAD_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
