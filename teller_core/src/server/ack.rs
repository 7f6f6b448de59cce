//! Acknowledgement-driven reply cache eviction

use super::session::{Dispatch, DropReason, ServerSession};
use crate::protocol::Message;
use log::{info, warn};

impl ServerSession {
    /// Apply an acknowledgement: evict every reply it covers and raise the
    /// acknowledged watermark. Repeating an acknowledgement changes nothing.
    ///
    /// Acknowledgements for ids that were never replied to are ignored so the
    /// acknowledged watermark never passes the processed one.
    pub fn handle_acknowledgement(&mut self, ack: &Message) -> Dispatch {
        let ack_id = ack.request_id;

        if self.last_processed.is_none_or(|processed| ack_id > processed) {
            warn!("Ignoring acknowledgement of unprocessed request {ack_id}");
            return Dispatch::Dropped(DropReason::AckBeyondProcessed);
        }

        let evicted = self.cache.evict_through(ack_id);
        if self.last_acknowledged.is_none_or(|acked| ack_id > acked) {
            self.last_acknowledged = Some(ack_id);
        }
        self.stats.acknowledgements += 1;

        info!("Processed acknowledgement of request {ack_id} ({evicted} cached replies evicted)");
        Dispatch::Acknowledged {
            request_id: ack_id,
            evicted,
        }
    }
}
