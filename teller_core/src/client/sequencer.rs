//! Request id assignment
//!
//! The client numbers each new request itself. Ids start at 0, grow by one per
//! request, and are never handed out twice, including for requests that were
//! abandoned. Once [`RequestId::MAX`] has been issued the sequencer is spent.

use crate::protocol::RequestId;

/// Monotonic request-id generator and acknowledgement tracker
#[derive(Debug, Default)]
pub struct Sequencer {
    next: u32,
    pending: Option<RequestId>,
    last_acknowledged: Option<RequestId>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn starting_at(next: u32) -> Self {
        Self {
            next,
            ..Self::default()
        }
    }

    /// Assign the id for a new request and mark it pending.
    ///
    /// Returns `None` when no id representable on the wire is left.
    pub fn next_id(&mut self) -> Option<RequestId> {
        if self.next > RequestId::MAX.value() {
            return None;
        }
        let id = RequestId::new(self.next);
        self.next += 1;
        self.pending = Some(id);
        Some(id)
    }

    /// The id currently awaiting a reply, if any
    pub fn pending(&self) -> Option<RequestId> {
        self.pending
    }

    /// Highest id whose reply this client has acknowledged
    pub fn last_acknowledged(&self) -> Option<RequestId> {
        self.last_acknowledged
    }

    /// Record that the reply to `id` was received and acknowledged
    pub fn record_acknowledged(&mut self, id: RequestId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
        self.last_acknowledged = self.last_acknowledged.max(Some(id));
    }

    /// Give up on the pending request without acknowledging it
    pub fn abandon_pending(&mut self) -> Option<RequestId> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_zero_and_increase() {
        let mut sequencer = Sequencer::new();
        assert_eq!(sequencer.next_id(), Some(RequestId::new(0)));
        assert_eq!(sequencer.next_id(), Some(RequestId::new(1)));
        assert_eq!(sequencer.next_id(), Some(RequestId::new(2)));
    }

    #[test]
    fn test_ids_stop_at_wire_limit() {
        let mut sequencer = Sequencer::starting_at(RequestId::MAX.value());
        assert_eq!(sequencer.next_id(), Some(RequestId::MAX));
        assert_eq!(sequencer.next_id(), None);
        assert_eq!(sequencer.next_id(), None);
        assert_eq!(sequencer.pending(), Some(RequestId::MAX));
    }

    #[test]
    fn test_pending_tracks_latest_request() {
        let mut sequencer = Sequencer::new();
        assert_eq!(sequencer.pending(), None);

        let id = sequencer.next_id().unwrap();
        assert_eq!(sequencer.pending(), Some(id));

        sequencer.record_acknowledged(id);
        assert_eq!(sequencer.pending(), None);
        assert_eq!(sequencer.last_acknowledged(), Some(id));
    }

    #[test]
    fn test_abandoned_ids_are_not_reused() {
        let mut sequencer = Sequencer::new();
        let first = sequencer.next_id().unwrap();
        assert_eq!(sequencer.abandon_pending(), Some(first));
        assert_eq!(sequencer.last_acknowledged(), None);

        let second = sequencer.next_id().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_last_acknowledged_never_decreases() {
        let mut sequencer = Sequencer::new();
        let a = sequencer.next_id().unwrap();
        let b = sequencer.next_id().unwrap();
        sequencer.record_acknowledged(b);
        sequencer.record_acknowledged(a);
        assert_eq!(sequencer.last_acknowledged(), Some(b));
    }
}
