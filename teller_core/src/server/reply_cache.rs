//! Replies kept for replay
//!
//! Operations are not idempotent, so a reply is stored when it is produced
//! and resent verbatim if the request shows up again. Entries leave only when
//! the client acknowledges them.

use crate::protocol::{Message, RequestId};
use std::collections::BTreeMap;

/// Ordered map from request id to the reply produced for it
#[derive(Debug, Default, Clone)]
pub struct ReplyCache {
    entries: BTreeMap<RequestId, Message>,
}

impl ReplyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the reply for `id`, replacing nothing that was already there
    pub fn insert(&mut self, id: RequestId, reply: Message) {
        self.entries.entry(id).or_insert(reply);
    }

    pub fn get(&self, id: RequestId) -> Option<&Message> {
        self.entries.get(&id)
    }

    /// Remove every entry with id `<= through`, returning how many went
    pub fn evict_through(&mut self, through: RequestId) -> usize {
        let kept = match through.value().checked_add(1) {
            Some(next) => self.entries.split_off(&RequestId::new(next)),
            None => BTreeMap::new(),
        };
        let evicted = self.entries.len();
        self.entries = kept;
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.entries.keys().copied()
    }

    pub fn lowest(&self) -> Option<RequestId> {
        self.entries.keys().next().copied()
    }

    pub fn highest(&self) -> Option<RequestId> {
        self.entries.keys().next_back().copied()
    }
}
