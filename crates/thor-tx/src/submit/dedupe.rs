//! Transaction-id dedupe window.

use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use alloy_primitives::B256;

/// Remembers recently submitted transaction ids for a fixed TTL.
///
/// Ids expire in submission order from the front of an insertion queue. The map holds the
/// live stamp per id, so a queue entry left behind by [`TransactionDeduper::forget`] never
/// evicts a later resubmission of the same id.
#[derive(Debug)]
pub struct TransactionDeduper {
    /// Time-to-live for seen ids.
    ttl: Duration,
    /// Live submission stamp by id.
    stamps: HashMap<B256, Instant>,
    /// Submission order, oldest first.
    order: VecDeque<(Instant, B256)>,
}

impl TransactionDeduper {
    /// Creates a dedupe window with a minimum TTL of one millisecond.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.max(Duration::from_millis(1)),
            stamps: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Records `id` at `now`. Returns false when it is still inside the window.
    pub fn check_and_insert(&mut self, id: B256, now: Instant) -> bool {
        self.evict(now);
        if self.stamps.contains_key(&id) {
            return false;
        }
        let _ = self.stamps.insert(id, now);
        self.order.push_back((now, id));
        true
    }

    /// Forgets `id`, allowing an immediate resubmit.
    pub fn forget(&mut self, id: &B256) {
        let _ = self.stamps.remove(id);
    }

    /// Number of ids inside the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// Returns true when no ids are inside the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Pops expired queue entries and drops their ids when the stamp still matches.
    fn evict(&mut self, now: Instant) {
        while let Some((stamp, id)) = self.order.front().copied() {
            if now.saturating_duration_since(stamp) < self.ttl {
                break;
            }
            let _ = self.order.pop_front();
            if self.stamps.get(&id) == Some(&stamp) {
                let _ = self.stamps.remove(&id);
            }
        }
    }
}
