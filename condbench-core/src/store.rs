//! Ordered ground-truth store for synthetic readings
//!
//! Readings are keyed by `(timestamp, insertion sequence)` so duplicate
//! timestamps are kept and ordered stably. Range queries come back
//! newest-first, which is the order the paginated read API uses.

use crate::condition::{Condition, ConditionLevel};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ConditionStore {
    entries: BTreeMap<(i64, u64), Condition>,
    next_seq: u64,
}

impl ConditionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(log n) insert keyed by timestamp
    pub fn insert(&mut self, condition: Condition) {
        let key = (condition.timestamp, self.next_seq);
        self.next_seq += 1;
        self.entries.insert(key, condition);
    }

    /// Most recent reading, `None` when nothing has been generated yet
    pub fn back(&self) -> Option<&Condition> {
        self.entries.values().next_back()
    }

    /// Oldest reading
    pub fn front(&self) -> Option<&Condition> {
        self.entries.values().next()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Readings with `start <= timestamp < end` and `level >= min_level`,
    /// newest first. The iterator is lazy and cheap to clone, so a query
    /// can be replayed without touching the store again.
    pub fn range(
        &self,
        start: i64,
        end: i64,
        min_level: ConditionLevel,
    ) -> impl Iterator<Item = &Condition> + Clone + '_ {
        // BTreeMap::range panics on inverted bounds
        let start = start.min(end);
        self.entries
            .range((start, 0)..(end, 0))
            .rev()
            .map(|(_, condition)| condition)
            .filter(move |condition| condition.level() >= min_level)
    }

    /// All readings in ascending timestamp order
    pub fn iter(&self) -> impl Iterator<Item = &Condition> + '_ {
        self.entries.values()
    }

    /// Every reading stamped exactly `timestamp`, in insertion order. Ties
    /// carry no order a reader may rely on.
    pub fn at(&self, timestamp: i64) -> impl Iterator<Item = &Condition> + Clone + '_ {
        self.entries
            .range((timestamp, 0)..=(timestamp, u64::MAX))
            .map(|(_, c)| c)
    }
}
