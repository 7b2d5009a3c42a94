//! Per-round message accumulation.

use alloc::collections::BTreeMap;

use crate::party::PartyId;

/// Accumulates one value per peer (every participant except ourselves)
/// for the round currently in flight.
///
/// Grounded on `HoleVecAccum`: a slot per expected sender, filled in as
/// messages arrive in arbitrary order, queried for completeness before
/// a round is allowed to finalize.
#[derive(Debug, Clone)]
pub struct Accumulator<T> {
    expected: alloc::vec::Vec<PartyId>,
    received: BTreeMap<PartyId, T>,
}

impl<T> Accumulator<T> {
    pub fn new(expected: impl IntoIterator<Item = PartyId>) -> Self {
        Self {
            expected: expected.into_iter().collect(),
            received: BTreeMap::new(),
        }
    }

    /// Inserts a value for `from`. Returns `false` (and leaves the
    /// previous value untouched) if `from` already delivered for this
    /// round — the caller should treat that as a duplicate-message error.
    pub fn insert(&mut self, from: PartyId, value: T) -> bool {
        if self.received.contains_key(&from) {
            return false;
        }
        self.received.insert(from, value);
        true
    }

    pub fn contains(&self, from: &PartyId) -> bool {
        self.received.contains_key(from)
    }

    pub fn is_complete(&self) -> bool {
        self.expected.iter().all(|id| self.received.contains_key(id))
    }

    pub fn missing(&self) -> impl Iterator<Item = &PartyId> {
        self.expected.iter().filter(|id| !self.received.contains_key(*id))
    }

    /// Drains the accumulator once complete, in the canonical (sorted)
    /// party order.
    pub fn into_sorted(self) -> alloc::vec::Vec<(PartyId, T)> {
        self.received.into_iter().collect()
    }

    /// Consumes the accumulator, returning everything received so far as
    /// a map (used when handing a round's inputs to `finalize`).
    pub fn into_map(self) -> BTreeMap<PartyId, T> {
        self.received
    }

    pub fn get(&self, from: &PartyId) -> Option<&T> {
        self.received.get(from)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.received.values()
    }
}

impl<T: Clone> Accumulator<T> {
    /// A cloned snapshot of everything received so far, without
    /// consuming the accumulator — used to build the echo payload from
    /// this round's broadcasts before `finalize` takes ownership.
    pub fn clone_entries(&self) -> BTreeMap<PartyId, T> {
        self.received.clone()
    }
}
