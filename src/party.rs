//! Party identifiers.

use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

/// An opaque identifier for a party taking part in a session.
///
/// Carried as arbitrary bytes rather than a numeric index, so that
/// callers can use human-readable labels such as `"a"`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(Vec<u8>);

impl PartyId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "PartyId({s:?})"),
            Err(_) => write!(f, "PartyId({:?})", hex::encode(&self.0)),
        }
    }
}

impl<T: Into<Vec<u8>>> From<T> for PartyId {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// A sorted, deduplicated set of party identifiers.
///
/// Participants are ordered canonically (by the byte value of their
/// identifier) so every party derives the same index assignment without
/// further coordination.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct IdSlice(Vec<PartyId>);

impl IdSlice {
    /// Builds a canonical, sorted, deduplicated party set.
    ///
    /// Returns `None` if `ids` is empty or contains duplicates.
    pub fn new(mut ids: Vec<PartyId>) -> Option<Self> {
        if ids.is_empty() {
            return None;
        }
        ids.sort();
        let len_before = ids.len();
        ids.dedup();
        if ids.len() != len_before {
            return None;
        }
        Some(Self(ids))
    }

    pub fn as_slice(&self) -> &[PartyId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The canonical index of `id` within this set, if present.
    pub fn index_of(&self, id: &PartyId) -> Option<usize> {
        self.0.iter().position(|x| x == id)
    }

    pub fn contains(&self, id: &PartyId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartyId> {
        self.0.iter()
    }

    /// Whether `subset` is a valid signer set drawn from this party set:
    /// no duplicates (guaranteed by `IdSlice`), every member present here,
    /// and `self_id` included.
    ///
    /// Grounded on `Config.CanSign` in `protocols/cmp/config/config.go`.
    pub fn can_sign(&self, subset: &IdSlice, self_id: &PartyId) -> bool {
        subset.contains(self_id) && subset.iter().all(|id| self.contains(id))
    }
}

/// `0 <= threshold <= n - 1`, matching `ValidThreshold` in `config.go`.
pub fn valid_threshold(threshold: u32, n: usize) -> bool {
    (n as u64) >= 1 && (threshold as u64) <= (n as u64 - 1)
}
