//! The echo-broadcast meta-round: turns unauthenticated broadcast into
//! reliable broadcast by having every party rebroadcast a per-sender
//! hash of what it received, then checking that every other party
//! echoes the same hash for the same sender.
//!
//! A byzantine broadcaster who sends `v1` to one peer and `v2` to
//! another is caught here, and is identifiable (not just "some mismatch
//! happened") because the echo payload is keyed by sender — every
//! honest party aborts pointing at the same culprit.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::party::PartyId;
use crate::tools::hashing::{sha256, HashOutput};

/// What a party broadcasts during the echo phase: for every sender whose
/// broadcast it received this protocol round, the hash of that sender's
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoPayload {
    per_sender_hashes: BTreeMap<PartyId, HashOutput>,
}

impl EchoPayload {
    /// Builds the payload this party will broadcast, from the raw
    /// broadcast bytes it received this round.
    pub fn from_received(received: &BTreeMap<PartyId, Vec<u8>>) -> Self {
        let per_sender_hashes = received.iter().map(|(id, bytes)| (id.clone(), sha256(bytes))).collect();
        Self { per_sender_hashes }
    }
}

/// Accumulates every party's echo payload and checks consistency once all
/// have arrived.
#[derive(Debug, Default)]
pub struct EchoAccumulator {
    /// echoer -> their payload
    echoes: BTreeMap<PartyId, EchoPayload>,
}

impl EchoAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, echoer: PartyId, payload: EchoPayload) {
        self.echoes.insert(echoer, payload);
    }

    pub fn is_complete(&self, expected: &[PartyId]) -> bool {
        expected.iter().all(|id| self.echoes.contains_key(id))
    }

    /// Checks that every echoer reports the same hash for every sender.
    /// Returns the first sender whose echoed hashes disagree, if any.
    pub fn find_inconsistency(&self) -> Option<PartyId> {
        let mut reference: BTreeMap<&PartyId, &HashOutput> = BTreeMap::new();
        let mut culprit = None;
        for payload in self.echoes.values() {
            for (sender, hash) in &payload.per_sender_hashes {
                match reference.get(sender) {
                    Some(expected) if *expected != hash => {
                        culprit = Some(sender.clone());
                    }
                    Some(_) => {}
                    None => {
                        reference.insert(sender, hash);
                    }
                }
            }
        }
        culprit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn payload(entries: &[(&PartyId, HashOutput)]) -> EchoPayload {
        EchoPayload {
            per_sender_hashes: entries.iter().map(|(id, h)| ((*id).clone(), *h)).collect(),
        }
    }

    #[test]
    fn agreeing_echoes_find_no_inconsistency() {
        let a = PartyId::new(b"a".to_vec());
        let b = PartyId::new(b"b".to_vec());
        let c = PartyId::new(b"c".to_vec());
        let hash_a = sha256(b"a's round message");
        let hash_b = sha256(b"b's round message");

        let mut accumulator = EchoAccumulator::new();
        accumulator.insert(b.clone(), payload(&[(&a, hash_a), (&b, hash_b)]));
        accumulator.insert(c.clone(), payload(&[(&a, hash_a), (&b, hash_b)]));

        assert!(accumulator.is_complete(&[b.clone(), c.clone()]));
        assert_eq!(accumulator.find_inconsistency(), None);
    }

    /// Scenario: `a` broadcasts `v1` to `b` and a different `v2` to `c`.
    /// Both `b` and `c` echo honestly, and the mismatch shows up squarely
    /// on `a`.
    #[test]
    fn byzantine_broadcaster_is_identified_by_every_honest_echoer() {
        let a = PartyId::new(b"a".to_vec());
        let b = PartyId::new(b"b".to_vec());
        let c = PartyId::new(b"c".to_vec());
        let v1 = sha256(b"version sent to b");
        let v2 = sha256(b"version sent to c");
        assert_ne!(v1, v2);

        let mut accumulator = EchoAccumulator::new();
        accumulator.insert(b.clone(), payload(&[(&a, v1)]));
        accumulator.insert(c.clone(), payload(&[(&a, v2)]));

        assert!(accumulator.is_complete(&[b.clone(), c.clone()]));
        assert_eq!(accumulator.find_inconsistency(), Some(a));
    }

    #[test]
    fn incomplete_accumulator_is_not_complete() {
        let b = PartyId::new(b"b".to_vec());
        let c = PartyId::new(b"c".to_vec());
        let mut accumulator = EchoAccumulator::new();
        accumulator.insert(b.clone(), payload(&[]));
        assert!(!accumulator.is_complete(&[b, c]));
    }

    #[test]
    fn payload_from_received_hashes_each_sender_independently() {
        let a = PartyId::new(b"a".to_vec());
        let b = PartyId::new(b"b".to_vec());
        let mut received = BTreeMap::new();
        received.insert(a.clone(), vec![1, 2, 3]);
        received.insert(b.clone(), vec![4, 5, 6]);

        let payload = EchoPayload::from_received(&received);
        assert_eq!(payload.per_sender_hashes.get(&a), Some(&sha256(&[1, 2, 3])));
        assert_eq!(payload.per_sender_hashes.get(&b), Some(&sha256(&[4, 5, 6])));
    }
}
