//! The protocol-agnostic round-driven session engine.
//!
//! Generalizes the `sessions::generic` module shape (`Stage<R: Round>` /
//! `Session<S: SessionState>`) from one fixed CGGMP21 protocol
//! to any of CMP keygen, FROST keygen, and FROST sign: a protocol's
//! round sequence is a single `enum` implementing [`Round`], `finalize`
//! returns either the next variant of that same enum or the protocol's
//! terminal output, and this module supplies the reusable machinery
//! around it — message routing, duplicate/round-mismatch rejection,
//! buffering of round-ahead messages, transcript binding, and the
//! echo-broadcast layer.

pub mod echo;
pub mod session;

use alloc::string::String;
use alloc::vec::Vec;

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::party::{IdSlice, PartyId};
use crate::tools::hashing::Hash;

pub use session::{MultiHandler, Session, Status};

/// Immutable per-run descriptor, seeding the transcript hash.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub protocol_id: &'static str,
    pub self_id: PartyId,
    pub participants: IdSlice,
    pub threshold: u32,
    pub curve_name: &'static str,
    pub session_id: [u8; 32],
}

impl SessionInfo {
    /// The transcript hash `H`, bound to `(protocol_id, curve_name,
    /// threshold, sorted participant IDs, session_id)`.
    pub fn initial_transcript(&self) -> Hash {
        let mut hash = Hash::new_with_dst("accord/session")
            .chain_bytes(self.protocol_id.as_bytes())
            .chain_bytes(self.curve_name.as_bytes())
            .chain(&self.threshold)
            .chain_bytes(&self.session_id);
        for id in self.participants.iter() {
            hash = hash.chain_bytes(id.as_bytes());
        }
        hash
    }

    /// A child hash forked for a specific claimant, so the same NIZK
    /// can't be replayed by a different prover.
    pub fn claimant_transcript(&self, claimant: &PartyId) -> Hash {
        self.initial_transcript().chain_bytes(claimant.as_bytes())
    }
}

/// Why a session terminated without producing output.
#[derive(Debug, Clone)]
pub enum AbortReason {
    /// A specific peer misbehaved.
    Protocol { culprit: PartyId, error: Error },
    /// A local failure with no attributable peer.
    Local(String),
    /// The caller requested cancellation.
    Cancelled,
}

/// A message as it travels on the wire: `protocol_id_string |
/// session_id | from | to | round_number_u32 | broadcast_flag_u8 |
/// content_bytes`. `content` is the canonical encoding of the round's
/// content template; `to = None` means broadcast (`broadcast_flag`).
/// `session_id` binds a message to the run it was produced for, so a
/// message captured from a different, concurrently running session with
/// the same participants and round number is rejected rather than
/// silently accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub from: PartyId,
    pub to: Option<PartyId>,
    pub session_id: [u8; 32],
    pub round_number: u32,
    pub content: Vec<u8>,
}

/// What `finalize` hands back to the session: either the next phase of
/// the same protocol, or its final output.
pub enum Advance<R: Round> {
    Next(R),
    Output(R::Output),
}

/// One protocol's round sequence, modeled as a sum type.
///
/// Every method that needs randomness takes it as a parameter rather
/// than owning an RNG, so the session engine remains the single place
/// that holds one.
pub trait Round: Sized {
    type Output;

    /// 1-indexed round number, matching the numbering in the wire
    /// `Message`.
    fn round_number(&self) -> u32;

    /// Whether this round emits a broadcast (and therefore needs an
    /// echo round appended after it finalizes).
    fn has_broadcast(&self) -> bool;

    /// Whether this round emits direct (peer-to-peer) messages.
    fn has_direct(&self) -> bool;

    /// The direct message template this round has prepared for each
    /// peer.
    fn direct_messages(&self, rng: &mut dyn CryptoRngCore) -> alloc::collections::BTreeMap<PartyId, Vec<u8>>;

    /// The broadcast message template this round has prepared, if any.
    fn broadcast_message(&self, rng: &mut dyn CryptoRngCore) -> Option<Vec<u8>>;

    /// Verifies and deserializes a direct message from `from` before it
    /// is accepted into the round's accumulator.
    fn verify_direct(&self, from: &PartyId, content: &[u8]) -> Result<(), Error>;

    /// Verifies and deserializes a broadcast message from `from`.
    fn verify_broadcast(&self, from: &PartyId, content: &[u8]) -> Result<(), Error>;

    /// Consumes the round once every expected direct and broadcast
    /// message (post echo-check) has arrived, producing the next phase
    /// or the protocol's output. `transcript` is updated in place with
    /// this round's public outputs before any challenge for the *next*
    /// round is drawn.
    fn finalize(
        self,
        rng: &mut dyn CryptoRngCore,
        direct: alloc::collections::BTreeMap<PartyId, Vec<u8>>,
        broadcast: alloc::collections::BTreeMap<PartyId, Vec<u8>>,
        transcript: &mut Hash,
    ) -> Result<Advance<Self>, Error>;
}
