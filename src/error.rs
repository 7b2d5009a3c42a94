//! The error taxonomy used throughout the crate (protocol abort / local / cancelled).

use alloc::string::String;

use displaydoc::Display;

use crate::party::PartyId;

/// An error produced while driving a session.
///
/// Mirrors the taxonomy in the design: a misbehaving peer aborts the
/// session and is named; a local failure (RNG, our own decryption) aborts
/// without a culprit; cancellation is always local.
#[derive(Debug, Display)]
pub enum Error {
    /// message from {0:?} could not be parsed for the current round
    InvalidContent(PartyId),
    /// message from {0:?} was missing a required field
    NilFields(PartyId),
    /// a zero-knowledge proof from {0:?} failed to verify: {1}
    InvalidProof(PartyId, String),
    /// message claimed to be from {0:?} but routing says otherwise
    WrongParty(PartyId),
    /// message from {0:?} targeted round {1}, session is at round {2}
    RoundMismatch(PartyId, u32, u32),
    /// message from {0:?} carried a session_id that doesn't match this session
    SessionMismatch(PartyId),
    /// duplicate message from {0:?} for round {1}
    DuplicateMessage(PartyId, u8),
    /// echo-broadcast consistency check failed, {0:?} sent inconsistent values
    EchoMismatch(PartyId),
    /// local failure unrelated to any peer: {0}
    Local(String),
    /// the session was cancelled
    Cancelled,
    /// the message did not deserialize: {0}
    Deserialization(String),
}

impl Error {
    /// The culprit party, if this error can be attributed to one peer.
    pub fn culprit(&self) -> Option<&PartyId> {
        match self {
            Error::InvalidContent(p)
            | Error::NilFields(p)
            | Error::InvalidProof(p, _)
            | Error::WrongParty(p)
            | Error::DuplicateMessage(p, _)
            | Error::EchoMismatch(p)
            | Error::SessionMismatch(p) => Some(p),
            Error::RoundMismatch(p, _, _) => Some(p),
            Error::Local(_) | Error::Cancelled | Error::Deserialization(_) => None,
        }
    }
}

/// The outcome of verifying or storing a single message, before a round
/// has a complete set and can attempt to finalize.
pub type Result<T> = core::result::Result<T, Error>;
