//! Constructors for the three session types this crate drives: CMP
//! keygen/refresh, FROST keygen, FROST sign.
//!
//! One `make_*_session` free function per protocol, rather than asking
//! callers to assemble a `SessionInfo` and `Round` by hand.

use alloc::vec::Vec;

use rand_core::CryptoRngCore;

use crate::cmp::{CMPConfig, CmpKeygenRound, KeygenMode};
use crate::curve::{Curve, Secp256k1};
use crate::frost::{FrostConfig, FrostKeygenRound, FrostSignRound, FrostSignature, SignatureVariant};
use crate::params::SchemeParams;
use crate::party::{IdSlice, PartyId};
use crate::rounds::{MultiHandler, SessionInfo};

/// Starts a CMP key-generation or key-refresh session.
pub fn make_cmp_keygen_session<P: SchemeParams>(
    rng: &mut dyn CryptoRngCore,
    self_id: PartyId,
    participants: IdSlice,
    threshold: u32,
    mode: KeygenMode,
    session_id: [u8; 32],
) -> MultiHandler<CmpKeygenRound<P>> {
    let protocol_id = match &mode {
        KeygenMode::Fresh => "accord/cmp-keygen",
        KeygenMode::Refresh { .. } => "accord/cmp-refresh",
    };
    let info = SessionInfo {
        protocol_id,
        self_id: self_id.clone(),
        participants: participants.clone(),
        threshold,
        curve_name: Secp256k1::CURVE_NAME,
        session_id,
    };
    let round = CmpKeygenRound::<P>::new(rng, self_id, participants, threshold, mode);
    MultiHandler::new(info, round, rng)
}

/// Starts a FROST key-generation session, over any [`Curve`].
pub fn make_frost_keygen_session<C: Curve>(
    rng: &mut dyn CryptoRngCore,
    self_id: PartyId,
    participants: IdSlice,
    threshold: u32,
    session_id: [u8; 32],
) -> MultiHandler<FrostKeygenRound<C>> {
    let info = SessionInfo {
        protocol_id: "accord/frost-keygen",
        self_id: self_id.clone(),
        participants: participants.clone(),
        threshold,
        curve_name: C::CURVE_NAME,
        session_id,
    };
    let round = FrostKeygenRound::<C>::new(rng, self_id, participants, threshold);
    MultiHandler::new(info, round, rng)
}

/// Starts a FROST signing session against an existing [`FrostConfig`],
/// for a chosen signer subset, message, and [`SignatureVariant`].
pub fn make_frost_signing_session<C: Curve>(
    rng: &mut dyn CryptoRngCore,
    config: FrostConfig<C>,
    signers: IdSlice,
    message: Vec<u8>,
    variant: SignatureVariant<C>,
    session_id: [u8; 32],
) -> Result<MultiHandler<FrostSignRound<C>>, crate::error::Error> {
    let self_id = config.self_id.clone();
    let threshold = config.threshold;
    let info = SessionInfo {
        protocol_id: match &variant {
            SignatureVariant::Default => "accord/frost-sign",
            SignatureVariant::Taproot => "accord/frost-sign-taproot",
            SignatureVariant::Ed25519Sha512 => "accord/frost-sign-ed25519",
            SignatureVariant::MixinPublic { .. } => "accord/frost-sign-mixin",
        },
        self_id: self_id.clone(),
        participants: signers.clone(),
        threshold,
        curve_name: C::CURVE_NAME,
        session_id,
    };
    let round = FrostSignRound::<C>::new(rng, config, signers, message, variant)?;
    Ok(MultiHandler::new(info, round, rng))
}

/// Output of a completed FROST signing session, plus its wire encoding.
pub fn encode_frost_signature<C: Curve>(signature: &FrostSignature<C>, variant: &SignatureVariant<C>) -> Vec<u8> {
    signature.encode(variant)
}

/// Output of a completed CMP keygen/refresh session.
pub type CmpKeygenOutput = CMPConfig;
