//! FROST key generation, three rounds:
//!
//! 1. commit — broadcast a hash-commitment to round 2's opening.
//! 2. open — broadcast `F_i` (the Feldman/Pedersen-VSS commitment to a
//!    fresh degree-`t` polynomial) and a Schnorr proof of knowledge of
//!    `secret_i = f_i(0)`; send each peer its share `f_i(j)` directly.
//! 3. combine — a purely local round: every share is checked against
//!    its sender's `F_j`, then summed into the final secret share,
//!    joint public key, and per-party verification shares.
//!
//! Grounded on the commit/open/share shape of `cmp::keygen`, generalized
//! over [`Curve`] since FROST (unlike CMP) runs over either secp256k1
//! or Edwards25519.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::curve::{Curve, CurvePoint};
use crate::error::Error;
use crate::frost::config::FrostConfig;
use crate::party::{IdSlice, PartyId};
use crate::rounds::{Advance, Round};
use crate::sigma::SchProof;
use crate::tools::hashing::{sha256, Hash, HashOutput};
use crate::tools::polynomial::{evaluate_commitment, Polynomial};
use crate::tools::random::random_bytes32;

#[derive(Clone)]
struct Context {
    self_id: PartyId,
    participants: IdSlice,
    threshold: u32,
}

impl Context {
    fn peers(&self) -> impl Iterator<Item = &PartyId> {
        self.participants.iter().filter(|id| **id != self.self_id)
    }

    fn x_coordinate<C: Curve>(&self, id: &PartyId) -> C::Scalar {
        crate::tools::id_to_scalar::<C>(id)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "")]
struct Opening<C: Curve> {
    feldman_commitment: Vec<C::Point>,
    schnorr_proof: SchProof<C>,
    decommitment_nonce: [u8; 32],
}

impl<C: Curve> Opening<C> {
    fn commitment(&self) -> HashOutput {
        sha256(&rmp_serde::to_vec(self).expect("serialization is infallible"))
    }
}

#[derive(Serialize, Deserialize)]
struct Round1Broadcast {
    commitment: HashOutput,
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
struct Round2Direct<C: Curve> {
    share: C::Scalar,
}

pub enum FrostKeygenRound<C: Curve> {
    R1(Round1<C>),
    R2(Round2<C>),
    R3(Round3<C>),
}

impl<C: Curve> FrostKeygenRound<C> {
    pub fn new(rng: &mut dyn CryptoRngCore, self_id: PartyId, participants: IdSlice, threshold: u32) -> Self {
        let ctx = Context {
            self_id,
            participants,
            threshold,
        };
        FrostKeygenRound::R1(Round1::new(rng, ctx))
    }
}

pub struct Round1<C: Curve> {
    ctx: Context,
    polynomial: Polynomial<C>,
    opening: Opening<C>,
}

impl<C: Curve> Round1<C> {
    fn new(rng: &mut dyn CryptoRngCore, ctx: Context) -> Self {
        let secret = crate::tools::random::random_scalar::<C::Scalar>(rng);
        let polynomial = Polynomial::<C>::random_with_constant(rng, ctx.threshold, secret);
        let feldman_commitment = polynomial.commit();
        let public = C::Point::mul_by_generator(&secret);
        let transcript = Hash::new_with_dst("accord/frost-keygen").chain_bytes(ctx.self_id.as_bytes());
        let schnorr_proof = SchProof::<C>::prove(rng, &secret, &public, transcript);
        let opening = Opening {
            feldman_commitment,
            schnorr_proof,
            decommitment_nonce: random_bytes32(rng),
        };
        Self { ctx, polynomial, opening }
    }
}

impl<C: Curve> Round for FrostKeygenRound<C> {
    type Output = FrostConfig<C>;

    fn round_number(&self) -> u32 {
        match self {
            FrostKeygenRound::R1(_) => 1,
            FrostKeygenRound::R2(_) => 2,
            FrostKeygenRound::R3(_) => 3,
        }
    }

    fn has_broadcast(&self) -> bool {
        !matches!(self, FrostKeygenRound::R3(_))
    }

    fn has_direct(&self) -> bool {
        matches!(self, FrostKeygenRound::R2(_))
    }

    fn direct_messages(&self, _rng: &mut dyn CryptoRngCore) -> BTreeMap<PartyId, Vec<u8>> {
        match self {
            FrostKeygenRound::R2(round) => round
                .ctx
                .peers()
                .map(|peer| {
                    let share = round.polynomial.evaluate(&round.ctx.x_coordinate::<C>(peer));
                    (peer.clone(), rmp_serde::to_vec(&Round2Direct::<C> { share }).expect("serialization is infallible"))
                })
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    fn broadcast_message(&self, _rng: &mut dyn CryptoRngCore) -> Option<Vec<u8>> {
        match self {
            FrostKeygenRound::R1(round) => Some(
                rmp_serde::to_vec(&Round1Broadcast {
                    commitment: round.opening.commitment(),
                })
                .expect("serialization is infallible"),
            ),
            FrostKeygenRound::R2(round) => Some(rmp_serde::to_vec(&round.opening).expect("serialization is infallible")),
            FrostKeygenRound::R3(_) => None,
        }
    }

    fn verify_direct(&self, from: &PartyId, content: &[u8]) -> Result<(), Error> {
        match self {
            FrostKeygenRound::R2(_) => rmp_serde::from_slice::<Round2Direct<C>>(content)
                .map(|_| ())
                .map_err(|e| Error::Deserialization(alloc::format!("{e}"))),
            _ => Err(Error::InvalidContent(from.clone())),
        }
    }

    fn verify_broadcast(&self, from: &PartyId, content: &[u8]) -> Result<(), Error> {
        match self {
            FrostKeygenRound::R1(_) => rmp_serde::from_slice::<Round1Broadcast>(content)
                .map(|_| ())
                .map_err(|e| Error::Deserialization(alloc::format!("{e}"))),
            FrostKeygenRound::R2(round) => {
                let opening: Opening<C> =
                    rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
                let expected = round
                    .commitments
                    .get(from)
                    .ok_or_else(|| Error::InvalidContent(from.clone()))?;
                if opening.commitment() != *expected {
                    return Err(Error::InvalidProof(from.clone(), "round-1 commitment did not open".into()));
                }
                if opening.feldman_commitment.len() != round.ctx.threshold as usize + 1 {
                    return Err(Error::NilFields(from.clone()));
                }
                let public = opening.feldman_commitment[0];
                let transcript = Hash::new_with_dst("accord/frost-keygen").chain_bytes(from.as_bytes());
                if !opening.schnorr_proof.verify(&public, transcript) {
                    return Err(Error::InvalidProof(from.clone(), "zk-sch".into()));
                }
                Ok(())
            }
            FrostKeygenRound::R3(_) => Err(Error::InvalidContent(from.clone())),
        }
    }

    fn finalize(
        self,
        _rng: &mut dyn CryptoRngCore,
        direct: BTreeMap<PartyId, Vec<u8>>,
        broadcast: BTreeMap<PartyId, Vec<u8>>,
        transcript: &mut Hash,
    ) -> Result<Advance<Self>, Error> {
        match self {
            FrostKeygenRound::R1(round) => round.finalize(broadcast, transcript),
            FrostKeygenRound::R2(round) => round.finalize(direct, broadcast, transcript),
            FrostKeygenRound::R3(round) => round.finalize(),
        }
    }
}

impl<C: Curve> Round1<C> {
    fn finalize(self, broadcast: BTreeMap<PartyId, Vec<u8>>, transcript: &mut Hash) -> Result<Advance<FrostKeygenRound<C>>, Error> {
        let mut commitments = BTreeMap::new();
        for (id, content) in &broadcast {
            let msg: Round1Broadcast =
                rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
            commitments.insert(id.clone(), msg.commitment);
        }
        commitments.insert(self.ctx.self_id.clone(), self.opening.commitment());
        for (id, commitment) in &commitments {
            *transcript = core::mem::replace(transcript, Hash::new_with_dst("accord/frost-keygen"))
                .chain_bytes(id.as_bytes())
                .chain_bytes(commitment);
        }
        Ok(Advance::Next(FrostKeygenRound::R2(Round2 {
            ctx: self.ctx,
            polynomial: self.polynomial,
            opening: self.opening,
            commitments,
        })))
    }
}

pub struct Round2<C: Curve> {
    ctx: Context,
    polynomial: Polynomial<C>,
    opening: Opening<C>,
    commitments: BTreeMap<PartyId, HashOutput>,
}

impl<C: Curve> Round2<C> {
    fn finalize(
        self,
        direct: BTreeMap<PartyId, Vec<u8>>,
        broadcast: BTreeMap<PartyId, Vec<u8>>,
        _transcript: &mut Hash,
    ) -> Result<Advance<FrostKeygenRound<C>>, Error> {
        let mut openings = BTreeMap::new();
        for (id, content) in &broadcast {
            let opening: Opening<C> =
                rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
            openings.insert(id.clone(), opening);
        }
        openings.insert(self.ctx.self_id.clone(), self.opening.clone());

        let mut received_shares = BTreeMap::new();
        for (id, content) in &direct {
            let msg: Round2Direct<C> =
                rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
            received_shares.insert(id.clone(), msg.share);
        }

        let own_share_self = self.polynomial.evaluate(&self.ctx.x_coordinate::<C>(&self.ctx.self_id));

        Ok(Advance::Next(FrostKeygenRound::R3(Round3 {
            ctx: self.ctx,
            openings,
            received_shares,
            own_share_self,
        })))
    }
}

pub struct Round3<C: Curve> {
    ctx: Context,
    openings: BTreeMap<PartyId, Opening<C>>,
    received_shares: BTreeMap<PartyId, C::Scalar>,
    own_share_self: C::Scalar,
}

impl<C: Curve> Round3<C> {
    fn finalize(self) -> Result<Advance<FrostKeygenRound<C>>, Error> {
        let self_id = self.ctx.self_id.clone();
        let x_self = self.ctx.x_coordinate::<C>(&self_id);

        let mut secret_share = self.own_share_self;
        for (sender, share) in &self.received_shares {
            let opening = self.openings.get(sender).ok_or_else(|| Error::InvalidContent(sender.clone()))?;
            let expected = evaluate_commitment::<C>(&opening.feldman_commitment, &x_self);
            if C::Point::mul_by_generator(share) != expected {
                return Err(Error::InvalidProof(sender.clone(), "Feldman share check failed".into()));
            }
            secret_share = secret_share + *share;
        }

        let public_key = self
            .openings
            .values()
            .map(|opening| opening.feldman_commitment[0])
            .fold(C::Point::identity(), |acc, point| acc + point);

        let mut verification_shares = BTreeMap::new();
        for id in self.ctx.participants.iter() {
            let x_id = self.ctx.x_coordinate::<C>(id);
            let share_point = self
                .openings
                .values()
                .map(|opening| evaluate_commitment::<C>(&opening.feldman_commitment, &x_id))
                .fold(C::Point::identity(), |acc, point| acc + point);
            verification_shares.insert(id.clone(), share_point);
        }

        Ok(Advance::Output(FrostConfig {
            self_id,
            participants: self.ctx.participants,
            threshold: self.ctx.threshold,
            secret_share,
            public_key,
            verification_shares,
        }))
    }
}
