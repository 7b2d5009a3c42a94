//! CMP key generation / refresh, five rounds:
//!
//! 1. commit — broadcast a hash-commitment to round 2's opening.
//! 2. open — broadcast the opening; verify Paillier/Pedersen well-formedness.
//! 3. VSS share + proofs — Paillier-encrypted Feldman share sent direct
//!    to each peer, plus a broadcast zk-mod / zk-prm / zk-fac proof set
//!    about this party's own keys (zk-fac checked against the sender's
//!    own Pedersen aux, per `round4.go`'s `StoreBroadcastMessage`).
//! 4. verify + VSS check — a purely local round: decrypt every received
//!    share, check it against the sender's Feldman commitment, verify
//!    every proof from round 3.
//! 5. Schnorr proof of knowledge — broadcast a proof of knowledge of the
//!    final combined share, then assemble the `CMPConfig`.
//!
//! Grounded on `protocols/keygen.rs`'s commit/open/VSS-share round
//! shape, generalized from a single fixed protocol to the CMP-specific
//! combination of proofs this keygen/refresh needs.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::marker::PhantomData;

use crypto_bigint::BoxedUint;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::bigint::Uint;
use crate::cmp::config::{CMPConfig, Public};
use crate::curve::secp256k1::{Point, Scalar};
use crate::curve::{Curve, CurvePoint, CurveScalar, Secp256k1};
use crate::error::Error;
use crate::paillier::{self, PublicKey as PaillierPublic, SecretKey as PaillierSecret};
use crate::params::SchemeParams;
use crate::party::{IdSlice, PartyId};
use crate::pedersen::{PedersenParams, PedersenSecret};
use crate::rounds::{Advance, Round};
use crate::sigma::{FacProof, ModProof, PrmProof, SchProof};
use crate::tools::hashing::{sha256, Hash, HashOutput};
use crate::tools::polynomial::{evaluate_commitment, Polynomial};
use crate::tools::random::{random_bytes32, random_scalar};

/// Whether this run introduces a fresh secret or re-randomizes an
/// existing one (adding the old share back in on refresh).
#[derive(Clone)]
pub enum KeygenMode {
    Fresh,
    Refresh {
        old_share: Scalar,
        old_public: BTreeMap<PartyId, Point>,
    },
}

impl KeygenMode {
    fn old_share(&self) -> Scalar {
        match self {
            KeygenMode::Fresh => Scalar::zero(),
            KeygenMode::Refresh { old_share, .. } => *old_share,
        }
    }

    fn old_public(&self, id: &PartyId) -> Point {
        match self {
            KeygenMode::Fresh => Point::identity(),
            KeygenMode::Refresh { old_public, .. } => old_public.get(id).copied().unwrap_or_else(Point::identity),
        }
    }
}

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

    fn x_coordinate(&self, id: &PartyId) -> Scalar {
        crate::tools::id_to_scalar::<Secp256k1>(id)
    }
}

/// Round 2's opening: the pre-image of round 1's commitment.
#[derive(Clone, Serialize, Deserialize)]
struct Opening {
    rid_contribution: [u8; 32],
    chain_key_contribution: [u8; 32],
    feldman_commitment: Vec<Point>,
    elgamal_public: Point,
    paillier_n: Uint,
    pedersen_s: Uint,
    pedersen_t: Uint,
    decommitment_nonce: [u8; 32],
}

impl Opening {
    fn commitment(&self) -> HashOutput {
        sha256(&rmp_serde::to_vec(self).expect("Opening serialization is infallible"))
    }

    fn paillier_public(&self) -> PaillierPublic {
        PaillierPublic::from_n(self.paillier_n.clone())
    }

    fn pedersen_params(&self) -> PedersenParams {
        PedersenParams::new(self.paillier_n.clone(), self.pedersen_s.clone(), self.pedersen_t.clone())
    }
}

#[derive(Serialize, Deserialize)]
struct Round1Broadcast {
    commitment: HashOutput,
}

#[derive(Serialize, Deserialize)]
struct Round3Direct {
    ciphertext: Uint,
}

#[derive(Serialize, Deserialize)]
struct Round3Broadcast {
    mod_proof: ModProof,
    prm_proof: PrmProof,
    fac_proof: FacProof,
}

#[derive(Serialize, Deserialize)]
struct Round5Broadcast {
    proof: SchProof<Secp256k1>,
}

/// The full five-round CMP keygen/refresh sequence, modeled as a sum
/// type, one variant per round.
pub enum CmpKeygenRound<P: SchemeParams> {
    R1(Round1<P>),
    R3(Round3<P>),
    R4(Round4<P>),
    R5(Round5<P>),
    // round 2 is structurally identical to round 1 (broadcast-only,
    // nothing to verify beyond decommitment), so it reuses `Round2<P>`
    // defined below rather than duplicating a near-empty variant here.
    R2(Round2<P>),
}

impl<P: SchemeParams> CmpKeygenRound<P> {
    /// Starts a fresh keygen or refresh run.
    pub fn new(
        rng: &mut dyn CryptoRngCore,
        self_id: PartyId,
        participants: IdSlice,
        threshold: u32,
        mode: KeygenMode,
    ) -> Self {
        let ctx = Context {
            self_id,
            participants,
            threshold,
        };
        CmpKeygenRound::R1(Round1::new(rng, ctx, mode))
    }
}

pub struct Round1<P: SchemeParams> {
    ctx: Context,
    mode: KeygenMode,
    polynomial: Polynomial<Secp256k1>,
    elgamal_secret: Scalar,
    paillier_secret: PaillierSecret,
    pedersen_secret: PedersenSecret,
    opening: Opening,
    _params: PhantomData<P>,
}

impl<P: SchemeParams> Round1<P> {
    fn new(rng: &mut dyn CryptoRngCore, ctx: Context, mode: KeygenMode) -> Self {
        // Fresh keygen: each party's contribution is a random polynomial
        // whose constant term is its share of the new secret. Refresh:
        // the constant term is zero, contributions only re-randomize.
        let constant = match &mode {
            KeygenMode::Fresh => random_scalar::<Scalar>(rng),
            KeygenMode::Refresh { .. } => Scalar::zero(),
        };
        let polynomial = Polynomial::<Secp256k1>::random_with_constant(rng, ctx.threshold, constant);
        let feldman_commitment = polynomial.commit();

        let elgamal_secret = random_scalar::<Scalar>(rng);
        let elgamal_public = Point::mul_by_generator(&elgamal_secret);

        let paillier_secret = PaillierSecret::random::<P>(rng);
        let totient = paillier_secret.totient();
        let pedersen_secret = PedersenSecret::generate(rng, paillier_secret.public_key().n().clone(), totient);

        let opening = Opening {
            rid_contribution: random_bytes32(rng),
            chain_key_contribution: random_bytes32(rng),
            feldman_commitment,
            elgamal_public,
            paillier_n: paillier_secret.public_key().n().clone(),
            pedersen_s: pedersen_secret.public().s().clone(),
            pedersen_t: pedersen_secret.public().t().clone(),
            decommitment_nonce: random_bytes32(rng),
        };

        Self {
            ctx,
            mode,
            polynomial,
            elgamal_secret,
            paillier_secret,
            pedersen_secret,
            opening,
            _params: PhantomData,
        }
    }
}

impl<P: SchemeParams> Round for CmpKeygenRound<P> {
    type Output = CMPConfig;

    fn round_number(&self) -> u32 {
        match self {
            CmpKeygenRound::R1(_) => 1,
            CmpKeygenRound::R2(_) => 2,
            CmpKeygenRound::R3(_) => 3,
            CmpKeygenRound::R4(_) => 4,
            CmpKeygenRound::R5(_) => 5,
        }
    }

    fn has_broadcast(&self) -> bool {
        !matches!(self, CmpKeygenRound::R4(_))
    }

    fn has_direct(&self) -> bool {
        matches!(self, CmpKeygenRound::R3(_))
    }

    fn direct_messages(&self, _rng: &mut dyn CryptoRngCore) -> BTreeMap<PartyId, Vec<u8>> {
        match self {
            CmpKeygenRound::R3(round) => round
                .outgoing_shares
                .iter()
                .map(|(id, msg)| (id.clone(), rmp_serde::to_vec(msg).expect("serialization is infallible")))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    fn broadcast_message(&self, _rng: &mut dyn CryptoRngCore) -> Option<Vec<u8>> {
        match self {
            CmpKeygenRound::R1(round) => Some(
                rmp_serde::to_vec(&Round1Broadcast {
                    commitment: round.opening.commitment(),
                })
                .expect("serialization is infallible"),
            ),
            CmpKeygenRound::R2(round) => Some(rmp_serde::to_vec(&round.opening).expect("serialization is infallible")),
            CmpKeygenRound::R3(round) => Some(
                rmp_serde::to_vec(&Round3Broadcast {
                    mod_proof: round.mod_proof.clone(),
                    prm_proof: round.prm_proof.clone(),
                    fac_proof: round.fac_proof.clone(),
                })
                .expect("serialization is infallible"),
            ),
            CmpKeygenRound::R4(_) => None,
            CmpKeygenRound::R5(round) => {
                Some(rmp_serde::to_vec(&Round5Broadcast { proof: round.schnorr_proof.clone() }).expect("serialization is infallible"))
            }
        }
    }

    fn verify_direct(&self, from: &PartyId, content: &[u8]) -> Result<(), Error> {
        match self {
            CmpKeygenRound::R3(_) => rmp_serde::from_slice::<Round3Direct>(content)
                .map(|_| ())
                .map_err(|e| Error::Deserialization(alloc::format!("{e}"))),
            _ => Err(Error::InvalidContent(from.clone())),
        }
    }

    fn verify_broadcast(&self, from: &PartyId, content: &[u8]) -> Result<(), Error> {
        match self {
            CmpKeygenRound::R1(_) => {
                rmp_serde::from_slice::<Round1Broadcast>(content)
                    .map(|_| ())
                    .map_err(|e| Error::Deserialization(alloc::format!("{e}")))
            }
            CmpKeygenRound::R2(round) => {
                let opening: Opening =
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
                if !opening.paillier_public().is_well_formed::<P>() {
                    return Err(Error::InvalidProof(from.clone(), "Paillier N not well-formed".into()));
                }
                if !opening.pedersen_params().is_well_formed() {
                    return Err(Error::InvalidProof(from.clone(), "Pedersen params not well-formed".into()));
                }
                Ok(())
            }
            CmpKeygenRound::R3(round) => {
                let msg: Round3Broadcast =
                    rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
                let opening = round
                    .openings
                    .get(from)
                    .ok_or_else(|| Error::InvalidContent(from.clone()))?;
                let claimant_transcript = round.base_transcript.clone().chain_bytes(from.as_bytes());
                if !msg.mod_proof.verify::<P>(&opening.paillier_public(), claimant_transcript.clone()) {
                    return Err(Error::InvalidProof(from.clone(), "zk-mod".into()));
                }
                if !msg.prm_proof.verify::<P>(&opening.pedersen_params(), claimant_transcript.clone()) {
                    return Err(Error::InvalidProof(from.clone(), "zk-prm".into()));
                }
                // zk-fac is checked against the sender's own aux, not the
                // receiver's (`round4.go`'s `StoreBroadcastMessage`).
                if !msg.fac_proof.verify::<P>(&opening.paillier_n, &opening.pedersen_params(), claimant_transcript) {
                    return Err(Error::InvalidProof(from.clone(), "zk-fac".into()));
                }
                Ok(())
            }
            CmpKeygenRound::R5(round) => {
                let msg: Round5Broadcast =
                    rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
                let public_point = round
                    .final_public
                    .get(from)
                    .ok_or_else(|| Error::InvalidContent(from.clone()))?;
                if !msg.proof.verify(public_point, round.schnorr_transcript.clone()) {
                    return Err(Error::InvalidProof(from.clone(), "zk-sch".into()));
                }
                Ok(())
            }
            CmpKeygenRound::R4(_) => Err(Error::InvalidContent(from.clone())),
        }
    }

    fn finalize(
        self,
        rng: &mut dyn CryptoRngCore,
        direct: BTreeMap<PartyId, Vec<u8>>,
        broadcast: BTreeMap<PartyId, Vec<u8>>,
        transcript: &mut Hash,
    ) -> Result<Advance<Self>, Error> {
        match self {
            CmpKeygenRound::R1(round) => round.finalize(broadcast, transcript),
            CmpKeygenRound::R2(round) => round.finalize(rng, broadcast, transcript),
            CmpKeygenRound::R3(round) => round.finalize(direct, broadcast, transcript),
            CmpKeygenRound::R4(round) => round.finalize(rng, transcript),
            CmpKeygenRound::R5(round) => round.finalize(broadcast),
        }
    }
}

impl<P: SchemeParams> Round1<P> {
    fn finalize(self, broadcast: BTreeMap<PartyId, Vec<u8>>, transcript: &mut Hash) -> Result<Advance<CmpKeygenRound<P>>, Error> {
        let mut commitments = BTreeMap::new();
        for (id, content) in &broadcast {
            let msg: Round1Broadcast =
                rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
            commitments.insert(id.clone(), msg.commitment);
        }
        commitments.insert(self.ctx.self_id.clone(), self.opening.commitment());

        for (id, commitment) in &commitments {
            *transcript = core::mem::replace(transcript, Hash::new_with_dst("accord/cmp-keygen"))
                .chain_bytes(id.as_bytes())
                .chain_bytes(commitment);
        }

        Ok(Advance::Next(CmpKeygenRound::R2(Round2 {
            ctx: self.ctx,
            mode: self.mode,
            polynomial: self.polynomial,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            pedersen_secret: self.pedersen_secret,
            opening: self.opening,
            commitments,
            _params: PhantomData,
        })))
    }
}

pub struct Round2<P: SchemeParams> {
    ctx: Context,
    mode: KeygenMode,
    polynomial: Polynomial<Secp256k1>,
    elgamal_secret: Scalar,
    paillier_secret: PaillierSecret,
    pedersen_secret: PedersenSecret,
    opening: Opening,
    commitments: BTreeMap<PartyId, HashOutput>,
    _params: PhantomData<P>,
}

impl<P: SchemeParams> Round2<P> {
    fn finalize(
        self,
        rng: &mut dyn CryptoRngCore,
        broadcast: BTreeMap<PartyId, Vec<u8>>,
        transcript: &mut Hash,
    ) -> Result<Advance<CmpKeygenRound<P>>, Error> {
        let mut openings = BTreeMap::new();
        for (id, content) in &broadcast {
            let opening: Opening =
                rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
            openings.insert(id.clone(), opening);
        }
        openings.insert(self.ctx.self_id.clone(), self.opening.clone());

        let mut rid = [0u8; 32];
        let mut chain_key = [0u8; 32];
        for opening in openings.values() {
            for i in 0..32 {
                rid[i] ^= opening.rid_contribution[i];
                chain_key[i] ^= opening.chain_key_contribution[i];
            }
        }

        for (id, opening) in &openings {
            *transcript = core::mem::replace(transcript, Hash::new_with_dst("accord/cmp-keygen"))
                .chain_bytes(id.as_bytes())
                .chain_bytes(&opening.paillier_n.to_be_bytes())
                .chain_bytes(&opening.pedersen_s.to_be_bytes())
                .chain_bytes(&opening.pedersen_t.to_be_bytes());
        }
        let base_transcript = transcript.clone();

        let own_transcript = base_transcript.clone().chain_bytes(self.ctx.self_id.as_bytes());
        let mod_proof = ModProof::prove::<P>(rng, &self.paillier_secret, own_transcript.clone());
        let prm_proof = PrmProof::prove::<P>(rng, &self.pedersen_secret, own_transcript.clone());
        // Against our own aux, not a peer's (`round4.go`'s `StoreBroadcastMessage`
        // builds `Aux` from the sender's own `N, S, T`).
        let fac_proof = FacProof::prove::<P>(rng, &self.paillier_secret, self.pedersen_secret.public(), own_transcript);

        // Our own share of our own polynomial never travels over the
        // wire — we just evaluate it locally.
        let own_share_self = self.polynomial.evaluate(&self.ctx.x_coordinate(&self.ctx.self_id));

        let mut outgoing_shares = BTreeMap::new();
        for peer in self.ctx.peers() {
            let peer_opening = openings.get(peer).ok_or_else(|| Error::InvalidContent(peer.clone()))?;
            let peer_public = peer_opening.paillier_public();

            let x_peer = self.ctx.x_coordinate(peer);
            let share = self.polynomial.evaluate(&x_peer);
            let plaintext = BoxedUint::from_be_slice(&share.to_bytes(), peer_public.n().bits_precision());
            let (ciphertext, _randomizer) = paillier::encrypt(rng, &peer_public, &plaintext);

            outgoing_shares.insert(peer.clone(), Round3Direct { ciphertext });
        }

        Ok(Advance::Next(CmpKeygenRound::R3(Round3 {
            ctx: self.ctx,
            mode: self.mode,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            pedersen_secret: self.pedersen_secret,
            openings,
            rid,
            chain_key,
            own_share_self,
            base_transcript,
            mod_proof,
            prm_proof,
            fac_proof,
            outgoing_shares,
            _params: PhantomData,
        })))
    }
}

pub struct Round3<P: SchemeParams> {
    ctx: Context,
    mode: KeygenMode,
    elgamal_secret: Scalar,
    paillier_secret: PaillierSecret,
    pedersen_secret: PedersenSecret,
    openings: BTreeMap<PartyId, Opening>,
    rid: [u8; 32],
    chain_key: [u8; 32],
    own_share_self: Scalar,
    base_transcript: Hash,
    mod_proof: ModProof,
    prm_proof: PrmProof,
    fac_proof: FacProof,
    outgoing_shares: BTreeMap<PartyId, Round3Direct>,
    _params: PhantomData<P>,
}

impl<P: SchemeParams> Round3<P> {
    fn finalize(
        self,
        direct: BTreeMap<PartyId, Vec<u8>>,
        broadcast: BTreeMap<PartyId, Vec<u8>>,
        transcript: &mut Hash,
    ) -> Result<Advance<CmpKeygenRound<P>>, Error> {
        let mut received_shares = BTreeMap::new();
        for (id, content) in &direct {
            let msg: Round3Direct =
                rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
            received_shares.insert(id.clone(), msg);
        }
        let mut received_proofs = BTreeMap::new();
        for (id, content) in &broadcast {
            let msg: Round3Broadcast =
                rmp_serde::from_slice(content).map_err(|e| Error::Deserialization(alloc::format!("{e}")))?;
            received_proofs.insert(id.clone(), msg);
        }

        for id in self.ctx.peers() {
            *transcript = core::mem::replace(transcript, Hash::new_with_dst("accord/cmp-keygen")).chain_bytes(id.as_bytes());
        }

        Ok(Advance::Next(CmpKeygenRound::R4(Round4 {
            ctx: self.ctx,
            mode: self.mode,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            pedersen_secret: self.pedersen_secret,
            openings: self.openings,
            rid: self.rid,
            chain_key: self.chain_key,
            own_share_self: self.own_share_self,
            received_shares,
            _received_proofs: received_proofs,
            _params: PhantomData,
        })))
    }
}

pub struct Round4<P: SchemeParams> {
    ctx: Context,
    mode: KeygenMode,
    elgamal_secret: Scalar,
    paillier_secret: PaillierSecret,
    pedersen_secret: PedersenSecret,
    openings: BTreeMap<PartyId, Opening>,
    rid: [u8; 32],
    chain_key: [u8; 32],
    own_share_self: Scalar,
    received_shares: BTreeMap<PartyId, Round3Direct>,
    // Verified already at the wire boundary (`verify_direct`/
    // `verify_broadcast` for round 3); kept only so round 4's finalize
    // can be audited against what was actually delivered.
    _received_proofs: BTreeMap<PartyId, Round3Broadcast>,
    _params: PhantomData<P>,
}

impl<P: SchemeParams> Round4<P> {
    fn finalize(self, rng: &mut dyn CryptoRngCore, transcript: &mut Hash) -> Result<Advance<CmpKeygenRound<P>>, Error> {
        let self_id = self.ctx.self_id.clone();
        let x_self = self.ctx.x_coordinate(&self_id);

        let mut final_share = self.mode.old_share() + self.own_share_self;
        for (sender, msg) in &self.received_shares {
            let plaintext = self
                .paillier_secret
                .decrypt(&msg.ciphertext)
                .ok_or_else(|| Error::InvalidContent(sender.clone()))?;
            let share = uint_to_scalar(&plaintext).ok_or_else(|| Error::InvalidProof(sender.clone(), "share out of range".into()))?;

            let sender_opening = self.openings.get(sender).ok_or_else(|| Error::InvalidContent(sender.clone()))?;
            let expected = evaluate_commitment::<Secp256k1>(&sender_opening.feldman_commitment, &x_self);
            if Point::mul_by_generator(&share) != expected {
                return Err(Error::InvalidProof(sender.clone(), "Feldman share check failed".into()));
            }
            final_share = final_share + share;
        }

        let mut final_public = BTreeMap::new();
        for id in self.ctx.participants.iter() {
            let x_id = self.ctx.x_coordinate(id);
            let mut point = self.mode.old_public(id);
            for opening in self.openings.values() {
                point = point + evaluate_commitment::<Secp256k1>(&opening.feldman_commitment, &x_id);
            }
            final_public.insert(id.clone(), point);
        }

        let schnorr_transcript = {
            let mut hash = core::mem::replace(transcript, Hash::new_with_dst("accord/cmp-keygen"))
                .chain_bytes(&self.rid)
                .chain_bytes(&self.chain_key);
            for (id, point) in &final_public {
                hash = hash.chain_bytes(id.as_bytes()).chain_bytes(&point.to_compressed());
            }
            *transcript = hash.clone();
            hash
        };

        let own_public = final_public.get(&self_id).copied().ok_or_else(|| Error::Local("missing own public share".into()))?;
        let schnorr_proof = SchProof::<Secp256k1>::prove(rng, &final_share, &own_public, schnorr_transcript.clone());

        Ok(Advance::Next(CmpKeygenRound::R5(Round5 {
            ctx: self.ctx,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            pedersen_secret: self.pedersen_secret,
            openings: self.openings,
            rid: self.rid,
            chain_key: self.chain_key,
            final_share,
            final_public,
            schnorr_transcript,
            schnorr_proof,
            _params: PhantomData,
        })))
    }
}

pub struct Round5<P: SchemeParams> {
    ctx: Context,
    elgamal_secret: Scalar,
    paillier_secret: PaillierSecret,
    pedersen_secret: PedersenSecret,
    openings: BTreeMap<PartyId, Opening>,
    rid: [u8; 32],
    chain_key: [u8; 32],
    final_share: Scalar,
    final_public: BTreeMap<PartyId, Point>,
    schnorr_transcript: Hash,
    schnorr_proof: SchProof<Secp256k1>,
    _params: PhantomData<P>,
}

impl<P: SchemeParams> Round5<P> {
    fn finalize(self, broadcast: BTreeMap<PartyId, Vec<u8>>) -> Result<Advance<CmpKeygenRound<P>>, Error> {
        // Proofs were already checked in `verify_broadcast`; this just
        // confirms every expected peer delivered one.
        for id in self.ctx.peers() {
            if !broadcast.contains_key(id) {
                return Err(Error::NilFields(id.clone()));
            }
        }

        let mut public = BTreeMap::new();
        for (id, opening) in &self.openings {
            let ecdsa = self
                .final_public
                .get(id)
                .copied()
                .ok_or_else(|| Error::Local(alloc::format!("missing public share for {id:?}")))?;
            public.insert(
                id.clone(),
                Public {
                    ecdsa,
                    elgamal: opening.elgamal_public,
                    paillier: opening.paillier_public(),
                    pedersen: opening.pedersen_params(),
                },
            );
        }

        Ok(Advance::Output(CMPConfig {
            self_id: self.ctx.self_id,
            participants: self.ctx.participants,
            threshold: self.ctx.threshold,
            ecdsa_share: self.final_share,
            elgamal_secret: self.elgamal_secret,
            paillier_secret: self.paillier_secret,
            rid: self.rid,
            chain_key: self.chain_key,
            public,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TestSchemeParams;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn party(label: &str) -> PartyId {
        PartyId::new(label.as_bytes().to_vec())
    }

    /// A party that sends two different, individually-valid round-3
    /// broadcasts to two different peers must be caught at the echo
    /// round, not slip through as a silent disagreement.
    #[test]
    fn equivocating_round3_broadcast_is_caught_by_the_echo_round() {
        use crate::rounds::{Message, MultiHandler, SessionInfo, Status};
        use crate::sessions::make_cmp_keygen_session;
        use rand::seq::SliceRandom;

        let x = party("x");
        let y = party("y");
        let z = party("z");
        let ids = [x.clone(), y.clone(), z.clone()];
        let participants = IdSlice::new(ids.to_vec()).expect("three distinct ids");
        let threshold = 1;
        let session_id = [81u8; 32];
        const X_SEED: u64 = 9001;

        let mut shared_rng = ChaCha8Rng::seed_from_u64(82);
        let mut x_rng = ChaCha8Rng::seed_from_u64(X_SEED);
        let mut x_handler = make_cmp_keygen_session::<TestSchemeParams>(
            &mut x_rng, x.clone(), participants.clone(), threshold, KeygenMode::Fresh, session_id,
        );
        let mut y_handler = make_cmp_keygen_session::<TestSchemeParams>(
            &mut shared_rng, y.clone(), participants.clone(), threshold, KeygenMode::Fresh, session_id,
        );
        let mut z_handler = make_cmp_keygen_session::<TestSchemeParams>(
            &mut shared_rng, z.clone(), participants.clone(), threshold, KeygenMode::Fresh, session_id,
        );

        // What `x` actually received for rounds 1 and 2, recorded as we
        // route messages by hand, so its round-1/round-2 state (and
        // hence its committed Paillier/Pedersen keys) can be replayed
        // byte-for-byte below.
        let mut x_received: BTreeMap<u32, BTreeMap<PartyId, Vec<u8>>> = BTreeMap::new();

        let mut queue: Vec<Message> = Vec::new();
        for h in [&mut x_handler, &mut y_handler, &mut z_handler] {
            while let Some(msg) = h.pop_outgoing() {
                queue.push(msg);
            }
        }

        let mut x_broadcast_3: Option<Message> = None;
        loop {
            // Pull x's round-3 broadcast aside the moment it appears;
            // everything else (round 1, round 2, their echo rounds, and
            // x's two direct round-3 shares) is delivered normally.
            let mut deferred = None;
            queue.retain(|m| {
                if m.round_number == 3 && m.from == x && m.to.is_none() {
                    deferred = Some(m.clone());
                    false
                } else {
                    true
                }
            });
            if let Some(m) = deferred {
                x_broadcast_3 = Some(m);
            }
            if queue.is_empty() {
                break;
            }
            queue.shuffle(&mut shared_rng);
            let msg = queue.pop().expect("non-empty");
            let targets: Vec<PartyId> = match &msg.to {
                Some(to) => alloc::vec![to.clone()],
                None => ids.iter().filter(|id| **id != msg.from).cloned().collect(),
            };
            for target in &targets {
                if (msg.round_number == 1 || msg.round_number == 2) && *target == x && msg.to.is_none() {
                    if let Ok(payload) = rmp_serde::from_slice::<crate::rounds::session::Payload>(&msg.content) {
                        if let crate::rounds::session::Payload::Protocol(inner) = payload {
                            x_received.entry(msg.round_number).or_default().insert(msg.from.clone(), inner);
                        }
                    }
                }
                let handler = match target {
                    t if *t == x => &mut x_handler,
                    t if *t == y => &mut y_handler,
                    _ => &mut z_handler,
                };
                match handler.deliver(&mut shared_rng, msg.clone()) {
                    Status::InProgress => {}
                    Status::Output(_) => panic!("{target:?} finished before round 3 diverges"),
                    Status::Abort(reason) => panic!("{target:?} aborted before round 3 diverges: {reason:?}"),
                }
                while let Some(out) = handler.pop_outgoing() {
                    queue.push(out);
                }
            }
        }
        let genuine = x_broadcast_3.expect("x must have reached round 3");

        // Replay x's round-1/round-2 transition from the same seed and
        // the same peer inputs, then finalize round 2 a second time with
        // fresh randomness: a second, independently valid round-3
        // broadcast sharing x's real committed Paillier/Pedersen keys.
        let mut replay_rng = ChaCha8Rng::seed_from_u64(X_SEED);
        let replay_round = CmpKeygenRound::<TestSchemeParams>::new(
            &mut replay_rng, x.clone(), participants.clone(), threshold, KeygenMode::Fresh,
        );
        let round1 = match replay_round {
            CmpKeygenRound::R1(r) => r,
            _ => unreachable!("new() always starts at round 1"),
        };
        let info = SessionInfo {
            protocol_id: "accord/cmp-keygen",
            self_id: x.clone(),
            participants: participants.clone(),
            threshold,
            curve_name: Secp256k1::CURVE_NAME,
            session_id,
        };
        let mut transcript = info.initial_transcript();
        let round1_input = x_received.remove(&1).expect("x received round-1 broadcasts");
        let advance1 = round1.finalize(round1_input, &mut transcript).expect("round 1 finalizes");
        let round2 = match advance1 {
            Advance::Next(CmpKeygenRound::R2(r)) => r,
            _ => unreachable!("round 1 always advances to round 2"),
        };
        let round2_input = x_received.remove(&2).expect("x received round-2 broadcasts");
        let mut forge_rng = ChaCha8Rng::seed_from_u64(X_SEED + 1);
        let advance2 = round2.finalize(&mut forge_rng, round2_input, &mut transcript).expect("round 2 finalizes");
        let round3_b = match advance2 {
            Advance::Next(CmpKeygenRound::R3(r)) => r,
            _ => unreachable!("round 2 always advances to round 3"),
        };
        let wrapped_b = CmpKeygenRound::R3(round3_b);
        let content_b = wrapped_b.broadcast_message(&mut forge_rng).expect("round 3 always broadcasts");
        assert_ne!(content_b, {
            match rmp_serde::from_slice::<crate::rounds::session::Payload>(&genuine.content).unwrap() {
                crate::rounds::session::Payload::Protocol(inner) => inner,
                _ => panic!("expected a protocol payload"),
            }
        });

        let forged = Message {
            from: x.clone(),
            to: None,
            session_id,
            round_number: 3,
            content: rmp_serde::to_vec(&crate::rounds::session::Payload::Protocol(content_b)).expect("serialization is infallible"),
        };

        // `y` gets the genuine broadcast, `z` gets the equivocating one.
        let mut outcomes: BTreeMap<PartyId, Status<CMPConfig>> = BTreeMap::new();
        outcomes.insert(y.clone(), y_handler.deliver(&mut shared_rng, genuine.clone()));
        outcomes.insert(z.clone(), z_handler.deliver(&mut shared_rng, forged));
        for h in [&mut y_handler, &mut z_handler] {
            while let Some(out) = h.pop_outgoing() {
                queue.push(out);
            }
        }

        while outcomes.values().any(|s| matches!(s, Status::InProgress)) {
            queue.shuffle(&mut shared_rng);
            let msg = match queue.pop() {
                Some(m) => m,
                None => break,
            };
            let targets: Vec<PartyId> = match &msg.to {
                Some(to) => alloc::vec![to.clone()],
                None => [y.clone(), z.clone()].into_iter().filter(|id| *id != msg.from).collect(),
            };
            for target in targets {
                if matches!(outcomes.get(&target), Some(Status::Output(_)) | Some(Status::Abort(_))) {
                    continue;
                }
                let handler = if target == y { &mut y_handler } else { &mut z_handler };
                let status = handler.deliver(&mut shared_rng, msg.clone());
                while let Some(out) = handler.pop_outgoing() {
                    queue.push(out);
                }
                outcomes.insert(target, status);
            }
        }

        for (id, status) in &outcomes {
            match status {
                Status::Abort(crate::rounds::AbortReason::Protocol {
                    culprit,
                    error: Error::EchoMismatch(_),
                }) => {
                    assert_eq!(culprit, &x, "{id:?} blamed the wrong party for the equivocation");
                }
                Status::Abort(reason) => panic!("{id:?} aborted for an unexpected reason: {reason:?}"),
                Status::Output(_) => panic!("{id:?} should have aborted on the equivocating broadcast, got an output"),
                Status::InProgress => panic!("{id:?} never reached a terminal status"),
            }
        }
    }

    /// A round-3 broadcast whose zk-mod proof was produced against a
    /// Paillier modulus different from the one the sender announced in
    /// round 2 must be rejected, even though the proof itself is
    /// internally well-formed.
    #[test]
    fn round3_rejects_mod_proof_for_swapped_n() {
        let mut rng = ChaCha8Rng::seed_from_u64(70);
        let self_id = party("a");
        let peer_id = party("b");
        let participants = IdSlice::new(alloc::vec![self_id.clone(), peer_id.clone()]).expect("two distinct ids");
        let threshold = 1;

        let self_paillier = PaillierSecret::random::<TestSchemeParams>(&mut rng);
        let self_pedersen =
            PedersenSecret::generate(&mut rng, self_paillier.public_key().n().clone(), self_paillier.totient());

        // What `peer_id` honestly announced in round 2.
        let peer_paillier = PaillierSecret::random::<TestSchemeParams>(&mut rng);
        let peer_pedersen =
            PedersenSecret::generate(&mut rng, peer_paillier.public_key().n().clone(), peer_paillier.totient());
        let peer_opening = Opening {
            rid_contribution: [0u8; 32],
            chain_key_contribution: [0u8; 32],
            feldman_commitment: alloc::vec![Point::identity(); threshold as usize + 1],
            elgamal_public: Point::identity(),
            paillier_n: peer_paillier.public_key().n().clone(),
            pedersen_s: peer_pedersen.public().s().clone(),
            pedersen_t: peer_pedersen.public().t().clone(),
            decommitment_nonce: [0u8; 32],
        };

        let mut openings = BTreeMap::new();
        openings.insert(peer_id.clone(), peer_opening.clone());
        openings.insert(self_id.clone(), peer_opening.clone());

        let base_transcript = Hash::new_with_dst("accord/cmp-keygen");
        let claimant_transcript = base_transcript.clone().chain_bytes(peer_id.as_bytes());

        // The proof content `peer_id` actually sends: a zk-mod proof for a
        // Paillier key it never announced, as if its key had been swapped
        // after round 2.
        let swapped_paillier = PaillierSecret::random::<TestSchemeParams>(&mut rng);
        let forged_mod_proof = ModProof::prove::<TestSchemeParams>(&mut rng, &swapped_paillier, claimant_transcript.clone());
        let prm_proof = PrmProof::prove::<TestSchemeParams>(&mut rng, &peer_pedersen, claimant_transcript.clone());
        let fac_proof =
            FacProof::prove::<TestSchemeParams>(&mut rng, &peer_paillier, peer_pedersen.public(), claimant_transcript);

        let content = rmp_serde::to_vec(&Round3Broadcast {
            mod_proof: forged_mod_proof,
            prm_proof,
            fac_proof,
        })
        .expect("serialization is infallible");

        let ctx = Context {
            self_id: self_id.clone(),
            participants,
            threshold,
        };
        let round = Round3::<TestSchemeParams> {
            ctx,
            mode: KeygenMode::Fresh,
            elgamal_secret: Scalar::zero(),
            paillier_secret: self_paillier,
            pedersen_secret: self_pedersen,
            openings,
            rid: [0u8; 32],
            chain_key: [0u8; 32],
            own_share_self: Scalar::zero(),
            base_transcript,
            mod_proof: ModProof::prove::<TestSchemeParams>(&mut rng, &peer_paillier, Hash::new_with_dst("accord/cmp-keygen")),
            prm_proof: PrmProof::prove::<TestSchemeParams>(&mut rng, &peer_pedersen, Hash::new_with_dst("accord/cmp-keygen")),
            fac_proof: FacProof::prove::<TestSchemeParams>(
                &mut rng,
                &peer_paillier,
                peer_pedersen.public(),
                Hash::new_with_dst("accord/cmp-keygen"),
            ),
            outgoing_shares: BTreeMap::new(),
            _params: PhantomData,
        };

        let wrapped = CmpKeygenRound::R3(round);
        match wrapped.verify_broadcast(&peer_id, &content) {
            Err(Error::InvalidProof(culprit, detail)) => {
                assert_eq!(culprit, peer_id);
                assert!(detail.contains("zk-mod"));
            }
            other => panic!("expected a zk-mod rejection, got {other:?}"),
        }
    }
}

/// Converts a decrypted Paillier plaintext back to a curve scalar,
/// rejecting anything that doesn't fit in 32 bytes or exceeds the group
/// order (a VSS share must always be `< group_order`).
fn uint_to_scalar(value: &Uint) -> Option<Scalar> {
    let bytes = value.to_be_bytes();
    if bytes.len() < 32 {
        return None;
    }
    let (high, low) = bytes.split_at(bytes.len() - 32);
    if high.iter().any(|&b| b != 0) {
        return None;
    }
    Scalar::from_bytes(low)
}
