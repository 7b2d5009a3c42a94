//! `CMPConfig`: the per-party result of CMP keygen/refresh.
//!
//! Grounded on `protocols/cmp/config/config.go`'s `Config`/`Public`
//! structs and its `Domain()` / `CanSign` / `ValidThreshold` helpers.

use alloc::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::curve::{secp256k1::Point as Secp256k1Point, secp256k1::Scalar as Secp256k1Scalar, Curve, CurvePoint};
use crate::paillier::{PublicKey as PaillierPublic, SecretKey as PaillierSecret};
use crate::party::{valid_threshold, IdSlice, PartyId};
use crate::pedersen::PedersenParams;
use crate::tools::hashing::Hash;

/// Everything a party publishes about itself at the end of keygen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Public {
    pub ecdsa: Secp256k1Point,
    pub elgamal: Secp256k1Point,
    pub paillier: PaillierPublic,
    pub pedersen: PedersenParams,
}

impl Public {
    /// Domain-separation tag from `config.go`'s `Public.Domain()`.
    pub const DOMAIN: &'static str = "Public Data";

    pub fn hash_into(&self, hash: Hash) -> Hash {
        hash.chain_bytes(Self::DOMAIN.as_bytes())
            .chain_bytes(&self.ecdsa.to_compressed())
            .chain_bytes(&self.elgamal.to_compressed())
            .chain_bytes(self.paillier.n().to_be_bytes().as_slice())
            .chain_bytes(self.pedersen.n().to_be_bytes().as_slice())
            .chain_bytes(self.pedersen.s().to_be_bytes().as_slice())
            .chain_bytes(self.pedersen.t().to_be_bytes().as_slice())
    }
}

/// The full per-party CMP keygen/refresh result.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct CMPConfig {
    #[zeroize(skip)]
    pub self_id: PartyId,
    #[zeroize(skip)]
    pub participants: IdSlice,
    pub threshold: u32,
    pub ecdsa_share: Secp256k1Scalar,
    pub elgamal_secret: Secp256k1Scalar,
    #[zeroize(skip)]
    pub paillier_secret: PaillierSecret,
    pub rid: [u8; 32],
    pub chain_key: [u8; 32],
    #[zeroize(skip)]
    pub public: BTreeMap<PartyId, Public>,
}

impl CMPConfig {
    /// Domain-separation tag from `config.go`'s `Config.Domain()`.
    pub const DOMAIN: &'static str = "CMP Config";

    pub fn transcript_hash(&self) -> Hash {
        let mut hash = Hash::new_with_dst(Self::DOMAIN)
            .chain(&self.threshold)
            .chain_bytes(&self.rid)
            .chain_bytes(&self.chain_key);
        for (id, public) in &self.public {
            hash = hash.chain_bytes(id.as_bytes());
            hash = public.hash_into(hash);
        }
        hash
    }

    /// `Σ_{j∈S} λ_j(0)·X_j` for any valid signer set `S`, reconstructing
    /// the joint public key (`config.go`'s `PublicPoint`).
    pub fn public_point(&self, signers: &IdSlice) -> Option<Secp256k1Point> {
        if !self.can_sign(signers) {
            return None;
        }
        let ids: alloc::vec::Vec<PartyId> = signers.iter().cloned().collect();
        let mut sum = Secp256k1Point::identity();
        for id in &ids {
            let lambda = crate::tools::lagrange_coefficient::<crate::curve::Secp256k1>(&ids, id)?;
            let x_j = &self.public.get(id)?.ecdsa;
            sum = sum + x_j.mul(&lambda);
        }
        Some(sum)
    }

    /// `config.go`'s `CanSign`: `signers` must have no duplicates
    /// (guaranteed by `IdSlice`), include `self_id`, be a subset of the
    /// original participants, and satisfy `0 <= t <= n-1`.
    pub fn can_sign(&self, signers: &IdSlice) -> bool {
        valid_threshold(self.threshold, self.participants.len())
            && self.participants.can_sign(signers, &self.self_id)
    }
}

impl core::fmt::Debug for CMPConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CMPConfig")
            .field("self_id", &self.self_id)
            .field("threshold", &self.threshold)
            .field("participants", &self.participants)
            .finish_non_exhaustive()
    }
}
