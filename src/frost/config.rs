//! `FrostConfig`: the per-party result of FROST keygen.

use alloc::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::curve::{secp256k1::Point as Secp256k1Point, Curve, CurvePoint, Secp256k1};
use crate::party::{valid_threshold, IdSlice, PartyId};

/// A party's share of a FROST key, plus everything needed to verify
/// other signers' partial signatures.
#[derive(Clone, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct FrostConfig<C: Curve> {
    #[zeroize(skip)]
    pub self_id: PartyId,
    #[zeroize(skip)]
    pub participants: IdSlice,
    pub threshold: u32,
    pub secret_share: C::Scalar,
    #[zeroize(skip)]
    pub public_key: C::Point,
    #[zeroize(skip)]
    pub verification_shares: BTreeMap<PartyId, C::Point>,
}

impl<C: Curve> FrostConfig<C> {
    pub fn can_sign(&self, signers: &IdSlice) -> bool {
        valid_threshold(self.threshold, self.participants.len()) && self.participants.can_sign(signers, &self.self_id)
    }
}

impl<C: Curve> core::fmt::Debug for FrostConfig<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrostConfig")
            .field("self_id", &self.self_id)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl FrostConfig<Secp256k1> {
    /// Whether `public_key`'s SEC1 compressed encoding has an odd
    /// y-coordinate (the `0x03` prefix) — Taproot negates the secret
    /// share when this holds, so every signer's public key is even-y.
    fn has_odd_y(point: &Secp256k1Point) -> bool {
        point.to_compressed()[0] == 0x03
    }

    /// Applies the Taproot negation rule: if the joint public key has an
    /// odd y-coordinate, negate this party's share and every
    /// verification share so the effective key has even y (and can be
    /// serialized x-only).
    pub fn into_taproot(mut self) -> Self {
        if Self::has_odd_y(&self.public_key) {
            self.secret_share = -self.secret_share;
            self.public_key = -self.public_key;
            for share in self.verification_shares.values_mut() {
                *share = -*share;
            }
        }
        self
    }

    /// The 32-byte x-only form of the public key, BIP-340 style.
    pub fn public_key_xonly(&self) -> [u8; 32] {
        let compressed = self.public_key.to_compressed();
        let mut xonly = [0u8; 32];
        xonly.copy_from_slice(&compressed[1..33]);
        xonly
    }
}

