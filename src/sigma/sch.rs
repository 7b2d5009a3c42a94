//! zk-sch: Schnorr proof of knowledge of a discrete log.
//!
//! Used standalone in FROST keygen R1 (knowledge of `secret_i`) and as
//! the final round-5 CMP proof of knowledge of `x_i^final`. Grounded on
//! `SchProof::new`/`.verify()`, bound to auxiliary data (here, the
//! transcript hash plus the claimant's party id) similar to
//! `(shared_randomness, party_idx, rid)`.

use serde::{Deserialize, Serialize};

use crate::curve::{Curve, CurvePoint, CurveScalar};
use crate::tools::hashing::Hash;
use crate::tools::random::random_scalar;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SchProof<C: Curve> {
    commitment: C::Point,
    response: C::Scalar,
}

impl<C: Curve> SchProof<C> {
    /// Proves knowledge of `secret` such that `public = g^secret`.
    pub fn prove(
        rng: &mut (impl rand_core::RngCore + rand_core::CryptoRng),
        secret: &C::Scalar,
        public: &C::Point,
        transcript: Hash,
    ) -> Self {
        let k = random_scalar::<C::Scalar>(rng);
        let commitment = C::Point::mul_by_generator(&k);
        let challenge = Self::challenge(&commitment, public, transcript);
        let response = k + challenge * *secret;
        Self { commitment, response }
    }

    pub fn verify(&self, public: &C::Point, transcript: Hash) -> bool {
        let challenge = Self::challenge(&self.commitment, public, transcript);
        let lhs = C::Point::mul_by_generator(&self.response);
        let rhs = self.commitment + public.mul(&challenge);
        lhs == rhs
    }

    fn challenge(commitment: &C::Point, public: &C::Point, transcript: Hash) -> C::Scalar {
        let wide = transcript
            .chain_bytes(&commitment.to_compressed())
            .chain_bytes(&public.to_compressed())
            .finalize_wide("accord/sch-challenge");
        C::Scalar::from_wide_bytes(&wide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Secp256k1;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn proves_and_verifies() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let secret = random_scalar::<<Secp256k1 as Curve>::Scalar>(&mut rng);
        let public = <Secp256k1 as Curve>::Point::mul_by_generator(&secret);
        let transcript = Hash::new_with_dst("test");
        let proof = SchProof::<Secp256k1>::prove(&mut rng, &secret, &public, transcript.clone());
        assert!(proof.verify(&public, transcript));
    }

    #[test]
    fn rejects_wrong_public() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let secret = random_scalar::<<Secp256k1 as Curve>::Scalar>(&mut rng);
        let public = <Secp256k1 as Curve>::Point::mul_by_generator(&secret);
        let other = <Secp256k1 as Curve>::Point::mul_by_generator(&random_scalar(&mut rng));
        let transcript = Hash::new_with_dst("test");
        let proof = SchProof::<Secp256k1>::prove(&mut rng, &secret, &public, transcript.clone());
        assert!(!proof.verify(&other, transcript));
    }
}
