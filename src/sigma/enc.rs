//! zk-enc: proof that a Paillier ciphertext `C` encrypts a plaintext `m`
//! known to lie in a signed range `[-2^{L+ε}, 2^{L+ε}]`, without revealing
//! `m` or the randomizer.
//!
//! Same commit/challenge/response shape as `zk-fac`, specialized to one
//! value instead of two, verified against the *verifier's own* Pedersen
//! parameters (the receiver checks the sender's range proof against its
//! own aux data).

use serde::{Deserialize, Serialize};

use crate::bigint::{pow_signed, SignedUint, Uint};
use crate::paillier::PublicKey;
use crate::params::SchemeParams;
use crate::pedersen::PedersenParams;
use crate::tools::hashing::Hash;
use crypto_bigint::{BoxedUint, NonZero};
use rand_core::CryptoRngCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncProof {
    s_commitment: Uint,
    a_ciphertext: Uint,
    c_commitment: Uint,
    z1: Uint,
    z2: Uint,
    z3: Uint,
}

impl EncProof {
    pub fn prove<P: SchemeParams>(
        rng: &mut impl CryptoRngCore,
        paillier: &PublicKey,
        aux: &PedersenParams,
        m: &Uint,
        randomizer: &Uint,
        ciphertext: &Uint,
        transcript: Hash,
    ) -> Self {
        let range = core::num::NonZeroU32::new(P::L_PLUS_EPSILON).expect("nonzero");

        let mu = BoxedUint::random(rng, range);
        let s_commitment = aux.commit(&SignedUint::from_uint(m.clone()), &SignedUint::from_uint(mu.clone()));

        let alpha = BoxedUint::random(rng, range);
        let r = crate::paillier::random_randomizer(rng, paillier);
        let gamma = BoxedUint::random(rng, range);
        let a_ciphertext = paillier.encrypt_with_randomizer(&alpha, &r);
        let c_commitment = aux.commit(&SignedUint::from_uint(alpha.clone()), &SignedUint::from_uint(gamma.clone()));

        let e = challenge::<P>(aux, &s_commitment, &a_ciphertext, &c_commitment, transcript);

        let z1 = e.mul(&SignedUint::from_uint(m.clone())).add(&SignedUint::from_uint(alpha));
        let z2 = {
            let n_nz = NonZero::new(paillier.n().clone()).expect("N != 0");
            let r_pow_e = pow_signed(randomizer, &e, &n_nz).unwrap_or_else(|| randomizer.clone());
            r.mul_mod(&r_pow_e, &n_nz)
        };
        let z3 = e.mul(&SignedUint::from_uint(mu)).add(&SignedUint::from_uint(gamma));

        let _ = ciphertext; // bound into the challenge via the caller's transcript
        Self {
            s_commitment,
            a_ciphertext,
            c_commitment,
            z1: z1.magnitude().clone(),
            z2,
            z3: z3.magnitude().clone(),
        }
    }

    pub fn verify<P: SchemeParams>(
        &self,
        paillier: &PublicKey,
        aux: &PedersenParams,
        ciphertext: &Uint,
        transcript: Hash,
    ) -> bool {
        if !aux.is_well_formed() || !paillier.is_well_formed::<P>() {
            return false;
        }
        let n_hat = match NonZero::new(aux.n().clone()) {
            Some(m) => m,
            None => return false,
        };
        let n2 = match NonZero::new(paillier.n_squared().clone()) {
            Some(m) => m,
            None => return false,
        };
        let e = challenge::<P>(aux, &self.s_commitment, &self.a_ciphertext, &self.c_commitment, transcript);

        let lhs_enc = paillier.encrypt_with_randomizer(&self.z1, &self.z2);
        let c_pow_e = {
            let c = ciphertext.rem(&n2);
            let positive = c.pow_vartime(e.magnitude()).rem(&n2);
            if e.is_negative() {
                match c.inv_mod(&n2) {
                    Some(inv) => inv.pow_vartime(e.magnitude()).rem(&n2),
                    None => return false,
                }
            } else {
                positive
            }
        };
        let rhs_enc = self.a_ciphertext.mul_mod(&c_pow_e, &n2);
        if lhs_enc != rhs_enc {
            return false;
        }

        let z1 = SignedUint::from_uint(self.z1.clone());
        let z3 = SignedUint::from_uint(self.z3.clone());
        let lhs_commit = aux.commit(&z1, &z3);
        let s_pow_e = match pow_signed(&self.s_commitment, &e, &n_hat) {
            Some(v) => v,
            None => return false,
        };
        let rhs_commit = self.c_commitment.mul_mod(&s_pow_e, &n_hat);

        lhs_commit == rhs_commit
    }
}

fn challenge<P: SchemeParams>(aux: &PedersenParams, s: &Uint, a: &Uint, c: &Uint, transcript: Hash) -> SignedUint {
    let digest = transcript
        .chain_bytes(&aux.n().to_be_bytes())
        .chain_bytes(&s.to_be_bytes())
        .chain_bytes(&a.to_be_bytes())
        .chain_bytes(&c.to_be_bytes())
        .finalize();
    let magnitude = BoxedUint::from_be_slice(&digest, 256).shr_vartime(256 - P::EPSILON);
    let negative = digest[0] & 1 == 1;
    let signed = SignedUint::from_uint(magnitude);
    if negative {
        signed.negate()
    } else {
        signed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::SecretKey;
    use crate::params::TestSchemeParams;
    use crate::pedersen::PedersenSecret;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    fn setup(rng: &mut ChaCha8Rng) -> (SecretKey, PedersenSecret, Uint, Uint, Uint) {
        let prover = SecretKey::random::<TestSchemeParams>(rng);
        let verifier = SecretKey::random::<TestSchemeParams>(rng);
        let aux = PedersenSecret::generate(rng, verifier.public_key().n().clone(), verifier.totient());
        let m = BoxedUint::from(42u64).widen(prover.public_key().n().bits_precision());
        let randomizer = crate::paillier::random_randomizer(rng, prover.public_key());
        let ciphertext = prover.public_key().encrypt_with_randomizer(&m, &randomizer);
        (prover, aux, m, randomizer, ciphertext)
    }

    #[test]
    fn proves_and_verifies_range_membership() {
        let mut rng = ChaCha8Rng::seed_from_u64(20);
        let (prover, aux, m, randomizer, ciphertext) = setup(&mut rng);
        let transcript = Hash::new_with_dst("test");

        let proof = EncProof::prove::<TestSchemeParams>(&mut rng, prover.public_key(), aux.public(), &m, &randomizer, &ciphertext, transcript.clone());
        assert!(proof.verify::<TestSchemeParams>(prover.public_key(), aux.public(), &ciphertext, transcript));
    }

    #[test]
    fn rejects_a_different_ciphertext() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let (prover, aux, m, randomizer, ciphertext) = setup(&mut rng);
        let transcript = Hash::new_with_dst("test");
        let proof = EncProof::prove::<TestSchemeParams>(&mut rng, prover.public_key(), aux.public(), &m, &randomizer, &ciphertext, transcript.clone());

        let other_m = BoxedUint::from(43u64).widen(prover.public_key().n().bits_precision());
        let other_ciphertext = prover.public_key().encrypt_with_randomizer(&other_m, &randomizer);
        assert!(!proof.verify::<TestSchemeParams>(prover.public_key(), aux.public(), &other_ciphertext, transcript));
    }
}
