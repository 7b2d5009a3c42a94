//! zk-fac: proof that `N`'s two prime factors are both close to `√N`
//! (within `[−√N, √N]·2^{L+ε}`), so that `N` can't hide a much smaller
//! factor.
//!
//! Grounded on `pkg/zk/fac/fac.go`, including its two documented
//! corrections against the original paper:
//!
//! 1. the challenge `e` is sampled from `±2^ε`, not `±q` — the prover
//!    doesn't know the verifier's secret, so `±q` in the paper text is
//!    read as a typo for `±2^ε`;
//! 2. the prover sends `(z1, z2, w1, w2, v)`, not the paper's `(z, u, v)`.
//!
//! Verification uses the prover's *own* Pedersen parameters `(N, s, t)`
//! as the auxiliary commitment modulus, matching `round4.go`'s
//! `StoreBroadcastMessage`, which builds `Aux` from `N_from, S_from,
//! T_from` rather than the verifier's own — so it travels as a single
//! broadcast in round 3, not a per-peer direct message.

use serde::{Deserialize, Serialize};

use crate::bigint::{pow_signed, SignedUint, Uint};
use crate::paillier::SecretKey;
use crate::params::SchemeParams;
use crate::pedersen::PedersenParams;
use crate::tools::hashing::Hash;
use crypto_bigint::{BoxedUint, NonZero};
use rand_core::CryptoRngCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacProof {
    p_commitment: Uint,
    q_commitment: Uint,
    a_commitment: Uint,
    b_commitment: Uint,
    t_commitment: Uint,
    sigma_hat: Uint,
    z1: Uint,
    z2: Uint,
    w1: Uint,
    w2: Uint,
    v: Uint,
}

impl FacProof {
    pub fn prove<P: SchemeParams>(
        rng: &mut impl CryptoRngCore,
        secret: &SecretKey,
        aux: &PedersenParams,
        transcript: Hash,
    ) -> Self {
        let n_hat = NonZero::new(aux.n().clone()).expect("N_hat != 0");
        let range_bits = P::L_PLUS_EPSILON;
        let sample_range = |rng: &mut dyn CryptoRngCore| -> Uint {
            BoxedUint::random(rng, core::num::NonZeroU32::new(range_bits).expect("nonzero"))
        };

        let mu = sample_range(rng);
        let nu = sample_range(rng);
        let p_commitment = aux.commit(&SignedUint::from_uint(secret.p().clone()), &SignedUint::from_uint(mu.clone()));
        let q_commitment = aux.commit(&SignedUint::from_uint(secret.q().clone()), &SignedUint::from_uint(nu.clone()));

        let alpha = sample_range(rng);
        let beta = sample_range(rng);
        let x = sample_range(rng);
        let y = sample_range(rng);
        let r = sample_range(rng);

        let a_commitment = aux.commit(&SignedUint::from_uint(alpha.clone()), &SignedUint::from_uint(x.clone()));
        let b_commitment = aux.commit(&SignedUint::from_uint(beta.clone()), &SignedUint::from_uint(y.clone()));
        let t_commitment = {
            let q_pow_alpha = q_commitment.rem(&n_hat).pow_vartime(&alpha).rem(&n_hat);
            let t_pow_r = aux.t().rem(&n_hat).pow_vartime(&r).rem(&n_hat);
            q_pow_alpha.mul_mod(&t_pow_r, &n_hat)
        };
        let sigma_hat = &nu * secret.p();

        let e = challenge::<P>(
            aux,
            &p_commitment,
            &q_commitment,
            &a_commitment,
            &b_commitment,
            &t_commitment,
            transcript,
        );

        let z1 = e.mul(&SignedUint::from_uint(secret.p().clone())).add(&SignedUint::from_uint(alpha));
        let z2 = e.mul(&SignedUint::from_uint(secret.q().clone())).add(&SignedUint::from_uint(beta));
        let w1 = e.mul(&SignedUint::from_uint(mu)).add(&SignedUint::from_uint(x));
        let w2 = e.mul(&SignedUint::from_uint(nu)).add(&SignedUint::from_uint(y));
        let v = e.mul(&SignedUint::from_uint(sigma_hat.clone())).add(&SignedUint::from_uint(r));

        Self {
            p_commitment,
            q_commitment,
            a_commitment,
            b_commitment,
            t_commitment,
            sigma_hat,
            z1: z1.magnitude().clone(),
            z2: z2.magnitude().clone(),
            w1: w1.magnitude().clone(),
            w2: w2.magnitude().clone(),
            v: v.magnitude().clone(),
        }
    }

    pub fn verify<P: SchemeParams>(&self, n: &Uint, aux: &PedersenParams, transcript: Hash) -> bool {
        if !aux.is_well_formed() {
            return false;
        }
        let n_hat = match NonZero::new(aux.n().clone()) {
            Some(m) => m,
            None => return false,
        };
        let e = challenge::<P>(
            aux,
            &self.p_commitment,
            &self.q_commitment,
            &self.a_commitment,
            &self.b_commitment,
            &self.t_commitment,
            transcript,
        );

        let z1 = SignedUint::from_uint(self.z1.clone());
        let z2 = SignedUint::from_uint(self.z2.clone());
        let w1 = SignedUint::from_uint(self.w1.clone());
        let w2 = SignedUint::from_uint(self.w2.clone());

        let lhs1 = aux.commit(&z1, &w1);
        let p_pow_e = match pow_signed(&self.p_commitment, &e, &n_hat) {
            Some(v) => v,
            None => return false,
        };
        let rhs1 = self.a_commitment.mul_mod(&p_pow_e, &n_hat);
        if lhs1 != rhs1 {
            return false;
        }

        let lhs2 = aux.commit(&z2, &w2);
        let q_pow_e = match pow_signed(&self.q_commitment, &e, &n_hat) {
            Some(v) => v,
            None => return false,
        };
        let rhs2 = self.b_commitment.mul_mod(&q_pow_e, &n_hat);
        if lhs2 != rhs2 {
            return false;
        }

        let r_commitment = {
            let s_pow_n = aux.s().rem(&n_hat).pow_vartime(n).rem(&n_hat);
            let t_pow_sigma = aux.t().rem(&n_hat).pow_vartime(&self.sigma_hat).rem(&n_hat);
            s_pow_n.mul_mod(&t_pow_sigma, &n_hat)
        };
        let lhs3 = {
            let q_pow_z1 = self.q_commitment.rem(&n_hat).pow_vartime(&self.z1).rem(&n_hat);
            let t_pow_v = aux.t().rem(&n_hat).pow_vartime(&self.v).rem(&n_hat);
            q_pow_z1.mul_mod(&t_pow_v, &n_hat)
        };
        let r_pow_e = match pow_signed(&r_commitment, &e, &n_hat) {
            Some(v) => v,
            None => return false,
        };
        let rhs3 = self.t_commitment.mul_mod(&r_pow_e, &n_hat);

        lhs3 == rhs3
    }
}

/// Samples the challenge from `±2^ε`, the first documented deviation.
fn challenge<P: SchemeParams>(
    aux: &PedersenParams,
    p: &Uint,
    q: &Uint,
    a: &Uint,
    b: &Uint,
    t: &Uint,
    transcript: Hash,
) -> SignedUint {
    let digest = transcript
        .chain_bytes(&aux.n().to_be_bytes())
        .chain_bytes(&p.to_be_bytes())
        .chain_bytes(&q.to_be_bytes())
        .chain_bytes(&a.to_be_bytes())
        .chain_bytes(&b.to_be_bytes())
        .chain_bytes(&t.to_be_bytes())
        .finalize();
    let magnitude = BoxedUint::from_be_slice(&digest, 256).shr_vartime(256 - P::EPSILON);
    let negative = digest[0] & 1 == 1;
    SignedUint::from_uint(magnitude).negate_if(negative)
}

impl SignedUint {
    fn negate_if(self, flag: bool) -> Self {
        if flag {
            self.negate()
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TestSchemeParams;
    use crate::pedersen::PedersenSecret;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn proves_and_verifies_against_own_aux() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let secret = SecretKey::random::<TestSchemeParams>(&mut rng);
        let aux = PedersenSecret::generate(&mut rng, secret.public_key().n().clone(), secret.totient());
        let transcript = Hash::new_with_dst("test");

        let proof = FacProof::prove::<TestSchemeParams>(&mut rng, &secret, aux.public(), transcript.clone());
        assert!(proof.verify::<TestSchemeParams>(secret.public_key().n(), aux.public(), transcript));
    }

    #[test]
    fn rejects_a_different_partys_n() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let secret = SecretKey::random::<TestSchemeParams>(&mut rng);
        let aux = PedersenSecret::generate(&mut rng, secret.public_key().n().clone(), secret.totient());
        let other = SecretKey::random::<TestSchemeParams>(&mut rng);
        let transcript = Hash::new_with_dst("test");

        let proof = FacProof::prove::<TestSchemeParams>(&mut rng, &secret, aux.public(), transcript.clone());
        assert!(!proof.verify::<TestSchemeParams>(other.public_key().n(), aux.public(), transcript));
    }
}
