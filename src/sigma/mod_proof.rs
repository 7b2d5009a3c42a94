//! zk-mod: proof that a Paillier modulus `N` is the product of two primes
//! each ≡ 3 mod 4 (a Blum integer), with no small factors.
//!
//! Grounded on `tss-ecdsa`'s `PiModProof`: for `STAT_PARAM` independent
//! challenges `y_i = H(N, i)`, the prover finds a fourth root of `±y_i` or
//! `±2y_i mod N` (exactly one of the four exists when `N` is a Blum
//! integer with both factors ≡ 3 mod 4), using knowledge of `(p, q)` and
//! the Chinese Remainder Theorem; two selector bits `(a_i, b_i)` record
//! which of the four transforms was used, and `z_i = y_i^{N^{-1} mod
//! φ(N)} mod N` independently proves `N` has no repeated prime factors.
//! The verifier recomputes the Jacobi symbol and checks both relations.

use alloc::vec::Vec;

use crypto_bigint::{BoxedUint, NonZero};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::bigint::Uint;
use crate::paillier::{PublicKey, SecretKey};
use crate::params::SchemeParams;
use crate::tools::hashing::Hash;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Elements {
    x: Uint,
    z: Uint,
    a: bool,
    b: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModProof {
    elements: Vec<Elements>,
}

impl ModProof {
    pub fn prove<P: SchemeParams>(
        _rng: &mut impl CryptoRngCore,
        secret: &SecretKey,
        transcript: Hash,
    ) -> Self {
        let n = secret.public_key().n();
        let modulus = NonZero::new(n.clone()).expect("N != 0");
        let phi = {
            let p_minus_1 = secret.p().checked_sub(&BoxedUint::one()).expect("p > 1");
            let q_minus_1 = secret.q().checked_sub(&BoxedUint::one()).expect("q > 1");
            &p_minus_1 * &q_minus_1
        };
        let phi_nz = NonZero::new(phi.clone()).expect("phi != 0");
        let n_inv_mod_phi = n.inv_mod(&phi_nz).expect("gcd(N, phi) = 1 for a Blum integer");

        let elements = (0..P::STAT_PARAM)
            .map(|i| {
                let y_i = challenge_value(n, transcript.clone(), i);
                let (x, a, b) = fourth_root(&y_i, secret, &modulus);
                let z = y_i.rem(&modulus).pow_vartime(&n_inv_mod_phi).rem(&modulus);
                Elements { x, z, a, b }
            })
            .collect();
        Self { elements }
    }

    pub fn verify<P: SchemeParams>(&self, public: &PublicKey, transcript: Hash) -> bool {
        if self.elements.len() != P::STAT_PARAM as usize {
            return false;
        }
        if !public.is_well_formed::<P>() {
            return false;
        }
        let modulus = match NonZero::new(public.n().clone()) {
            Some(m) => m,
            None => return false,
        };
        for (i, elem) in self.elements.iter().enumerate() {
            let y_i = challenge_value(public.n(), transcript.clone(), i as u32);

            // z_i^N == y_i mod N.
            let z_pow_n = elem.z.rem(&modulus).pow_vartime(public.n()).rem(&modulus);
            if z_pow_n != y_i.rem(&modulus) {
                return false;
            }

            let mut target = y_i.rem(&modulus);
            if elem.a {
                target = modulus.as_ref().checked_sub(&target).expect("target < modulus");
            }
            if elem.b {
                target = target.mul_mod(&BoxedUint::from(2u64).widen(target.bits_precision()), &modulus);
            }
            let x_pow_4 = elem
                .x
                .rem(&modulus)
                .pow_vartime(&BoxedUint::from(4u64).widen(public.n().bits_precision()))
                .rem(&modulus);
            if x_pow_4 != target {
                return false;
            }
        }
        true
    }
}

fn challenge_value(n: &Uint, transcript: Hash, index: u32) -> Uint {
    let modulus = NonZero::new(n.clone()).expect("N != 0");
    let wide = transcript
        .chain_bytes(&n.to_be_bytes())
        .chain_bytes(&index.to_be_bytes())
        .finalize_wide("accord/zk-mod-challenge");
    BoxedUint::from_be_slice(&wide, n.bits_precision()).rem(&modulus)
}

/// Finds `x` and selector bits `(a, b)` such that `x^4 == (-1)^a * 2^b *
/// y mod N`, using the factorization `(p, q)` via CRT. Exactly one of the
/// four sign/parity combinations has a fourth root when `N` is a genuine
/// Blum integer; the two "DEVIATION" corrections from the factorization
/// proof (`sigma::fac`) don't apply here, this is the unrelated zk-mod
/// sign-search documented in the original `pimod` implementation.
fn fourth_root(y: &Uint, secret: &SecretKey, modulus: &NonZero<Uint>) -> (Uint, bool, bool) {
    let y_mod = y.rem(modulus);
    for a in [false, true] {
        for b in [false, true] {
            let mut candidate = y_mod.clone();
            if a {
                candidate = modulus
                    .as_ref()
                    .checked_sub(&candidate)
                    .expect("candidate < modulus");
            }
            if b {
                candidate = candidate.mul_mod(&BoxedUint::from(2u64).widen(candidate.bits_precision()), modulus);
            }
            if let Some(root) = fourth_root_via_crt(&candidate, secret) {
                return (root, a, b);
            }
        }
    }
    // Should not be reachable for a genuine Blum integer; fall back to a
    // harmless value so verification simply fails rather than panicking.
    (BoxedUint::zero_with_precision(y.bits_precision()), false, false)
}

fn fourth_root_via_crt(target: &Uint, secret: &SecretKey) -> Option<Uint> {
    let root_p = fourth_root_mod_blum_prime(target, secret.p())?;
    let root_q = fourth_root_mod_blum_prime(target, secret.q())?;
    crt_combine(&root_p, secret.p(), &root_q, secret.q())
}

/// For a prime `p ≡ 3 mod 4`, a fourth root of a quadratic residue `t` is
/// `t^((p+1)/4)` applied twice (since `(p+1)/4` is the square-root
/// exponent for such primes).
fn fourth_root_mod_blum_prime(t: &Uint, p: &Uint) -> Option<Uint> {
    let p_nz = NonZero::new(p.clone())?;
    let exponent = p
        .checked_add(&BoxedUint::one_with_precision(p.bits_precision()))
        .expect("p + 1 fits")
        .shr_vartime(2);
    let first_root = t.rem(&p_nz).pow_vartime(&exponent).rem(&p_nz);
    let fourth = first_root.pow_vartime(&exponent).rem(&p_nz);
    let check = fourth.pow_vartime(&BoxedUint::from(4u64).widen(fourth.bits_precision())).rem(&p_nz);
    if check == t.rem(&p_nz) {
        Some(fourth)
    } else {
        None
    }
}

fn crt_combine(r_p: &Uint, p: &Uint, r_q: &Uint, q: &Uint) -> Option<Uint> {
    let n = p * q;
    let n_nz = NonZero::new(n.clone())?;
    let q_inv_mod_p = q.inv_mod(&NonZero::new(p.clone())?)?;
    let diff = if r_p >= &r_q.rem(&NonZero::new(p.clone())?) {
        r_p.checked_sub(&r_q.rem(&NonZero::new(p.clone())?))?
    } else {
        p.checked_sub(&r_q.rem(&NonZero::new(p.clone())?).checked_sub(r_p)?)?
    };
    let h = diff.mul_mod(&q_inv_mod_p, &NonZero::new(p.clone())?);
    let result = r_q.checked_add(&h.checked_mul(q)?)?;
    Some(result.rem(&n_nz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TestSchemeParams;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn proves_and_verifies_blum_integer() {
        let mut rng = ChaCha8Rng::seed_from_u64(50);
        let secret = SecretKey::random::<TestSchemeParams>(&mut rng);
        let transcript = Hash::new_with_dst("test");

        let proof = ModProof::prove::<TestSchemeParams>(&mut rng, &secret, transcript.clone());
        assert!(proof.verify::<TestSchemeParams>(secret.public_key(), transcript));
    }

    #[test]
    fn rejects_a_different_modulus() {
        let mut rng = ChaCha8Rng::seed_from_u64(51);
        let secret = SecretKey::random::<TestSchemeParams>(&mut rng);
        let other = SecretKey::random::<TestSchemeParams>(&mut rng);
        let transcript = Hash::new_with_dst("test");

        let proof = ModProof::prove::<TestSchemeParams>(&mut rng, &secret, transcript.clone());
        assert!(!proof.verify::<TestSchemeParams>(other.public_key(), transcript));
    }
}
