//! zk-aff-g: proof of knowledge of `(x, y)` such that `X = g^x`, `Y =
//! Enc_{pk1}(y)`, and `D = C^x · Enc_{pk0}(y)` for a public ciphertext
//! `C` under `pk0` — the "affine operation with group commitment" used to
//! bind an encrypted multiplication to a curve point.
//!
//! Field names (`pk0`, `pk1`, `C`, `D`, `Y`, `X`) match the relation's
//! usual presentation; the prove/verify logic here generalizes the
//! commit/challenge/response shape of `enc`/`log_star` to the
//! two-secret relation.

use serde::{Deserialize, Serialize};

use crate::bigint::{pow_signed, SignedUint, Uint};
use crate::curve::{Curve, CurvePoint, CurveScalar};
use crate::paillier::PublicKey;
use crate::params::SchemeParams;
use crate::pedersen::PedersenParams;
use crate::tools::hashing::Hash;
use crypto_bigint::{BoxedUint, NonZero};
use rand_core::CryptoRngCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AffGProof<C: Curve> {
    s_commitment: Uint,
    t_commitment: Uint,
    a_ciphertext: Uint,
    bx_point: C::Point,
    by_ciphertext: Uint,
    e_commitment: Uint,
    f_commitment: Uint,
    z1: Uint,
    z2: Uint,
    z3: Uint,
    z4: Uint,
    w: Uint,
    wy: Uint,
}

impl<Cv: Curve> AffGProof<Cv> {
    #[allow(clippy::too_many_arguments)]
    pub fn prove<P: SchemeParams>(
        rng: &mut (impl CryptoRngCore + rand_core::RngCore + rand_core::CryptoRng),
        pk0: &PublicKey,
        pk1: &PublicKey,
        aux: &PedersenParams,
        x: &Uint,
        y: &Uint,
        rho: &Uint,
        rho_y: &Uint,
        c_ciphertext: &Uint,
        transcript: Hash,
    ) -> Self {
        let range = core::num::NonZeroU32::new(P::L_PLUS_EPSILON).expect("nonzero");

        let mu = BoxedUint::random(rng, range);
        let nu = BoxedUint::random(rng, range);
        let s_commitment = aux.commit(&SignedUint::from_uint(x.clone()), &SignedUint::from_uint(mu.clone()));
        let t_commitment = aux.commit(&SignedUint::from_uint(y.clone()), &SignedUint::from_uint(nu.clone()));

        let alpha = BoxedUint::random(rng, range);
        let beta = BoxedUint::random(rng, range);
        let gamma = BoxedUint::random(rng, range);
        let delta = BoxedUint::random(rng, range);

        let r = crate::paillier::random_randomizer(rng, pk0);
        let r_y = crate::paillier::random_randomizer(rng, pk1);

        let n0_sq = NonZero::new(pk0.n_squared().clone()).expect("N0^2 != 0");
        let a_ciphertext = {
            let c_pow_alpha = c_ciphertext.rem(&n0_sq).pow_vartime(&alpha).rem(&n0_sq);
            let enc_beta = pk0.encrypt_with_randomizer(&beta, &r);
            c_pow_alpha.mul_mod(&enc_beta, &n0_sq)
        };
        let alpha_scalar = Cv::Scalar::from_bytes(&alpha.to_be_bytes()).unwrap_or_else(Cv::Scalar::zero);
        let bx_point = Cv::Point::mul_by_generator(&alpha_scalar);
        let by_ciphertext = pk1.encrypt_with_randomizer(&alpha, &r_y);
        let e_commitment =
            aux.commit(&SignedUint::from_uint(alpha.clone()), &SignedUint::from_uint(gamma.clone()));
        let f_commitment =
            aux.commit(&SignedUint::from_uint(beta.clone()), &SignedUint::from_uint(delta.clone()));

        let e = challenge::<P, Cv>(
            aux,
            &s_commitment,
            &t_commitment,
            &a_ciphertext,
            &bx_point,
            &by_ciphertext,
            &e_commitment,
            &f_commitment,
            transcript,
        );

        let z1 = e.mul(&SignedUint::from_uint(x.clone())).add(&SignedUint::from_uint(alpha));
        let z2 = e.mul(&SignedUint::from_uint(y.clone())).add(&SignedUint::from_uint(beta));
        let z3 = e.mul(&SignedUint::from_uint(mu)).add(&SignedUint::from_uint(gamma));
        let z4 = e.mul(&SignedUint::from_uint(nu)).add(&SignedUint::from_uint(delta));
        let w = {
            let n0_nz = NonZero::new(pk0.n().clone()).expect("N0 != 0");
            let rho_pow_e = pow_signed(rho, &e, &n0_nz).unwrap_or_else(|| rho.clone());
            r.mul_mod(&rho_pow_e, &n0_nz)
        };
        let wy = {
            let n1_nz = NonZero::new(pk1.n().clone()).expect("N1 != 0");
            let rho_y_pow_e = pow_signed(rho_y, &e, &n1_nz).unwrap_or_else(|| rho_y.clone());
            r_y.mul_mod(&rho_y_pow_e, &n1_nz)
        };

        Self {
            s_commitment,
            t_commitment,
            a_ciphertext,
            bx_point,
            by_ciphertext,
            e_commitment,
            f_commitment,
            z1: z1.magnitude().clone(),
            z2: z2.magnitude().clone(),
            z3: z3.magnitude().clone(),
            z4: z4.magnitude().clone(),
            w,
            wy,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify<P: SchemeParams>(
        &self,
        pk0: &PublicKey,
        pk1: &PublicKey,
        aux: &PedersenParams,
        c_ciphertext: &Uint,
        d_ciphertext: &Uint,
        y_ciphertext: &Uint,
        x_point: &Cv::Point,
        transcript: Hash,
    ) -> bool {
        if !aux.is_well_formed() || !pk0.is_well_formed::<P>() || !pk1.is_well_formed::<P>() {
            return false;
        }
        let n_hat = match NonZero::new(aux.n().clone()) {
            Some(m) => m,
            None => return false,
        };
        let n0_sq = match NonZero::new(pk0.n_squared().clone()) {
            Some(m) => m,
            None => return false,
        };
        let n1_sq = match NonZero::new(pk1.n_squared().clone()) {
            Some(m) => m,
            None => return false,
        };
        let e = challenge::<P, Cv>(
            aux,
            &self.s_commitment,
            &self.t_commitment,
            &self.a_ciphertext,
            &self.bx_point,
            &self.by_ciphertext,
            &self.e_commitment,
            &self.f_commitment,
            transcript,
        );

        // D ?= C^z1 · Enc_{pk0}(z2; w) / A^e  <=>  C^z1·Enc(z2;w) == A · D^e
        let lhs1 = {
            let c_pow_z1 = c_ciphertext.rem(&n0_sq).pow_vartime(&self.z1).rem(&n0_sq);
            let enc_z2 = pk0.encrypt_with_randomizer(&self.z2, &self.w);
            c_pow_z1.mul_mod(&enc_z2, &n0_sq)
        };
        let d_pow_e = {
            let d = d_ciphertext.rem(&n0_sq);
            if e.is_negative() {
                match d.inv_mod(&n0_sq) {
                    Some(inv) => inv.pow_vartime(e.magnitude()).rem(&n0_sq),
                    None => return false,
                }
            } else {
                d.pow_vartime(e.magnitude()).rem(&n0_sq)
            }
        };
        let rhs1 = self.a_ciphertext.mul_mod(&d_pow_e, &n0_sq);
        if lhs1 != rhs1 {
            return false;
        }

        let z1_scalar = match Cv::Scalar::from_bytes(&self.z1.to_be_bytes()) {
            Some(s) => s,
            None => return false,
        };
        let e_scalar = signed_to_scalar::<Cv>(&e);
        let lhs_point = Cv::Point::mul_by_generator(&z1_scalar);
        let rhs_point = self.bx_point + x_point.mul(&e_scalar);
        if lhs_point != rhs_point {
            return false;
        }

        let lhs_y = pk1.encrypt_with_randomizer(&self.z1, &self.wy);
        let y_pow_e = {
            let y = y_ciphertext.rem(&n1_sq);
            if e.is_negative() {
                match y.inv_mod(&n1_sq) {
                    Some(inv) => inv.pow_vartime(e.magnitude()).rem(&n1_sq),
                    None => return false,
                }
            } else {
                y.pow_vartime(e.magnitude()).rem(&n1_sq)
            }
        };
        let rhs_y = self.by_ciphertext.mul_mod(&y_pow_e, &n1_sq);
        if lhs_y != rhs_y {
            return false;
        }

        let z1 = SignedUint::from_uint(self.z1.clone());
        let z2 = SignedUint::from_uint(self.z2.clone());
        let z3 = SignedUint::from_uint(self.z3.clone());
        let z4 = SignedUint::from_uint(self.z4.clone());

        let lhs_s = aux.commit(&z1, &z3);
        let s_pow_e = match pow_signed(&self.s_commitment, &e, &n_hat) {
            Some(v) => v,
            None => return false,
        };
        if lhs_s != self.e_commitment.mul_mod(&s_pow_e, &n_hat) {
            return false;
        }

        let lhs_t = aux.commit(&z2, &z4);
        let t_pow_e = match pow_signed(&self.t_commitment, &e, &n_hat) {
            Some(v) => v,
            None => return false,
        };
        lhs_t == self.f_commitment.mul_mod(&t_pow_e, &n_hat)
    }
}

fn signed_to_scalar<C: Curve>(value: &SignedUint) -> C::Scalar {
    let magnitude = C::Scalar::from_bytes(&value.magnitude().to_be_bytes()).unwrap_or_else(C::Scalar::zero);
    if value.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Secp256k1;
    use crate::paillier::{encrypt, SecretKey};
    use crate::params::TestSchemeParams;
    use crate::pedersen::PedersenSecret;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    struct Scenario {
        pk0: SecretKey,
        pk1: SecretKey,
        aux: PedersenSecret,
        x: Uint,
        y: Uint,
        rho: Uint,
        rho_y: Uint,
        c_ciphertext: Uint,
        d_ciphertext: Uint,
        y_ciphertext: Uint,
        x_point: <Secp256k1 as Curve>::Point,
    }

    fn setup(rng: &mut ChaCha8Rng) -> Scenario {
        let pk0 = SecretKey::random::<TestSchemeParams>(rng);
        let pk1 = SecretKey::random::<TestSchemeParams>(rng);
        let verifier = SecretKey::random::<TestSchemeParams>(rng);
        let aux = PedersenSecret::generate(rng, verifier.public_key().n().clone(), verifier.totient());

        let x = BoxedUint::from(5u64).widen(pk0.public_key().n().bits_precision());
        let y = BoxedUint::from(7u64).widen(pk0.public_key().n().bits_precision());
        let x_scalar = <Secp256k1 as Curve>::Scalar::from_bytes(&x.to_be_bytes()).expect("5 fits a scalar");
        let x_point = <Secp256k1 as Curve>::Point::mul_by_generator(&x_scalar);

        let (c_ciphertext, c_randomizer) = encrypt(rng, pk0.public_key(), &BoxedUint::from(11u64).widen(pk0.public_key().n().bits_precision()));
        let _ = c_randomizer;
        let (y_ciphertext, rho_y) = encrypt(rng, pk1.public_key(), &y);
        let rho = crate::paillier::random_randomizer(rng, pk0.public_key());
        let d_ciphertext = {
            let c_pow_x = pk0.public_key().mul_plain(&c_ciphertext, &x);
            let enc_y = pk0.public_key().encrypt_with_randomizer(&y, &rho);
            pk0.public_key().add(&c_pow_x, &enc_y)
        };

        Scenario {
            pk0,
            pk1,
            aux,
            x,
            y,
            rho,
            rho_y,
            c_ciphertext,
            d_ciphertext,
            y_ciphertext,
            x_point,
        }
    }

    #[test]
    fn proves_and_verifies_affine_relation() {
        let mut rng = ChaCha8Rng::seed_from_u64(40);
        let s = setup(&mut rng);
        let transcript = Hash::new_with_dst("test");

        let proof = AffGProof::<Secp256k1>::prove::<TestSchemeParams>(
            &mut rng,
            s.pk0.public_key(),
            s.pk1.public_key(),
            s.aux.public(),
            &s.x,
            &s.y,
            &s.rho,
            &s.rho_y,
            &s.c_ciphertext,
            transcript.clone(),
        );
        assert!(proof.verify::<TestSchemeParams>(
            s.pk0.public_key(),
            s.pk1.public_key(),
            s.aux.public(),
            &s.c_ciphertext,
            &s.d_ciphertext,
            &s.y_ciphertext,
            &s.x_point,
            transcript,
        ));
    }

    #[test]
    fn rejects_a_different_d() {
        let mut rng = ChaCha8Rng::seed_from_u64(41);
        let s = setup(&mut rng);
        let transcript = Hash::new_with_dst("test");

        let proof = AffGProof::<Secp256k1>::prove::<TestSchemeParams>(
            &mut rng,
            s.pk0.public_key(),
            s.pk1.public_key(),
            s.aux.public(),
            &s.x,
            &s.y,
            &s.rho,
            &s.rho_y,
            &s.c_ciphertext,
            transcript.clone(),
        );
        let forged_d = s.pk0.public_key().add(&s.d_ciphertext, &s.c_ciphertext);
        assert!(!proof.verify::<TestSchemeParams>(
            s.pk0.public_key(),
            s.pk1.public_key(),
            s.aux.public(),
            &s.c_ciphertext,
            &forged_d,
            &s.y_ciphertext,
            &s.x_point,
            transcript,
        ));
    }
}

#[allow(clippy::too_many_arguments)]
fn challenge<P: SchemeParams, C: Curve>(
    aux: &PedersenParams,
    s: &Uint,
    t: &Uint,
    a: &Uint,
    bx: &C::Point,
    by: &Uint,
    e_commitment: &Uint,
    f: &Uint,
    transcript: Hash,
) -> SignedUint {
    let digest = transcript
        .chain_bytes(&aux.n().to_be_bytes())
        .chain_bytes(&s.to_be_bytes())
        .chain_bytes(&t.to_be_bytes())
        .chain_bytes(&a.to_be_bytes())
        .chain_bytes(&bx.to_compressed())
        .chain_bytes(&by.to_be_bytes())
        .chain_bytes(&e_commitment.to_be_bytes())
        .chain_bytes(&f.to_be_bytes())
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
