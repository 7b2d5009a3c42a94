//! zk-log*: proof that a Paillier ciphertext `C` encrypts the discrete
//! log `x` of a public point `X = g^x`, i.e. that `C` and `X` refer to the
//! same secret value across the integer and curve domains.

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
pub struct LogStarProof<C: Curve> {
    s_commitment: Uint,
    a_ciphertext: Uint,
    y_commitment: C::Point,
    d_commitment: Uint,
    z1: Uint,
    z2: Uint,
    z3: Uint,
}

impl<C: Curve> LogStarProof<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn prove<P: SchemeParams>(
        rng: &mut (impl CryptoRngCore + rand_core::RngCore + rand_core::CryptoRng),
        paillier: &PublicKey,
        aux: &PedersenParams,
        x_as_int: &Uint,
        x_scalar: &C::Scalar,
        randomizer: &Uint,
        ciphertext: &Uint,
        transcript: Hash,
    ) -> Self {
        let range = core::num::NonZeroU32::new(P::L_PLUS_EPSILON).expect("nonzero");

        let mu = BoxedUint::random(rng, range);
        let s_commitment =
            aux.commit(&SignedUint::from_uint(x_as_int.clone()), &SignedUint::from_uint(mu.clone()));

        let alpha = BoxedUint::random(rng, range);
        let r = crate::paillier::random_randomizer(rng, paillier);
        let gamma = BoxedUint::random(rng, range);
        let a_ciphertext = paillier.encrypt_with_randomizer(&alpha, &r);
        let d_commitment =
            aux.commit(&SignedUint::from_uint(alpha.clone()), &SignedUint::from_uint(gamma.clone()));
        let alpha_scalar = C::Scalar::from_bytes(&alpha.to_be_bytes()).unwrap_or_else(C::Scalar::zero);
        let y_commitment = C::Point::mul_by_generator(&alpha_scalar);

        let e = challenge::<P, C>(aux, &s_commitment, &a_ciphertext, &y_commitment, &d_commitment, transcript);

        let z1 = e.mul(&SignedUint::from_uint(x_as_int.clone())).add(&SignedUint::from_uint(alpha));
        let z2 = {
            let n_nz = NonZero::new(paillier.n().clone()).expect("N != 0");
            let r_pow_e = pow_signed(randomizer, &e, &n_nz).unwrap_or_else(|| randomizer.clone());
            r.mul_mod(&r_pow_e, &n_nz)
        };
        let z3 = e.mul(&SignedUint::from_uint(mu)).add(&SignedUint::from_uint(gamma));

        let _ = x_scalar; // the curve-domain witness is implicit in y_commitment's construction
        Self {
            s_commitment,
            a_ciphertext,
            y_commitment,
            d_commitment,
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
        x_point: &C::Point,
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
        let e = challenge::<P, C>(
            aux,
            &self.s_commitment,
            &self.a_ciphertext,
            &self.y_commitment,
            &self.d_commitment,
            transcript,
        );

        let lhs_enc = paillier.encrypt_with_randomizer(&self.z1, &self.z2);
        let c_pow_e = {
            let c = ciphertext.rem(&n2);
            if e.is_negative() {
                match c.inv_mod(&n2) {
                    Some(inv) => inv.pow_vartime(e.magnitude()).rem(&n2),
                    None => return false,
                }
            } else {
                c.pow_vartime(e.magnitude()).rem(&n2)
            }
        };
        let rhs_enc = self.a_ciphertext.mul_mod(&c_pow_e, &n2);
        if lhs_enc != rhs_enc {
            return false;
        }

        let z1_scalar = match C::Scalar::from_bytes(&self.z1.to_be_bytes()) {
            Some(s) => s,
            None => return false,
        };
        let e_scalar = signed_to_scalar::<C>(&e);
        let lhs_point = C::Point::mul_by_generator(&z1_scalar);
        let rhs_point = self.y_commitment + x_point.mul(&e_scalar);
        if lhs_point != rhs_point {
            return false;
        }

        let z1 = SignedUint::from_uint(self.z1.clone());
        let z3 = SignedUint::from_uint(self.z3.clone());
        let lhs_commit = aux.commit(&z1, &z3);
        let s_pow_e = match pow_signed(&self.s_commitment, &e, &n_hat) {
            Some(v) => v,
            None => return false,
        };
        let rhs_commit = self.d_commitment.mul_mod(&s_pow_e, &n_hat);

        lhs_commit == rhs_commit
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

fn challenge<P: SchemeParams, C: Curve>(
    aux: &PedersenParams,
    s: &Uint,
    a: &Uint,
    y: &C::Point,
    d: &Uint,
    transcript: Hash,
) -> SignedUint {
    let digest = transcript
        .chain_bytes(&aux.n().to_be_bytes())
        .chain_bytes(&s.to_be_bytes())
        .chain_bytes(&a.to_be_bytes())
        .chain_bytes(&y.to_compressed())
        .chain_bytes(&d.to_be_bytes())
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
    use crate::curve::Secp256k1;
    use crate::paillier::SecretKey;
    use crate::params::TestSchemeParams;
    use crate::pedersen::PedersenSecret;
    use crate::tools::random::random_scalar;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn proves_and_verifies_log_equality() {
        let mut rng = ChaCha8Rng::seed_from_u64(30);
        let prover = SecretKey::random::<TestSchemeParams>(&mut rng);
        let verifier = SecretKey::random::<TestSchemeParams>(&mut rng);
        let aux = PedersenSecret::generate(&mut rng, verifier.public_key().n().clone(), verifier.totient());

        let x_scalar = random_scalar::<<Secp256k1 as Curve>::Scalar>(&mut rng);
        let x_point = <Secp256k1 as Curve>::Point::mul_by_generator(&x_scalar);
        let x_as_int = BoxedUint::from_be_slice(&x_scalar.to_bytes(), prover.public_key().n().bits_precision());
        let randomizer = crate::paillier::random_randomizer(&mut rng, prover.public_key());
        let ciphertext = prover.public_key().encrypt_with_randomizer(&x_as_int, &randomizer);
        let transcript = Hash::new_with_dst("test");

        let proof = LogStarProof::<Secp256k1>::prove::<TestSchemeParams>(
            &mut rng,
            prover.public_key(),
            aux.public(),
            &x_as_int,
            &x_scalar,
            &randomizer,
            &ciphertext,
            transcript.clone(),
        );
        assert!(proof.verify::<TestSchemeParams>(prover.public_key(), aux.public(), &ciphertext, &x_point, transcript));
    }

    #[test]
    fn rejects_a_different_point() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let prover = SecretKey::random::<TestSchemeParams>(&mut rng);
        let verifier = SecretKey::random::<TestSchemeParams>(&mut rng);
        let aux = PedersenSecret::generate(&mut rng, verifier.public_key().n().clone(), verifier.totient());

        let x_scalar = random_scalar::<<Secp256k1 as Curve>::Scalar>(&mut rng);
        let x_as_int = BoxedUint::from_be_slice(&x_scalar.to_bytes(), prover.public_key().n().bits_precision());
        let randomizer = crate::paillier::random_randomizer(&mut rng, prover.public_key());
        let ciphertext = prover.public_key().encrypt_with_randomizer(&x_as_int, &randomizer);
        let transcript = Hash::new_with_dst("test");

        let proof = LogStarProof::<Secp256k1>::prove::<TestSchemeParams>(
            &mut rng,
            prover.public_key(),
            aux.public(),
            &x_as_int,
            &x_scalar,
            &randomizer,
            &ciphertext,
            transcript.clone(),
        );
        let wrong_point = <Secp256k1 as Curve>::Point::mul_by_generator(&random_scalar(&mut rng));
        assert!(!proof.verify::<TestSchemeParams>(prover.public_key(), aux.public(), &ciphertext, &wrong_point, transcript));
    }
}
