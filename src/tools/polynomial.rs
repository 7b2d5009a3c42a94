//! Degree-`t` scalar polynomials for Feldman/Shamir VSS.
//!
//! Grounded on the Horner's-method evaluation in
//! `ZcashFoundation/redjubjub`'s `generate_shares`, generalized to any
//! curve via [`CurveScalar`].

use alloc::vec::Vec;

use rand_core::CryptoRngCore;

use crate::curve::{Curve, CurvePoint, CurveScalar};
use crate::tools::random::random_scalar;

/// `f(X) = constant_term + c_1 X + ... + c_t X^t`.
#[derive(Clone)]
pub struct Polynomial<C: Curve> {
    /// `coefficients[0]` is the constant term (the shared secret).
    coefficients: Vec<C::Scalar>,
}

impl<C: Curve> Polynomial<C> {
    /// Samples a random degree-`threshold` polynomial with the given
    /// constant term (the fresh secret for keygen, or zero for a CMP
    /// refresh where no new secret material is introduced).
    pub fn random_with_constant(rng: &mut impl CryptoRngCore, threshold: u32, constant_term: C::Scalar) -> Self {
        let mut coefficients = alloc::vec![constant_term];
        for _ in 0..threshold {
            coefficients.push(random_scalar(rng));
        }
        Self { coefficients }
    }

    pub fn constant_term(&self) -> C::Scalar {
        self.coefficients[0]
    }

    /// Evaluates `f(x)` via Horner's method.
    pub fn evaluate(&self, x: &C::Scalar) -> C::Scalar {
        let mut result = C::Scalar::zero();
        for coefficient in self.coefficients.iter().rev() {
            result = result * *x + *coefficient;
        }
        result
    }

    /// The Feldman commitment `F = g·f`: one curve point per coefficient.
    pub fn commit(&self) -> Vec<C::Point> {
        self.coefficients.iter().map(C::Point::mul_by_generator).collect()
    }
}

/// Evaluates a Feldman commitment `F(x) = Σ_k F_k · x^k` homomorphically,
/// letting a receiver verify `g·share == F(x)` without learning the
/// polynomial's coefficients.
pub fn evaluate_commitment<C: Curve>(commitment: &[C::Point], x: &C::Scalar) -> C::Point {
    let mut result = C::Point::identity();
    let mut power = C::Scalar::one();
    for point in commitment {
        result = result + point.mul(&power);
        power = power * *x;
    }
    result
}
