//! Big-integer type aliases backing Paillier/Pedersen arithmetic.
//!
//! Built on `crypto-bigint` + `crypto-primes` rather than a hand-rolled
//! modular-arithmetic layer.

use crypto_bigint::{BoxedUint, NonZero};
use rand_core::CryptoRngCore;

/// An arbitrary-precision unsigned integer, boxed since Paillier moduli
/// (2048 bits) and ciphertexts (4096 bits) don't share one fixed width.
pub type Uint = BoxedUint;

/// A modulus, guaranteed non-zero so that `rem`/`inv` are safe to call.
pub type Modulus = NonZero<BoxedUint>;

/// Samples a uniformly random odd integer of the given bit length, used
/// as the blinding randomizer `r` in Paillier encryption and as ZK-proof
/// witnesses.
pub fn random_below(rng: &mut impl CryptoRngCore, modulus: &Modulus) -> Uint {
    BoxedUint::random_mod(rng, modulus)
}

/// A signed big integer, represented as `(magnitude, is_negative)`, for
/// the Pedersen commitment domain and zk-fac/zk-prm range proofs which
/// operate over `±2^L` style intervals rather than `Z/NZ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUint {
    magnitude: Uint,
    negative: bool,
}

impl SignedUint {
    pub fn from_uint(magnitude: Uint) -> Self {
        Self {
            magnitude,
            negative: false,
        }
    }

    pub fn negate(mut self) -> Self {
        if !bool::from(self.magnitude.is_zero()) {
            self.negative = !self.negative;
        }
        self
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn magnitude(&self) -> &Uint {
        &self.magnitude
    }

    /// Reduces into `Z/NZ`, i.e. `N - magnitude` if negative.
    pub fn reduce(&self, modulus: &Modulus) -> Uint {
        let reduced = self.magnitude.rem(modulus);
        if self.negative && !bool::from(reduced.is_zero()) {
            modulus.as_ref().checked_sub(&reduced).expect("reduced < modulus")
        } else {
            reduced
        }
    }

    /// Whether the magnitude is `< bound`, the check used by zk-fac/zk-prm
    /// range soundness.
    pub fn in_range(&self, bound: &Uint) -> bool {
        self.magnitude < *bound
    }

    pub fn add(&self, other: &Self) -> Self {
        match (self.negative, other.negative) {
            (false, false) => Self {
                magnitude: &self.magnitude + &other.magnitude,
                negative: false,
            },
            (true, true) => Self {
                magnitude: &self.magnitude + &other.magnitude,
                negative: true,
            },
            _ => {
                if self.magnitude >= other.magnitude {
                    Self {
                        magnitude: self.magnitude.checked_sub(&other.magnitude).expect("checked above"),
                        negative: self.negative,
                    }
                } else {
                    Self {
                        magnitude: other.magnitude.checked_sub(&self.magnitude).expect("checked above"),
                        negative: other.negative,
                    }
                }
            }
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self {
            magnitude: &self.magnitude * &other.magnitude,
            negative: self.negative != other.negative,
        }
    }
}

/// Modular exponentiation by a signed exponent: inverts `base` first when
/// the exponent is negative. Used by zk-fac, whose Fiat–Shamir challenge
/// is sampled from `±2^epsilon` rather than a single bit, for tighter
/// soundness.
pub fn pow_signed(base: &Uint, exponent: &SignedUint, modulus: &Modulus) -> Option<Uint> {
    let reduced_base = base.rem(modulus);
    let effective_base = if exponent.is_negative() {
        reduced_base.inv_mod(modulus).into_option()?
    } else {
        reduced_base
    };
    Some(effective_base.pow_vartime(exponent.magnitude()).rem(modulus))
}
