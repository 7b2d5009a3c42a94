//! The curve abstraction shared by CMP (secp256k1 only) and FROST
//! (secp256k1 default/Taproot, or Edwards25519).

mod edwards25519;
mod secp256k1;
mod signature;

pub use edwards25519::Edwards25519;
pub use secp256k1::Secp256k1;
pub use signature::Signature;

use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::Sum;
use core::ops::{Add, Mul, Neg, Sub};

use serde::{de::DeserializeOwned, Serialize};
use subtle::ConstantTimeEq;

/// A scalar field element of a curve's group order.
pub trait CurveScalar:
    Debug
    + Clone
    + Copy
    + PartialEq
    + Eq
    + ConstantTimeEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + Sum
    + Serialize
    + DeserializeOwned
    + zeroize::Zeroize
{
    /// The additive identity.
    fn zero() -> Self;
    /// The multiplicative identity.
    fn one() -> Self;
    /// Multiplicative inverse; `None` for zero.
    fn invert(&self) -> Option<Self>;
    /// Fixed-width big-endian encoding.
    fn to_bytes(&self) -> Vec<u8>;
    /// Decodes a fixed-width big-endian encoding, rejecting out-of-range values.
    fn from_bytes(bytes: &[u8]) -> Option<Self>;
    /// Reduces a wide (double-length) hash digest into the scalar field,
    /// the way both `group.rs`'s `from_digest` and the Go `SetUniformBytes`
    /// constructor do — required so that Fiat-Shamir challenges and FROST
    /// binding factors don't need rejection sampling.
    fn from_wide_bytes(bytes: &[u8]) -> Self;
}

/// A point on a curve's group.
pub trait CurvePoint:
    Debug
    + Clone
    + Copy
    + PartialEq
    + Eq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Sum
    + Serialize
    + DeserializeOwned
{
    type Scalar: CurveScalar;

    /// The group identity (point at infinity).
    fn identity() -> Self;
    /// The fixed generator point.
    fn generator() -> Self;
    /// Scalar multiplication against the generator; faster than a generic
    /// `mul` on backends with a precomputed table (matches `group.rs`'s
    /// `mul_by_generator`).
    fn mul_by_generator(scalar: &Self::Scalar) -> Self;
    fn mul(&self, scalar: &Self::Scalar) -> Self;
    /// Whether this is the identity.
    fn is_identity(&self) -> bool;
    /// Compressed encoding (SEC1 for secp256k1, RFC 8032 for Ed25519).
    fn to_compressed(&self) -> Vec<u8>;
    /// Decodes a compressed encoding.
    fn from_compressed(bytes: &[u8]) -> Option<Self>;
}

/// A curve usable by a protocol family, bundling its scalar/point types
/// with identifying metadata absorbed into every transcript hash.
pub trait Curve: 'static + Send + Sync + Clone + Debug {
    type Scalar: CurveScalar;
    type Point: CurvePoint<Scalar = Self::Scalar>;

    /// A domain-separation label, e.g. `"secp256k1"` / `"edwards25519"`.
    const CURVE_NAME: &'static str;
    /// Bits of security this curve offers (for sanity assertions only).
    const SECURITY_BITS: u32;
}
