//! secp256k1, backed by `k256`.
//!
//! Grounded on the `tools::group` module shape: newtype wrappers around
//! `k256::Scalar`/`k256::ProjectivePoint`, SEC1 compressed encoding, and
//! wide-reduction hashing via `Reduce<U256>`.

use alloc::vec::Vec;

use k256::elliptic_curve::{
    group::GroupEncoding,
    ops::Reduce,
    sec1::{FromEncodedPoint, ToEncodedPoint},
    Field, PrimeField,
};
use k256::{ProjectivePoint, U256};
use serde::{Deserialize, Serialize};
use subtle::{ConstantTimeEq, CtOption};
use zeroize::Zeroize;

use super::{Curve, CurvePoint, CurveScalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Secp256k1;

impl Curve for Secp256k1 {
    type Scalar = Scalar;
    type Point = Point;

    const CURVE_NAME: &'static str = "secp256k1";
    const SECURITY_BITS: u32 = 128;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Zeroize)]
pub struct Scalar(#[serde(with = "scalar_serde")] k256::Scalar);

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}
impl Eq for Scalar {}

impl ConstantTimeEq for Scalar {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl core::ops::Add for Scalar {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}
impl core::ops::Sub for Scalar {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}
impl core::ops::Mul for Scalar {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}
impl core::ops::Neg for Scalar {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}
impl core::iter::Sum for Scalar {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Scalar::zero(), |acc, x| acc + x)
    }
}

impl CurveScalar for Scalar {
    fn zero() -> Self {
        Self(k256::Scalar::ZERO)
    }

    fn one() -> Self {
        Self(k256::Scalar::ONE)
    }

    fn invert(&self) -> Option<Self> {
        let inv: CtOption<k256::Scalar> = self.0.invert();
        Option::from(inv.map(Self))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        let mut repr = k256::FieldBytes::default();
        repr.copy_from_slice(bytes);
        Option::from(k256::Scalar::from_repr(repr)).map(Self)
    }

    fn from_wide_bytes(bytes: &[u8]) -> Self {
        let wide = U256::from_be_slice(&wide_to_32(bytes));
        Self(<k256::Scalar as Reduce<U256>>::reduce(wide))
    }
}

/// `k256`'s wide reduction only accepts `U256`; for a true 64-byte digest
/// we fold the high half in via an extra reduction, the usual
/// expand-message idiom for Fiat-Shamir challenges.
fn wide_to_32(bytes: &[u8]) -> [u8; 32] {
    if bytes.len() <= 32 {
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(bytes);
        return out;
    }
    let (hi, lo) = bytes.split_at(bytes.len() - 32);
    let hi_scalar = {
        let mut padded = [0u8; 32];
        padded[32 - hi.len()..].copy_from_slice(hi);
        let hi_wide = U256::from_be_slice(&padded);
        <k256::Scalar as Reduce<U256>>::reduce(hi_wide)
    };
    let lo_scalar = {
        let mut padded = [0u8; 32];
        padded.copy_from_slice(lo);
        let lo_wide = U256::from_be_slice(&padded);
        <k256::Scalar as Reduce<U256>>::reduce(lo_wide)
    };
    // 2^256 mod n, folded in by doubling 256 times.
    let mut shifted = hi_scalar;
    for _ in 0..256 {
        shifted = shifted.double();
    }
    (shifted + lo_scalar).to_bytes().into()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point(#[serde(with = "point_serde")] ProjectivePoint);

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Point {}

impl core::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}
impl core::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}
impl core::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}
impl core::iter::Sum for Point {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Point::identity(), |acc, x| acc + x)
    }
}

impl CurvePoint for Point {
    type Scalar = Scalar;

    fn identity() -> Self {
        Self(ProjectivePoint::IDENTITY)
    }

    fn generator() -> Self {
        Self(ProjectivePoint::GENERATOR)
    }

    fn mul_by_generator(scalar: &Self::Scalar) -> Self {
        Self(ProjectivePoint::GENERATOR * scalar.0)
    }

    fn mul(&self, scalar: &Self::Scalar) -> Self {
        Self(self.0 * scalar.0)
    }

    fn is_identity(&self) -> bool {
        bool::from(self.0.to_bytes().ct_eq(&ProjectivePoint::IDENTITY.to_bytes()))
    }

    fn to_compressed(&self) -> Vec<u8> {
        self.0.to_affine().to_encoded_point(true).as_bytes().to_vec()
    }

    fn from_compressed(bytes: &[u8]) -> Option<Self> {
        let encoded = k256::EncodedPoint::from_bytes(bytes).ok()?;
        Option::from(k256::AffinePoint::from_encoded_point(&encoded)).map(|p| Self(p.into()))
    }
}

mod scalar_serde {
    use k256::elliptic_curve::PrimeField;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(s: &k256::Scalar, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes: [u8; 32] = s.to_bytes().into();
        bytes.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<k256::Scalar, D::Error> {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        Option::from(k256::Scalar::from_repr(bytes.into()))
            .ok_or_else(|| serde::de::Error::custom("scalar out of range"))
    }
}

mod point_serde {
    use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
    use k256::ProjectivePoint;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(p: &ProjectivePoint, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = p.to_affine().to_encoded_point(true);
        bytes.as_bytes().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ProjectivePoint, D::Error> {
        let bytes = alloc::vec::Vec::<u8>::deserialize(deserializer)?;
        let encoded =
            k256::EncodedPoint::from_bytes(&bytes).map_err(|_| serde::de::Error::custom("bad point encoding"))?;
        Option::from(k256::AffinePoint::from_encoded_point(&encoded))
            .map(ProjectivePoint::from)
            .ok_or_else(|| serde::de::Error::custom("point not on curve"))
    }
}
