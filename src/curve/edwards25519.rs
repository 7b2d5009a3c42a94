//! Edwards25519, backed by `curve25519-dalek`.
//!
//! Needed for FROST's Ed25519/Taproot signing variants; contract
//! (wide-reduced scalar construction, 32-byte canonical point encoding)
//! is cross-checked against `pkg/math/curve/edwards25519.go`'s
//! `SetUniformBytes`/`MarshalBinary`.

use alloc::vec::Vec;

use curve25519_dalek::{
    constants::ED25519_BASEPOINT_POINT,
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar as DalekScalar,
    traits::Identity,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::{Curve, CurvePoint, CurveScalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edwards25519;

impl Curve for Edwards25519 {
    type Scalar = Scalar;
    type Point = Point;

    const CURVE_NAME: &'static str = "edwards25519";
    const SECURITY_BITS: u32 = 128;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Zeroize)]
pub struct Scalar(#[serde(with = "scalar_serde")] DalekScalar);

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
        Self(DalekScalar::ZERO)
    }

    fn one() -> Self {
        Self(DalekScalar::ONE)
    }

    fn invert(&self) -> Option<Self> {
        if self.0 == DalekScalar::ZERO {
            return None;
        }
        Some(Self(self.0.invert()))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        let mut repr = [0u8; 32];
        repr.copy_from_slice(bytes);
        Option::from(DalekScalar::from_canonical_bytes(repr)).map(Self)
    }

    fn from_wide_bytes(bytes: &[u8]) -> Self {
        let mut wide = [0u8; 64];
        let n = bytes.len().min(64);
        wide[64 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
        Self(DalekScalar::from_bytes_mod_order_wide(&wide))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point(#[serde(with = "point_serde")] EdwardsPoint);

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
        Self(EdwardsPoint::identity())
    }

    fn generator() -> Self {
        Self(ED25519_BASEPOINT_POINT)
    }

    fn mul_by_generator(scalar: &Self::Scalar) -> Self {
        Self(ED25519_BASEPOINT_POINT * scalar.0)
    }

    fn mul(&self, scalar: &Self::Scalar) -> Self {
        Self(self.0 * scalar.0)
    }

    fn is_identity(&self) -> bool {
        self.0 == EdwardsPoint::identity()
    }

    fn to_compressed(&self) -> Vec<u8> {
        self.0.compress().to_bytes().to_vec()
    }

    fn from_compressed(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        let mut repr = [0u8; 32];
        repr.copy_from_slice(bytes);
        CompressedEdwardsY(repr).decompress().map(Self)
    }
}

mod scalar_serde {
    use curve25519_dalek::scalar::Scalar as DalekScalar;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(s: &DalekScalar, serializer: S) -> Result<S::Ok, S::Error> {
        s.to_bytes().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DalekScalar, D::Error> {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        Option::from(DalekScalar::from_canonical_bytes(bytes))
            .ok_or_else(|| serde::de::Error::custom("scalar out of range"))
    }
}

mod point_serde {
    use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(p: &EdwardsPoint, serializer: S) -> Result<S::Ok, S::Error> {
        p.compress().to_bytes().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EdwardsPoint, D::Error> {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        CompressedEdwardsY(bytes)
            .decompress()
            .ok_or_else(|| serde::de::Error::custom("point not on curve"))
    }
}
