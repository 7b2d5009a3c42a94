//! ECDSA/Schnorr signature encodings.
//!
//! The compact `(r, s)` form is the default wire format; DER and
//! Ethereum `r ∥ s ∥ v` are offered on request, following
//! `pkg/ecdsa/signature.go`.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{secp256k1, CurveScalar};

/// A 2-of-(r, s) signature over secp256k1, with an optional recovery id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub r: secp256k1::Scalar,
    pub s: secp256k1::Scalar,
    pub recovery_id: Option<u8>,
}

impl Signature {
    /// The 64-byte compact `r ∥ s` encoding, the default wire format.
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r.to_bytes());
        out[32..].copy_from_slice(&self.s.to_bytes());
        out
    }

    pub fn from_compact(bytes: &[u8; 64]) -> Option<Self> {
        let r = secp256k1::Scalar::from_bytes(&bytes[..32])?;
        let s = secp256k1::Scalar::from_bytes(&bytes[32..])?;
        Some(Self {
            r,
            s,
            recovery_id: None,
        })
    }

    /// Minimal DER encoding of `(r, s)` as a `SEQUENCE { INTEGER, INTEGER }`.
    pub fn to_der(&self) -> Vec<u8> {
        let mut body = Vec::new();
        encode_der_integer(&self.r.to_bytes(), &mut body);
        encode_der_integer(&self.s.to_bytes(), &mut body);
        let mut out = Vec::with_capacity(body.len() + 2);
        out.push(0x30);
        encode_der_length(body.len(), &mut out);
        out.extend_from_slice(&body);
        out
    }

    /// Ethereum-style `r ∥ s ∥ v`, with `v` the recovery id plus 27,
    /// requiring low-`s` normalization to have happened already.
    pub fn to_eth(&self) -> Option<[u8; 65]> {
        let recovery_id = self.recovery_id?;
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r.to_bytes());
        out[32..64].copy_from_slice(&self.s.to_bytes());
        out[64] = recovery_id + 27;
        Some(out)
    }
}

fn encode_der_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
        let significant = &bytes[first_nonzero..];
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(significant);
    }
}

fn encode_der_integer(be_bytes: &[u8], out: &mut Vec<u8>) {
    let mut trimmed = be_bytes;
    while trimmed.len() > 1 && trimmed[0] == 0 {
        trimmed = &trimmed[1..];
    }
    let needs_pad = trimmed[0] & 0x80 != 0;
    out.push(0x02);
    encode_der_length(trimmed.len() + usize::from(needs_pad), out);
    if needs_pad {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
}
