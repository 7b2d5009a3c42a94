//! `accord`: a round-driven threshold signature core.
//!
//! Two protocol families, both built on the same session engine
//! (`rounds`): CGGMP21-style CMP key generation/refresh (`cmp`) over
//! secp256k1, and FROST key generation/signing (`frost`) over either
//! secp256k1 or Edwards25519.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bigint;
pub mod cmp;
pub mod curve;
pub mod error;
pub mod frost;
pub mod paillier;
pub mod params;
pub mod party;
pub mod pedersen;
pub mod rounds;
pub mod sessions;
pub mod sigma;
pub mod tools;

pub use cmp::{CMPConfig, CmpKeygenRound, KeygenMode};
pub use curve::{Curve, CurvePoint, CurveScalar, Edwards25519, Secp256k1};
pub use error::Error;
pub use frost::{FrostConfig, FrostKeygenRound, FrostSignRound, FrostSignature, SignatureVariant};
pub use party::{IdSlice, PartyId};
pub use rounds::{AbortReason, Message, MultiHandler, Round, SessionInfo, Status};
pub use sessions::{make_cmp_keygen_session, make_frost_keygen_session, make_frost_signing_session};
