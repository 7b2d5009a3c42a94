//! FROST key generation and threshold signing.

pub mod config;
pub mod keygen;
pub mod sign;

pub use config::FrostConfig;
pub use keygen::FrostKeygenRound;
pub use sign::{FrostSignRound, FrostSignature, SignatureVariant};
