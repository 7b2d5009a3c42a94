//! Security parameters shared by the CMP and FROST protocol families.
//!
//! Constants are carried over verbatim from `common/params/params.go`.

/// Security parameter constants, selected by the caller per session.
///
/// A single `SchemeParams` trait supplies these constants to the CGGMP21
/// rounds; `accord` reuses the same trait shape for FROST as well, since
/// both protocol families need the same statistical/ZK slack constants.
pub trait SchemeParams: 'static + Send + Sync + Clone {
    /// Symmetric security parameter, in bits (`SecParam` in `params.go`).
    const SEC_PARAM: u32 = 256;
    /// Symmetric security parameter, in bytes.
    const SEC_BYTES: usize = 32;
    /// Parameter for the oblivious-transfer-based sub-protocols, in bits.
    const OT_PARAM: u32 = 128;
    /// Statistical security parameter, in bits (`StatParam`).
    const STAT_PARAM: u32 = 80;
    /// Range-proof slack exponent `L`.
    const L: u32 = 256;
    /// Range-proof slack exponent `L'`.
    const L_PRIME: u32 = 1280;
    /// Range-proof slack exponent `epsilon`.
    const EPSILON: u32 = 512;
    /// `L + epsilon`.
    const L_PLUS_EPSILON: u32 = Self::L + Self::EPSILON;
    /// `L' + epsilon`.
    const L_PRIME_PLUS_EPSILON: u32 = Self::L_PRIME + Self::EPSILON;
    /// Bit length of the Paillier/Pedersen RSA-like modulus `N`.
    const BITS_INT_MOD_N: u32 = 2048;
    /// Byte length of `N`.
    const BYTES_INT_MOD_N: usize = 256;
    /// Bit length of each Blum prime factor of `N`.
    const BITS_BLUM_PRIME: u32 = 1024;
    /// Bit length of a Paillier modulus.
    const BITS_PAILLIER: u32 = 2048;
    /// Byte length of a Paillier modulus.
    const BYTES_PAILLIER: usize = 256;
    /// Byte length of a Paillier ciphertext (`N^2`).
    const BYTES_CIPHERTEXT: usize = 512;

    /// A human-readable name, absorbed into every transcript hash so that
    /// sessions run under different parameter sets can never collide.
    const PARAMS_NAME: &'static str;
}

/// Production-strength parameters, matching `common/params/params.go`'s
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionParams;

impl SchemeParams for ProductionParams {
    const PARAMS_NAME: &'static str = "accord/production";
}

/// Shrunk parameters for fast tests: same trait, smaller constants,
/// never used outside `#[cfg(test)]`/dev-dependency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSchemeParams;

impl SchemeParams for TestSchemeParams {
    const SEC_PARAM: u32 = 64;
    const SEC_BYTES: usize = 8;
    const OT_PARAM: u32 = 32;
    const STAT_PARAM: u32 = 10;
    const L: u32 = 64;
    const L_PRIME: u32 = 320;
    const EPSILON: u32 = 128;
    const BITS_INT_MOD_N: u32 = 512;
    const BYTES_INT_MOD_N: usize = 64;
    const BITS_BLUM_PRIME: u32 = 256;
    const BITS_PAILLIER: u32 = 512;
    const BYTES_PAILLIER: usize = 64;
    const BYTES_CIPHERTEXT: usize = 128;

    const PARAMS_NAME: &'static str = "accord/test";
}
