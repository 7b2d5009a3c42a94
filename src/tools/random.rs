//! RNG helpers shared by every protocol round.

use rand_core::{CryptoRng, RngCore};

use crate::curve::CurveScalar;

/// A uniformly random scalar, via wide-reduction of 64 random bytes —
/// avoids rejection-sampling loops and biases negligibly.
pub fn random_scalar<S: CurveScalar>(rng: &mut (impl RngCore + CryptoRng)) -> S {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    S::from_wide_bytes(&bytes)
}

/// A random 32-byte value, used for `rid`/`chain_key` contributions and
/// blinding nonces.
pub fn random_bytes32(rng: &mut (impl RngCore + CryptoRng)) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    bytes
}
