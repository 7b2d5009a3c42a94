//! The domain-separated transcript hasher.
//!
//! Grounded on the `signed_message::message_hash` / `Hash::new_with_dst`
//! pattern: every absorbed value is length-prefixed so
//! that `H(a, b)` and `H(a ∥ b)` never collide, and every hash starts from
//! a domain-separation tag so structurally distinct objects (a `Config`
//! vs a `Public`) never land in the same hash space even if their byte
//! contents happen to coincide.

use alloc::vec::Vec;

use sha2::{Digest, Sha256, Sha512};
use sha3::Keccak256;

/// A 32-byte hash output, used for commitments, `rid`/`chain_key`
/// contributions, and the transcript hash `H`.
pub type HashOutput = [u8; 32];

/// A running, domain-separated hash.
///
/// Cloning forks the running state, which is exactly how the transcript
/// hash derives per-party child hashes `H_j = H ∥ j`: clone `H`, then
/// chain `j`'s bytes into the clone.
#[derive(Clone)]
pub struct Hash(Keccak256);

impl Hash {
    /// Starts a fresh hash under a domain-separation tag, e.g.
    /// `"CMP Config"` or `"Public Data"`.
    pub fn new_with_dst(dst: &str) -> Self {
        let mut inner = Keccak256::new();
        inner.update((dst.len() as u64).to_be_bytes());
        inner.update(dst.as_bytes());
        Self(inner)
    }

    /// Absorbs a length-prefixed byte string.
    pub fn chain_bytes(mut self, bytes: &[u8]) -> Self {
        self.0.update((bytes.len() as u64).to_be_bytes());
        self.0.update(bytes);
        self
    }

    /// Absorbs anything implementing [`Hashable`].
    pub fn chain<T: Hashable>(self, value: &T) -> Self {
        value.hash_into(self)
    }

    pub fn finalize(self) -> HashOutput {
        self.0.finalize().into()
    }

    /// Finalizes into a wide (64-byte) digest suitable for
    /// `CurveScalar::from_wide_bytes`, avoiding rejection sampling when
    /// deriving a scalar challenge (Fiat–Shamir, FROST binding factors).
    pub fn finalize_wide(self, extra_dst: &str) -> [u8; 64] {
        let first: HashOutput = self.0.finalize().into();
        let mut wide = Sha512::new();
        wide.update(extra_dst.as_bytes());
        wide.update(first);
        wide.finalize().into()
    }
}

/// Something that can be absorbed into a transcript hash.
pub trait Hashable {
    fn hash_into(&self, hash: Hash) -> Hash;
}

impl Hashable for [u8] {
    fn hash_into(&self, hash: Hash) -> Hash {
        hash.chain_bytes(self)
    }
}

impl Hashable for HashOutput {
    fn hash_into(&self, hash: Hash) -> Hash {
        hash.chain_bytes(self)
    }
}

impl Hashable for str {
    fn hash_into(&self, hash: Hash) -> Hash {
        hash.chain_bytes(self.as_bytes())
    }
}

impl Hashable for u32 {
    fn hash_into(&self, hash: Hash) -> Hash {
        hash.chain_bytes(&self.to_be_bytes())
    }
}

impl<T: Hashable> Hashable for [T] {
    fn hash_into(&self, mut hash: Hash) -> Hash {
        hash = hash.chain_bytes(&(self.len() as u64).to_be_bytes());
        for item in self {
            hash = hash.chain(item);
        }
        hash
    }
}

impl<T: Hashable> Hashable for Vec<T> {
    fn hash_into(&self, hash: Hash) -> Hash {
        self.as_slice().hash_into(hash)
    }
}

/// A plain, non-transcript SHA-256, used for hash-commitments (round-1
/// CMP `V_i`) where no running domain-separated state is needed.
pub fn sha256(bytes: &[u8]) -> HashOutput {
    Sha256::digest(bytes).into()
}
