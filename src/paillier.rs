//! Paillier key generation, encryption and decryption.
//!
//! `keygen()` samples two safe primes of `BITS_BLUM_PRIME` bits each (so
//! `N` is a Blum integer, `p ≡ q ≡ 3 mod 4`, required by zk-mod);
//! `encrypt(m, r) = (1+N)^m · r^N mod N^2`; `decrypt` rejects
//! ciphertexts outside `[1, N^2)`.

use alloc::vec::Vec;

use crypto_bigint::{BoxedUint, NonZero, Odd};
use crypto_primes::generate_safe_prime;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::bigint::Uint;
use crate::params::SchemeParams;

/// `N`, plus `N^2` precomputed since every encryption/decryption needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    n: Uint,
    n2: Uint,
}

impl PublicKey {
    /// Rebuilds a public key from just `N`, recomputing `N^2` — the wire
    /// encoding of a party's Paillier key only ever carries `N` itself.
    pub fn from_n(n: Uint) -> Self {
        let n2 = &n * &n;
        Self { n, n2 }
    }

    pub fn n(&self) -> &Uint {
        &self.n
    }

    pub fn n_squared(&self) -> &Uint {
        &self.n2
    }

    /// `N >= 2^(8*BYTES_INT_MOD_N - 1)` and odd, the round-2 well-formedness
    /// check.
    pub fn is_well_formed<P: SchemeParams>(&self) -> bool {
        bool::from(self.n.is_odd()) && self.n.bits() >= P::BITS_INT_MOD_N - 1
    }

    /// `(1+N)^m · r^N mod N^2`, using `(1+N)^m = 1 + m*N mod N^2` (the
    /// standard Paillier optimization, since `(1+N)^m`'s binomial
    /// expansion collapses mod `N^2`).
    pub fn encrypt_with_randomizer(&self, m: &Uint, r: &Uint) -> Uint {
        let n2 = NonZero::new(self.n2.clone()).expect("N^2 != 0");
        let one_plus_mn = (BoxedUint::one_with_precision(self.n2.bits()) + &(m * &self.n)).rem(&n2);
        let r_pow_n = r.rem(&n2).pow_vartime(&self.n);
        one_plus_mn.mul_mod(&r_pow_n.rem(&n2), &n2)
    }

    /// Homomorphic addition of two ciphertexts.
    pub fn add(&self, c1: &Uint, c2: &Uint) -> Uint {
        let n2 = NonZero::new(self.n2.clone()).expect("N^2 != 0");
        c1.mul_mod(c2, &n2)
    }

    /// Homomorphic scalar multiplication of a ciphertext by a plaintext.
    pub fn mul_plain(&self, c: &Uint, scalar: &Uint) -> Uint {
        let n2 = NonZero::new(self.n2.clone()).expect("N^2 != 0");
        c.rem(&n2).pow_vartime(scalar).rem(&n2)
    }
}

/// The factorization of `N`, known only to its owner.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct SecretKey {
    p: Uint,
    q: Uint,
    #[zeroize(skip)]
    public: PublicKey,
}

impl SecretKey {
    /// Samples two `BITS_BLUM_PRIME`-bit safe primes and assembles the
    /// Paillier key pair.
    pub fn random<P: SchemeParams>(rng: &mut impl CryptoRngCore) -> Self {
        let p: Uint = generate_safe_prime(rng, Some(P::BITS_BLUM_PRIME as usize));
        let q: Uint = generate_safe_prime(rng, Some(P::BITS_BLUM_PRIME as usize));
        let n = &p * &q;
        let n2 = &n * &n;
        Self {
            p,
            q,
            public: PublicKey { n, n2 },
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn p(&self) -> &Uint {
        &self.p
    }

    pub fn q(&self) -> &Uint {
        &self.q
    }

    /// Euler's totient `(p-1)(q-1)`, used by `decrypt`, by zk-mod/zk-fac
    /// as the group order of `(Z/NZ)*`, and by keygen to derive this
    /// party's Pedersen trapdoor from the same modulus.
    pub fn totient(&self) -> Uint {
        let p_minus_1 = self.p.checked_sub(&BoxedUint::one()).expect("p > 1");
        let q_minus_1 = self.q.checked_sub(&BoxedUint::one()).expect("q > 1");
        &p_minus_1 * &q_minus_1
    }

    /// Decrypts `c`, rejecting ciphertexts outside `[1, N^2)`.
    pub fn decrypt(&self, c: &Uint) -> Option<Uint> {
        if bool::from(c.is_zero()) || *c >= self.public.n2 {
            return None;
        }
        let n2 = NonZero::new(self.public.n2.clone())?;
        let phi = self.totient();
        let phi_inv = phi.inv_mod(&NonZero::new(self.public.n.clone())?)?;

        let c_pow_phi = c.rem(&n2).pow_vartime(&phi);
        let n_nz = NonZero::new(self.public.n.clone())?;
        let l = {
            let minus_one = c_pow_phi
                .checked_sub(&BoxedUint::one_with_precision(c_pow_phi.bits_precision()))
                .expect("c^phi has been range-checked to be >= 1 by construction");
            minus_one.div_rem(&n_nz).0
        };
        Some(l.mul_mod(&phi_inv, &n_nz))
    }
}

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretKey").field("n", &self.public.n).finish_non_exhaustive()
    }
}

/// A fresh randomizer `r` for a Paillier encryption, uniform in
/// `(Z/NZ)*`.
pub fn random_randomizer(rng: &mut impl CryptoRngCore, public: &PublicKey) -> Uint {
    let n_odd = Odd::new(public.n.clone()).expect("N is odd");
    loop {
        let candidate = BoxedUint::random_mod(rng, &NonZero::new(public.n.clone()).expect("N != 0"));
        if bool::from(candidate.gcd(n_odd.as_ref()).is_one()) {
            return candidate;
        }
    }
}

/// Encrypts `m`, sampling a fresh randomizer and returning both.
pub fn encrypt(rng: &mut impl CryptoRngCore, public: &PublicKey, m: &Uint) -> (Uint, Uint) {
    let r = random_randomizer(rng, public);
    let c = public.encrypt_with_randomizer(m, &r);
    (c, r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TestSchemeParams;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sk = SecretKey::random::<TestSchemeParams>(&mut rng);
        let m = BoxedUint::from(42u64).widen(sk.public.n.bits_precision());
        let (c, _r) = encrypt(&mut rng, &sk.public, &m);
        let decrypted = sk.decrypt(&c).unwrap();
        assert_eq!(decrypted.to_string(), m.to_string());
    }

    #[test]
    fn homomorphic_addition() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let sk = SecretKey::random::<TestSchemeParams>(&mut rng);
        let precision = sk.public.n.bits_precision();
        let m1 = BoxedUint::from(7u64).widen(precision);
        let m2 = BoxedUint::from(35u64).widen(precision);
        let (c1, _) = encrypt(&mut rng, &sk.public, &m1);
        let (c2, _) = encrypt(&mut rng, &sk.public, &m2);
        let summed = sk.public.add(&c1, &c2);
        let decrypted = sk.decrypt(&summed).unwrap();
        assert_eq!(decrypted.to_string(), BoxedUint::from(42u64).widen(precision).to_string());
    }
}
