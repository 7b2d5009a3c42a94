//! Pedersen commitment parameters over a Paillier-sized composite modulus.

use crypto_bigint::{BoxedUint, NonZero};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use crate::bigint::{SignedUint, Uint};

/// Public Pedersen parameters `(N, s, t)`: `commit(m, r) = s^m · t^r mod N`
/// over signed integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedersenParams {
    n: Uint,
    s: Uint,
    t: Uint,
}

impl PedersenParams {
    /// Rebuilds Pedersen parameters from their three wire components,
    /// e.g. the `N`/`s`/`t` a peer published during keygen.
    pub fn new(n: Uint, s: Uint, t: Uint) -> Self {
        Self { n, s, t }
    }

    pub fn n(&self) -> &Uint {
        &self.n
    }

    pub fn s(&self) -> &Uint {
        &self.s
    }

    pub fn t(&self) -> &Uint {
        &self.t
    }

    /// `s, t ∈ (Z/NZ)*`, the round-2 well-formedness check.
    pub fn is_well_formed(&self) -> bool {
        let n_odd = crypto_bigint::Odd::new(self.n.clone());
        let Some(n_odd) = Option::from(n_odd) else {
            return false;
        };
        bool::from(self.s.gcd(n_odd.as_ref()).is_one()) && bool::from(self.t.gcd(n_odd.as_ref()).is_one())
    }

    /// `s^m · t^r mod N`, reducing the signed exponents into `Z/NZ` first.
    pub fn commit(&self, m: &SignedUint, r: &SignedUint) -> Uint {
        let modulus = NonZero::new(self.n.clone()).expect("N != 0");
        let s_m = self.s.rem(&modulus).pow_vartime(&m.reduce(&modulus));
        let t_r = self.t.rem(&modulus).pow_vartime(&r.reduce(&modulus));
        s_m.mul_mod(&t_r.rem(&modulus), &modulus)
    }
}

/// The discrete-log trapdoor `λ = log_s(t) mod φ(N)`, known only to the
/// party that generated these parameters.
#[derive(Clone, ZeroizeOnDrop)]
pub struct PedersenSecret {
    #[zeroize(skip)]
    public: PedersenParams,
    lambda: Uint,
    #[zeroize(skip)]
    totient: Uint,
}

impl PedersenSecret {
    /// Builds Pedersen parameters from a Paillier modulus and its known
    /// totient: samples `s` generating the same cyclic subgroup as a
    /// random base, sets `t = s^lambda mod N` for a random `lambda`.
    pub fn generate(rng: &mut impl CryptoRngCore, n: Uint, totient: Uint) -> Self {
        let modulus = NonZero::new(n.clone()).expect("N != 0");
        let r = loop {
            let candidate = BoxedUint::random_mod(rng, &modulus);
            if !bool::from(candidate.is_zero()) {
                break candidate;
            }
        };
        // s = r^2 mod N lands in the quadratic-residue subgroup.
        let s = r.mul_mod(&r, &modulus);
        let totient_nz = NonZero::new(totient.clone()).expect("totient != 0");
        let lambda = BoxedUint::random_mod(rng, &totient_nz);
        let t = s.pow_vartime(&lambda).rem(&modulus);
        Self {
            public: PedersenParams { n, s, t },
            lambda,
            totient,
        }
    }

    pub fn public(&self) -> &PedersenParams {
        &self.public
    }

    pub fn lambda(&self) -> &Uint {
        &self.lambda
    }

    pub fn totient(&self) -> &Uint {
        &self.totient
    }
}

impl core::fmt::Debug for PedersenSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PedersenSecret")
            .field("n", &self.public.n)
            .finish_non_exhaustive()
    }
}
