//! zk-prm: proof that Pedersen parameters `(N, s, t)` generate the same
//! cyclic subgroup of `(Z/NZ)*`, i.e. that the prover knows `λ = log_s(t)`.
//!
//! A `STAT_PARAM`-round Fiat–Shamir sigma protocol: for each round the
//! prover commits `A_i = s^{a_i}`, the verifier's challenge bit selects
//! whether the response reveals `a_i` alone or `a_i + λ`, and checks
//! `s^{z_i} == A_i · t^{e_i} mod N`.

use alloc::vec::Vec;

use crypto_bigint::{BoxedUint, NonZero};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::bigint::Uint;
use crate::params::SchemeParams;
use crate::pedersen::{PedersenParams, PedersenSecret};
use crate::tools::hashing::Hash;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrmProof {
    commitments: Vec<Uint>,
    responses: Vec<Uint>,
}

impl PrmProof {
    pub fn prove<P: SchemeParams>(
        rng: &mut impl CryptoRngCore,
        secret: &PedersenSecret,
        transcript: Hash,
    ) -> Self {
        let n = secret.public().n();
        let totient_nz = NonZero::new(secret.totient().clone()).expect("phi(N) != 0");
        let n_nz = NonZero::new(n.clone()).expect("N != 0");

        let mut commitments = Vec::with_capacity(P::STAT_PARAM as usize);
        let mut nonces = Vec::with_capacity(P::STAT_PARAM as usize);
        for _ in 0..P::STAT_PARAM {
            let a = BoxedUint::random_mod(rng, &totient_nz);
            let commitment = secret.public().s().rem(&n_nz).pow_vartime(&a).rem(&n_nz);
            nonces.push(a);
            commitments.push(commitment);
        }

        let challenge = challenge_bits::<P>(secret.public(), &commitments, transcript);
        let responses = nonces
            .iter()
            .zip(challenge.iter())
            .map(|(a, &bit)| {
                if bit {
                    a.add_mod(secret.lambda(), &totient_nz)
                } else {
                    a.clone()
                }
            })
            .collect();

        Self {
            commitments,
            responses,
        }
    }

    pub fn verify<P: SchemeParams>(&self, public: &PedersenParams, transcript: Hash) -> bool {
        if !public.is_well_formed() {
            return false;
        }
        if self.commitments.len() != P::STAT_PARAM as usize || self.responses.len() != P::STAT_PARAM as usize {
            return false;
        }
        let n_nz = match NonZero::new(public.n().clone()) {
            Some(m) => m,
            None => return false,
        };
        let challenge = challenge_bits::<P>(public, &self.commitments, transcript);

        for ((commitment, response), bit) in self.commitments.iter().zip(self.responses.iter()).zip(challenge.iter())
        {
            let lhs = public.s().rem(&n_nz).pow_vartime(response).rem(&n_nz);
            let rhs = if *bit {
                commitment.mul_mod(&public.t().rem(&n_nz), &n_nz)
            } else {
                commitment.clone()
            };
            if lhs != rhs {
                return false;
            }
        }
        true
    }
}

fn challenge_bits<P: SchemeParams>(public: &PedersenParams, commitments: &[Uint], transcript: Hash) -> Vec<bool> {
    let mut hash = transcript
        .chain_bytes(&public.n().to_be_bytes())
        .chain_bytes(&public.s().to_be_bytes())
        .chain_bytes(&public.t().to_be_bytes());
    for commitment in commitments {
        hash = hash.chain_bytes(&commitment.to_be_bytes());
    }
    let digest = hash.finalize();
    (0..P::STAT_PARAM)
        .map(|i| {
            let byte = digest[(i as usize / 8) % digest.len()];
            (byte >> (i % 8)) & 1 == 1
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paillier::SecretKey;
    use crate::params::TestSchemeParams;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn proves_and_verifies_shared_subgroup() {
        let mut rng = ChaCha8Rng::seed_from_u64(60);
        let paillier = SecretKey::random::<TestSchemeParams>(&mut rng);
        let secret = PedersenSecret::generate(&mut rng, paillier.public_key().n().clone(), paillier.totient());
        let transcript = Hash::new_with_dst("test");

        let proof = PrmProof::prove::<TestSchemeParams>(&mut rng, &secret, transcript.clone());
        assert!(proof.verify::<TestSchemeParams>(secret.public(), transcript));
    }

    #[test]
    fn rejects_mismatched_parameters() {
        let mut rng = ChaCha8Rng::seed_from_u64(61);
        let paillier = SecretKey::random::<TestSchemeParams>(&mut rng);
        let secret = PedersenSecret::generate(&mut rng, paillier.public_key().n().clone(), paillier.totient());
        let other_paillier = SecretKey::random::<TestSchemeParams>(&mut rng);
        let other = PedersenSecret::generate(&mut rng, other_paillier.public_key().n().clone(), other_paillier.totient());
        let transcript = Hash::new_with_dst("test");

        let proof = PrmProof::prove::<TestSchemeParams>(&mut rng, &secret, transcript.clone());
        assert!(!proof.verify::<TestSchemeParams>(other.public(), transcript));
    }
}
