//! Fiat–Shamir zero-knowledge proofs.

pub mod aff_g;
pub mod enc;
pub mod fac;
pub mod log_star;
pub mod mod_proof;
pub mod prm;
pub mod sch;

pub use aff_g::AffGProof;
pub use enc::EncProof;
pub use fac::FacProof;
pub use log_star::LogStarProof;
pub use mod_proof::ModProof;
pub use prm::PrmProof;
pub use sch::SchProof;
