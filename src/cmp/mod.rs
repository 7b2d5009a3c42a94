//! CMP key generation / refresh.

pub mod config;
pub mod keygen;

pub use config::{CMPConfig, Public};
pub use keygen::{CmpKeygenRound, KeygenMode};
