//! Coinbase construction, merkle building and the subsidy/founders-reward
//! schedule for zecpool (§4.1, §4.3 steps 3-7).
//!
//! This crate has no notion of proof-of-work verification or difficulty
//! adjustment — Equihash verification lives in `zecpool-stratum`, and
//! target/difficulty conversion is plain arithmetic in `zecpool-util` that
//! this crate re-exports for convenience.

use thiserror::Error;

pub mod coinbase;
pub mod founders;
pub mod merkle;
pub mod subsidy;

pub use coinbase::{build_coinbase, height_script, CoinbaseTx};
pub use founders::{founders_address_for_height, FIRST_HALVING_BLOCK};
pub use merkle::merkle_root;
pub use subsidy::block_subsidy;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("coinbase pool or founders address: {0}")]
    Address(#[from] zecpool_crypto::AddressError),

    #[error("no founders-reward address configured for height {0}")]
    NoFoundersAddress(u64),
}
