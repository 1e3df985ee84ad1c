//! Stratum session handling, work assembly and share validation.
//!
//! This crate owns everything downstream of "we have an active upstream":
//! polling it for block templates, turning a template into miner-facing
//! work, running the Stratum v1 listener, and validating submitted shares
//! against the currently published work.

use thiserror::Error;

pub mod assembler;
pub mod broadcaster;
pub mod dispatcher;
pub mod equihash;
pub mod extranonce;
pub mod pool;
pub mod registry;
pub mod session;
pub mod validator;

pub use assembler::WorkAssembler;
pub use extranonce::ExtraNonceCounter;
pub use pool::{run, Pool};
pub use registry::SessionRegistry;
pub use session::Session;

#[derive(Debug, Error)]
pub enum StratumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
