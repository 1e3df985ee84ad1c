//! `Work`: the immutable, pool-internal record derived from one block
//! template. Only one `Work` is ever "current"; replacement is atomic and
//! handled by the work assembler (`zecpool-stratum::assembler`), not here.

use num_bigint::BigUint;

use crate::template::BlockTemplate;
use crate::Hash256;

/// Header fields pre-encoded in the byte order the wire format and the
/// `mining.notify` push both expect, so the hot paths never re-derive them.
#[derive(Debug, Clone)]
pub struct Work {
    /// Hex-encoded, process-unique, monotonically increasing job identifier.
    pub job_id: String,

    pub version_le_hex: String,
    pub prev_hash_reversed_hex: String,
    pub merkle_root_reversed_hex: String,
    pub sapling_root_reversed_hex: String,
    pub curtime_le_hex: String,
    pub bits_reversed_hex: String,

    /// Natural (non-reversed) byte order, used when re-deriving the prev
    /// hash comparison in the work assembler.
    pub prev_hash_natural: Hash256,

    pub coinbase_bytes: Vec<u8>,
    pub coinbase_hash: Hash256,

    pub target: BigUint,
    pub difficulty: BigUint,

    pub height: u64,
    pub clean_jobs: bool,

    /// The template this work was derived from, retained so the share
    /// validator can assemble a full block (coinbase + every template tx)
    /// on a block-finding share without re-fetching anything.
    pub template: BlockTemplate,
}

impl Work {
    /// The tuple pushed as `mining.notify`'s params.
    pub fn notify_params(&self) -> Vec<serde_json::Value> {
        vec![
            serde_json::Value::String(self.job_id.clone()),
            serde_json::Value::String(self.version_le_hex.clone()),
            serde_json::Value::String(self.prev_hash_reversed_hex.clone()),
            serde_json::Value::String(self.merkle_root_reversed_hex.clone()),
            serde_json::Value::String(self.sapling_root_reversed_hex.clone()),
            serde_json::Value::String(self.curtime_le_hex.clone()),
            serde_json::Value::String(self.bits_reversed_hex.clone()),
            serde_json::Value::Bool(self.clean_jobs),
        ]
    }
}
