//! The durable-store interface the core work pipeline writes through
//! (§6 "Store interface consumed by the core"). Out of scope for the
//! pipeline itself, but a runnable pool binary needs a concrete
//! implementation — this crate provides a JSON-file-backed one in the
//! teacher's style, in place of the production Redis backend the
//! reference implementation uses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod json_store;

pub use json_store::JsonStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single accepted share, as recorded by `write_share`/`write_block`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub login: String,
    pub worker_id: String,
    pub params: Vec<String>,
    pub difficulty: i64,
    pub height: u64,
    /// Unix timestamp (seconds) the record should be purged at, mirroring
    /// the reference pool's hashrate-expiration window.
    pub expiration: u64,
}

/// A block candidate, recorded in addition to the share that found it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub login: String,
    pub worker_id: String,
    pub params: Vec<String>,
    pub share_difficulty: i64,
    pub job_difficulty: i64,
    pub height: u64,
    pub expiration: u64,
    pub fee_reward: i64,
    pub block_hash_hex: String,
}

/// A point-in-time snapshot of an upstream's chain height/difficulty,
/// written on the `proxy.stateUpdateInterval` timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub name: String,
    pub height: u64,
    pub difficulty: String,
}

/// The durable-store contract the share validator and state-update timer
/// write through. `write_share`/`write_block` return whether the record
/// already existed — duplicate-share detection is the store's job, not
/// the validator's (§9 open question (ii)); a duplicate is not an error.
#[async_trait]
pub trait Store: Send + Sync {
    async fn write_share(&self, record: ShareRecord) -> Result<bool, StorageError>;
    async fn write_block(&self, record: BlockRecord) -> Result<bool, StorageError>;
    async fn write_node_state(&self, state: NodeState) -> Result<(), StorageError>;

    async fn shares(&self) -> Result<Vec<ShareRecord>, StorageError>;
    async fn blocks(&self) -> Result<Vec<BlockRecord>, StorageError>;
    async fn node_states(&self) -> Result<Vec<NodeState>, StorageError>;
}
