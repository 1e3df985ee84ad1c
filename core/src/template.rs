//! The block template as handed back by `getblocktemplate`.

use serde::{Deserialize, Serialize};

/// One transaction already in the mempool, as included in a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateTransaction {
    /// Raw serialized transaction bytes, hex-encoded.
    pub data: String,
    /// Transaction hash, big-endian hex, as returned by the node.
    pub hash: String,
    /// Fee paid by this transaction, in zatoshis.
    #[serde(default)]
    pub fee: i64,
}

/// The `coinbasetxn` member of the template response; only the founders
/// reward amount is consumed by the coinbase builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinbaseMeta {
    #[serde(rename = "foundersreward", default)]
    pub founders_reward: u64,
}

/// A block template fetched from the active upstream. Immutable once
/// constructed; the work assembler derives a [`crate::Work`] from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub version: u32,
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: String,
    #[serde(rename = "finalsaplingroothash")]
    pub final_sapling_root_hash: String,
    pub transactions: Vec<TemplateTransaction>,
    #[serde(rename = "coinbasetxn")]
    pub coinbase_txn: CoinbaseMeta,
    #[serde(rename = "longpollid", default)]
    pub long_poll_id: String,
    pub target: String,
    #[serde(rename = "mintime", default)]
    pub min_time: u32,
    #[serde(rename = "noncerange", default)]
    pub nonce_range: String,
    #[serde(rename = "sigoplimit", default)]
    pub sigop_limit: u32,
    #[serde(rename = "sizelimit", default)]
    pub size_limit: u32,
    pub curtime: u32,
    pub bits: String,
    pub height: u64,
}

impl BlockTemplate {
    /// Sum of every included transaction's fee, in zatoshis — the reward
    /// the coinbase builder adds on top of the block subsidy.
    pub fn total_fee_reward(&self) -> i64 {
        self.transactions.iter().map(|tx| tx.fee).sum()
    }
}
