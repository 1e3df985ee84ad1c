//! Work assembler (§4.3): polls the active upstream for a block template
//! and, when it names a new chain tip, derives and publishes a new `Work`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::{error, info, warn};
use thiserror::Error;

use zecpool_consensus::{build_coinbase, merkle_root, ConsensusError};
use zecpool_core::{BlockTemplate, Work};
use zecpool_upstream::UpstreamSupervisor;
use zecpool_util::{
    bytes_to_hex, difficulty_from_target, hex_to_fixed, pack_u32_le, pow_limit_test, reversed,
    target_from_hex, UtilError,
};

#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("building coinbase: {0}")]
    Coinbase(#[from] ConsensusError),

    #[error("decoding template field: {0}")]
    Decode(#[from] UtilError),
}

/// Owns the single "current work" pointer and knows how to refresh it
/// from whatever upstream is currently active. Cheap to clone: the
/// pointer itself is `Arc`-backed.
pub struct WorkAssembler {
    upstreams: Arc<UpstreamSupervisor>,
    pool_address: String,
    current: ArcSwapOption<Work>,
    next_job_id: AtomicU64,
}

impl WorkAssembler {
    pub fn new(upstreams: Arc<UpstreamSupervisor>, pool_address: String) -> Self {
        WorkAssembler {
            upstreams,
            pool_address,
            current: ArcSwapOption::from(None),
            next_job_id: AtomicU64::new(1),
        }
    }

    /// A snapshot of whatever work is current. Readers take this once per
    /// operation (§5); a later replacement does not affect an in-flight
    /// caller holding this `Arc`.
    pub fn current(&self) -> Option<Arc<Work>> {
        self.current.load_full()
    }

    /// Fetches a template from the active upstream and, if its previous
    /// block hash differs from the current work's, builds and publishes
    /// a new one. Returns the new work iff one was published, so the
    /// caller knows whether to broadcast (§4.3 step 10).
    pub async fn refresh(&self) -> Option<Arc<Work>> {
        let upstream = self.upstreams.active();
        let template = match upstream.get_block_template().await {
            Ok(template) => template,
            Err(err) => {
                warn!("work assembler: fetching template from {}: {err}", upstream.name);
                return None;
            }
        };

        if let Some(current) = self.current.load_full() {
            if current.template.previous_block_hash == template.previous_block_hash {
                return None;
            }
        }

        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        match build_work(&template, &self.pool_address, job_id) {
            Ok(work) => {
                let work = Arc::new(work);
                self.current.store(Some(work.clone()));
                info!("new work at height {} (job {})", work.height, work.job_id);
                Some(work)
            }
            Err(err) => {
                error!("work assembler: building work for height {}: {err}", template.height);
                None
            }
        }
    }
}

/// §4.3 steps 3-9: sum fees, build the coinbase, build the merkle root,
/// derive the target/difficulty and pre-encode every wire-ready field.
fn build_work(template: &BlockTemplate, pool_address: &str, job_id: u64) -> Result<Work, AssemblerError> {
    let fee_reward = template.total_fee_reward();
    let coinbase = build_coinbase(
        template.height,
        pool_address,
        template.coinbase_txn.founders_reward,
        fee_reward,
    )?;

    let mut hashes = Vec::with_capacity(template.transactions.len() + 1);
    hashes.push(coinbase.hash);
    for tx in &template.transactions {
        let natural = reversed(&hex_to_fixed(&tx.hash, 32)?);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&natural);
        hashes.push(hash);
    }
    let root = merkle_root(&hashes);

    let mut prev_hash_natural = [0u8; 32];
    prev_hash_natural.copy_from_slice(&hex_to_fixed(&template.previous_block_hash, 32)?);
    let sapling_root = hex_to_fixed(&template.final_sapling_root_hash, 32)?;
    let bits = hex_to_fixed(&template.bits, 4)?;

    let target = target_from_hex(&template.target)?;
    // Per-job difficulty is derived against PowLimitTest, matching the
    // source pool's actual runtime behaviour (SPEC_FULL.md supplemental
    // feature 7), not the mainnet PoW limit.
    let difficulty = difficulty_from_target(&pow_limit_test(), &target);

    Ok(Work {
        job_id: format!("{:x}", job_id),
        version_le_hex: bytes_to_hex(&pack_u32_le(template.version)),
        prev_hash_reversed_hex: bytes_to_hex(&reversed(&prev_hash_natural)),
        merkle_root_reversed_hex: bytes_to_hex(&reversed(&root)),
        sapling_root_reversed_hex: bytes_to_hex(&reversed(&sapling_root)),
        curtime_le_hex: bytes_to_hex(&pack_u32_le(template.curtime)),
        bits_reversed_hex: bytes_to_hex(&reversed(&bits)),
        prev_hash_natural,
        coinbase_bytes: coinbase.bytes,
        coinbase_hash: coinbase.hash,
        target,
        difficulty,
        height: template.height,
        clean_jobs: true,
        template: template.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zecpool_core::{CoinbaseMeta, TemplateTransaction};

    const POOL_ADDRESS: &str = "t2UNzUUx8mWBCRYPRezvA363EYXyEpHokyi";

    fn template() -> BlockTemplate {
        BlockTemplate {
            version: 4,
            previous_block_hash: "00".repeat(32),
            final_sapling_root_hash: "11".repeat(32),
            transactions: vec![TemplateTransaction {
                data: "deadbeef".to_string(),
                hash: "22".repeat(32),
                fee: 1000,
            }],
            coinbase_txn: CoinbaseMeta { founders_reward: 625_000_00 },
            long_poll_id: String::new(),
            target: "00".to_string() + &"ff".repeat(31),
            min_time: 0,
            nonce_range: String::new(),
            sigop_limit: 0,
            size_limit: 0,
            curtime: 1_700_000_000,
            bits: "1d00ffff".to_string(),
            height: 100,
        }
    }

    #[test]
    fn builds_a_work_with_64_char_header_fields() {
        let work = build_work(&template(), POOL_ADDRESS, 1).unwrap();
        assert_eq!(work.version_le_hex.len(), 8);
        assert_eq!(work.prev_hash_reversed_hex.len(), 64);
        assert_eq!(work.merkle_root_reversed_hex.len(), 64);
        assert_eq!(work.bits_reversed_hex.len(), 8);
        assert_eq!(work.height, 100);
        assert!(work.clean_jobs);
    }

    #[test]
    fn single_transaction_template_roots_over_coinbase_and_one_tx() {
        let with_tx = build_work(&template(), POOL_ADDRESS, 1).unwrap();
        let mut empty = template();
        empty.transactions.clear();
        let without_tx = build_work(&empty, POOL_ADDRESS, 1).unwrap();
        assert_ne!(with_tx.merkle_root_reversed_hex, without_tx.merkle_root_reversed_hex);
    }
}
