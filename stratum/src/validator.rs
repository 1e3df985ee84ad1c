//! Share validation (§4.5): header assembly, Equihash verification, the
//! block test, the low-difficulty test and the store writes that follow.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use num_bigint::BigUint;
use num_traits::ToPrimitive;

use zecpool_core::Work;
use zecpool_storage::{BlockRecord, ShareRecord, Store};
use zecpool_upstream::UpstreamSupervisor;
use zecpool_util::{bytes_to_hex, compact_size, hash_le_to_biguint, hex_to_fixed, reversed, sha256d};

use crate::assembler::WorkAssembler;
use crate::broadcaster::broadcast_work;
use crate::registry::SessionRegistry;

/// A rejected share, carrying the Stratum error code/message pair to
/// reply with (§6 error codes).
pub struct ShareReject {
    pub code: i32,
    pub message: &'static str,
}

impl ShareReject {
    fn new(code: i32, message: &'static str) -> Self {
        ShareReject { code, message }
    }
}

/// Everything the validator needs besides the submit params themselves.
/// Built fresh per submission from whatever `Work` is current at entry
/// (§4.5: "reads current_work once at entry").
pub struct ShareContext {
    pub work: Arc<Work>,
    pub extranonce1: String,
    pub pool_difficulty: i64,
    pub upstreams: Arc<UpstreamSupervisor>,
    pub store: Arc<dyn Store>,
    pub assembler: Arc<WorkAssembler>,
    pub registry: Arc<SessionRegistry>,
    pub hashrate_expiration: Duration,
}

/// Validates and, if accepted, records one `mining.submit` against
/// `ctx.work`. `params` is the raw 5-element submit array, already
/// checked for length and the ntime/nonce/solution-length patterns by
/// the dispatcher (§4.4); `worker_id` is the request id, already
/// sanitized to `^[0-9a-zA-Z_-]{1,8}$` or defaulted to `"0"`.
pub async fn validate_share(
    ctx: &ShareContext,
    login: &str,
    worker_id: &str,
    params: &[String],
) -> Result<(), ShareReject> {
    let ntime = &params[2];
    let extranonce2 = &params[3];
    let solution_hex = &params[4];

    let header = build_header(&ctx.work, &ctx.extranonce1, ntime, extranonce2)
        .map_err(|_| ShareReject::new(-1, "Invalid params"))?;

    let solution_bytes = hex::decode(solution_hex).map_err(|_| ShareReject::new(-1, "Invalid params"))?;
    if solution_bytes.len() < 3 {
        return Err(ShareReject::new(-1, "Invalid params"));
    }
    let solution_stripped = &solution_bytes[3..];

    let header_for_verify = header.clone();
    let solution_for_verify = solution_stripped.to_vec();
    let valid =
        tokio::task::spawn_blocking(move || crate::equihash::verify(&header_for_verify, &solution_for_verify))
            .await
            .unwrap_or(false);
    if !valid {
        return Err(ShareReject::new(23, "Incorrect solution"));
    }

    let mut header_with_solution = header;
    header_with_solution.extend_from_slice(&solution_bytes);
    let hash_bytes = sha256d(&header_with_solution);
    let hash_value = hash_le_to_biguint(&hash_bytes);

    let expiration = now_unix() + ctx.hashrate_expiration.as_secs();

    if hash_value <= ctx.work.target {
        return handle_block(ctx, login, worker_id, params, &header_with_solution, &hash_bytes, expiration).await;
    }

    if is_low_difficulty(&hash_value, ctx.pool_difficulty) {
        return Err(ShareReject::new(23, "Low difficulty share"));
    }

    let record = ShareRecord {
        login: login.to_string(),
        worker_id: worker_id.to_string(),
        params: params.to_vec(),
        difficulty: ctx.pool_difficulty,
        height: ctx.work.height,
        expiration,
    };
    if let Err(err) = ctx.store.write_share(record).await {
        warn!("failed to persist share for {login}@height {}: {err}", ctx.work.height);
    }
    info!("share accepted from {login} at height {}", ctx.work.height);
    Ok(())
}

async fn handle_block(
    ctx: &ShareContext,
    login: &str,
    worker_id: &str,
    params: &[String],
    header_with_solution: &[u8],
    hash_bytes: &[u8; 32],
    expiration: u64,
) -> Result<(), ShareReject> {
    let mut block_bytes = Vec::with_capacity(header_with_solution.len() + ctx.work.coinbase_bytes.len() + 64);
    block_bytes.extend_from_slice(header_with_solution);
    let tx_count = ctx.work.template.transactions.len() as u64 + 1;
    block_bytes.extend_from_slice(&compact_size(tx_count));
    block_bytes.extend_from_slice(&ctx.work.coinbase_bytes);
    for tx in &ctx.work.template.transactions {
        match hex::decode(&tx.data) {
            Ok(bytes) => block_bytes.extend_from_slice(&bytes),
            Err(_) => return Err(ShareReject::new(23, "Submit block error")),
        }
    }

    let upstream = ctx.upstreams.active();
    if let Err(err) = upstream.submit_block(&bytes_to_hex(&block_bytes)).await {
        error!("submitblock failed at height {}: {err}", ctx.work.height);
        return Err(ShareReject::new(23, "Submit block error"));
    }

    info!("block found at height {} by {login}", ctx.work.height);
    if let Some(new_work) = ctx.assembler.refresh().await {
        broadcast_work(&ctx.registry, &new_work).await;
    }

    let block_hash_hex = bytes_to_hex(&reversed(hash_bytes));
    let job_difficulty = ctx.work.difficulty.to_i64().unwrap_or(i64::MAX);
    let record = BlockRecord {
        login: login.to_string(),
        worker_id: worker_id.to_string(),
        params: params.to_vec(),
        share_difficulty: ctx.pool_difficulty,
        job_difficulty,
        height: ctx.work.height,
        expiration,
        fee_reward: ctx.work.template.total_fee_reward(),
        block_hash_hex,
    };
    if let Err(err) = ctx.store.write_block(record).await {
        warn!("failed to persist block at height {}: {err}", ctx.work.height);
    }
    Ok(())
}

/// §4.5 step 1: `version || prev_hash_reversed || merkle_root_reversed ||
/// sapling_root_reversed || ntime || bits_reversed || extranonce1 ||
/// extranonce2`, 140 bytes total.
fn build_header(work: &Work, extranonce1: &str, ntime: &str, extranonce2: &str) -> Result<Vec<u8>, zecpool_util::UtilError> {
    let mut header = Vec::with_capacity(140);
    header.extend_from_slice(&hex::decode(&work.version_le_hex).map_err(|e| zecpool_util::UtilError::Hex(e))?);
    header.extend_from_slice(&hex::decode(&work.prev_hash_reversed_hex).map_err(|e| zecpool_util::UtilError::Hex(e))?);
    header.extend_from_slice(&hex::decode(&work.merkle_root_reversed_hex).map_err(|e| zecpool_util::UtilError::Hex(e))?);
    header.extend_from_slice(&hex::decode(&work.sapling_root_reversed_hex).map_err(|e| zecpool_util::UtilError::Hex(e))?);
    header.extend_from_slice(&hex_to_fixed(ntime, 4)?);
    header.extend_from_slice(&hex::decode(&work.bits_reversed_hex).map_err(|e| zecpool_util::UtilError::Hex(e))?);
    header.extend_from_slice(&hex_to_fixed(extranonce1, 4)?);
    header.extend_from_slice(&hex_to_fixed(extranonce2, 28)?);
    Ok(header)
}

/// Rejects (low difficulty) when `pow_limit < pool_difficulty * hash`,
/// the truncation-free integer form of the source's `big.Rat` comparison
/// `(PowLimit/hash) / pool_difficulty >= 1` (see DESIGN.md).
fn is_low_difficulty(hash_value: &BigUint, pool_difficulty: i64) -> bool {
    let pow_limit = zecpool_util::pow_limit_test();
    let difficulty = BigUint::from(pool_difficulty.max(0) as u64);
    pow_limit < difficulty * hash_value
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_hash_against_low_difficulty_is_rejected() {
        let hash = zecpool_util::pow_limit_test();
        assert!(is_low_difficulty(&hash, 1));
    }

    #[test]
    fn zero_hash_always_meets_difficulty() {
        let hash = BigUint::from(0u8);
        assert!(!is_low_difficulty(&hash, 1_000_000));
    }
}
