//! Coinbase transaction construction (§4.1).
//!
//! Builds the Overwinter/Sapling-shaped v4 coinbase transaction a
//! `getblocktemplate` response is turned into: a single BIP-34 height
//! input, a pool-payout output and a conditional founders-reward output.
//! No shielded components are ever produced.

use zecpool_core::Hash256;
use zecpool_crypto::TransparentAddress;
use zecpool_util::{compact_size, sha256d};

use crate::founders::{founders_address_for_height, FIRST_HALVING_BLOCK};
use crate::subsidy::block_subsidy;
use crate::ConsensusError;

const TX_VERSION: u32 = 4;
const OVERWINTER_FLAG: u32 = 0x8000_0000;
const VERSION_GROUP_ID: u32 = 0x892F_2085;

/// A built coinbase transaction: its serialized wire bytes and the
/// double-SHA256 hash of those bytes in natural byte order.
#[derive(Debug, Clone)]
pub struct CoinbaseTx {
    pub bytes: Vec<u8>,
    pub hash: Hash256,
}

/// Serializes the BIP-34 coinbase height script: one length byte `L`,
/// `L` little-endian minimal-bytes of `height`, then a trailing `0x00`.
/// `L = ceil(bit_length(height << 1) / 8)`, which leaves room for the sign
/// bit a plain minimal encoding of `height` itself would need.
pub fn height_script(height: u64) -> Vec<u8> {
    let shifted = (height as u128) << 1;
    let bit_length = if shifted == 0 {
        0
    } else {
        128 - shifted.leading_zeros() as usize
    };
    let byte_len = (bit_length + 7) / 8;
    let le_bytes = height.to_le_bytes();

    let mut script = Vec::with_capacity(byte_len + 2);
    script.push(byte_len as u8);
    script.extend_from_slice(&le_bytes[..byte_len]);
    script.push(0x00);
    script
}

/// Builds the coinbase transaction for `height`, paying `pool_address` the
/// block subsidy plus `fee_reward`, and (while the Founders' Reward is
/// active) the configured rotation address `founders_reward` zatoshi.
pub fn build_coinbase(
    height: u64,
    pool_address: &str,
    founders_reward: u64,
    fee_reward: i64,
) -> Result<CoinbaseTx, ConsensusError> {
    let pool_script = TransparentAddress::decode(pool_address)?.script_pubkey();

    let mut buf = Vec::with_capacity(256);

    let header = OVERWINTER_FLAG | TX_VERSION;
    buf.extend_from_slice(&header.to_le_bytes());
    buf.extend_from_slice(&VERSION_GROUP_ID.to_le_bytes());

    // One input: the null previous outpoint and the BIP-34 height script.
    buf.extend_from_slice(&compact_size(1));
    buf.extend_from_slice(&[0u8; 32]);
    buf.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    let script_sig = height_script(height);
    buf.extend_from_slice(&compact_size(script_sig.len() as u64));
    buf.extend_from_slice(&script_sig);
    buf.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());

    let pays_founders = height < FIRST_HALVING_BLOCK;
    buf.extend_from_slice(&compact_size(if pays_founders { 2 } else { 1 }));

    let pool_value = block_subsidy(height) as i64 + fee_reward;
    buf.extend_from_slice(&(pool_value as u64).to_le_bytes());
    buf.extend_from_slice(&compact_size(pool_script.len() as u64));
    buf.extend_from_slice(&pool_script);

    if pays_founders {
        let address = founders_address_for_height(height)
            .ok_or(ConsensusError::NoFoundersAddress(height))?;
        let founders_script = TransparentAddress::decode(address)?.script_pubkey();
        buf.extend_from_slice(&founders_reward.to_le_bytes());
        buf.extend_from_slice(&compact_size(founders_script.len() as u64));
        buf.extend_from_slice(&founders_script);
    }

    buf.extend_from_slice(&0u32.to_le_bytes()); // lock_time
    buf.extend_from_slice(&0u32.to_le_bytes()); // expiry_height
    buf.extend_from_slice(&0i64.to_le_bytes()); // value_balance
    buf.extend_from_slice(&compact_size(0)); // nShieldedSpend
    buf.extend_from_slice(&compact_size(0)); // nShieldedOutput
    buf.extend_from_slice(&compact_size(0)); // nJoinSplit

    let hash = sha256d(&buf);
    Ok(CoinbaseTx { bytes: buf, hash })
}

#[cfg(test)]
mod tests {
    use super::*;

    // A real t-address, one of the founders rotation entries; stands in
    // for a configured pool address in these tests.
    const TEST_ADDRESS: &str = "t2UNzUUx8mWBCRYPRezvA363EYXyEpHokyi";

    #[test]
    fn height_script_roundtrips_bip34() {
        for height in [0u64, 1, 127, 128, 32767, 32768, 839_999, 1_000_000] {
            let script = height_script(height);
            let len = script[0] as usize;
            assert_eq!(script.len(), len + 2);
            assert_eq!(*script.last().unwrap(), 0x00);

            let mut le = script[1..1 + len].to_vec();
            le.resize(8, 0);
            let decoded = u64::from_le_bytes(le.try_into().unwrap());
            assert_eq!(decoded, height);
        }
    }

    #[test]
    fn pre_halving_coinbase_pays_two_outputs() {
        let coinbase = build_coinbase(100, TEST_ADDRESS, 250_000_000, 1000).unwrap();
        // input count byte sits right after the 8-byte header+group-id.
        assert_eq!(coinbase.bytes[8], 0x01);
        assert_eq!(coinbase.hash.len(), 32);
    }

    #[test]
    fn post_halving_coinbase_has_no_founders_output() {
        let with = build_coinbase(100, TEST_ADDRESS, 250_000_000, 0).unwrap();
        let without = build_coinbase(1_000_000, TEST_ADDRESS, 0, 0).unwrap();
        assert_ne!(with.bytes.len(), without.bytes.len());
    }

    #[test]
    fn rejects_malformed_pool_address() {
        assert!(build_coinbase(100, "not-an-address", 0, 0).is_err());
    }
}
