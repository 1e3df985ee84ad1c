//! Byte, hex and big-integer target helpers shared across zecpool crates.

use std::time::Duration;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UtilError {
    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("base58 decoding error: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("value oversized: expected at most {expected} bytes, got {got}")]
    Oversized { expected: usize, got: usize },

    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// `2^243 - 1`, the PoW limit used by mainnet-shaped targets in the source pool.
pub fn pow_limit_main() -> BigUint {
    (BigUint::one() << 243u32) - BigUint::one()
}

/// `2^251 - 1`, the PoW limit the reference pool actually computes per-miner
/// targets against (`GetTargetHex` in the original).
pub fn pow_limit_test() -> BigUint {
    (BigUint::one() << 251u32) - BigUint::one()
}

pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, UtilError> {
    Ok(hex::decode(s)?)
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn base58check_to_bytes(s: &str) -> Result<Vec<u8>, UtilError> {
    Ok(bs58::decode(s).with_check(None).into_vec()?)
}

pub fn bytes_to_base58check(version: &[u8], payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(version.len() + payload.len());
    buf.extend_from_slice(version);
    buf.extend_from_slice(payload);
    bs58::encode(buf).with_check().into_string()
}

/// Reverses a byte slice, returning a new buffer. Used throughout for the
/// big-endian/little-endian swaps the Zcash wire format requires.
pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    let mut v = bytes.to_vec();
    v.reverse();
    v
}

pub fn reverse_hex(hex_str: &str) -> Result<String, UtilError> {
    let bytes = hex_to_bytes(hex_str)?;
    Ok(bytes_to_hex(&reversed(&bytes)))
}

/// Double SHA-256, as used for tx hashes, merkle nodes and the block hash.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Parses a hex string into exactly `n` bytes, rejecting longer input. Short
/// input is zero-left-padded, mirroring the reference implementation's
/// `readHex`.
pub fn hex_to_fixed(s: &str, n: usize) -> Result<Vec<u8>, UtilError> {
    if s.len() > 2 * n {
        return Err(UtilError::Oversized {
            expected: n,
            got: s.len() / 2,
        });
    }
    let bytes = hex_to_bytes(s)?;
    if bytes.len() == n {
        return Ok(bytes);
    }
    let mut buf = vec![0u8; n];
    buf[n - bytes.len()..].copy_from_slice(&bytes);
    Ok(buf)
}

pub fn pack_u32_le(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

pub fn pack_u32_be(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn pack_u64_le(v: u64) -> [u8; 8] {
    v.to_le_bytes()
}

/// Bitcoin/Zcash "compact size" varint encoding, used for tx input/output
/// counts and the block's transaction count.
pub fn compact_size(n: u64) -> Vec<u8> {
    if n < 0xfd {
        vec![n as u8]
    } else if n <= 0xffff {
        let mut v = vec![0xfd];
        v.extend_from_slice(&(n as u16).to_le_bytes());
        v
    } else if n <= 0xffff_ffff {
        let mut v = vec![0xfe];
        v.extend_from_slice(&(n as u32).to_le_bytes());
        v
    } else {
        let mut v = vec![0xff];
        v.extend_from_slice(&n.to_le_bytes());
        v
    }
}

/// Converts a 256-bit big-endian hex target string into a `BigUint`.
pub fn target_from_hex(hex_str: &str) -> Result<BigUint, UtilError> {
    let bytes = hex_to_bytes(hex_str)?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Renders a target as a zero-padded, exactly-64-hex-char big-endian string.
pub fn target_to_hex(target: &BigUint) -> String {
    let bytes = target.to_bytes_be();
    let mut buf = vec![0u8; 32];
    if bytes.len() <= 32 {
        buf[32 - bytes.len()..].copy_from_slice(&bytes);
    } else {
        buf.copy_from_slice(&bytes[bytes.len() - 32..]);
    }
    bytes_to_hex(&buf)
}

/// `difficulty = pow_limit / target`. A zero target is treated as the
/// maximum possible difficulty rather than dividing by zero.
pub fn difficulty_from_target(pow_limit: &BigUint, target: &BigUint) -> BigUint {
    if target.is_zero() {
        return pow_limit.clone();
    }
    pow_limit / target
}

/// `target = pow_limit / difficulty`, zero-padded to 32 bytes by the caller
/// via [`target_to_hex`].
pub fn target_from_difficulty(pow_limit: &BigUint, difficulty: u64) -> BigUint {
    if difficulty == 0 {
        return pow_limit.clone();
    }
    pow_limit / BigUint::from(difficulty)
}

/// Interprets a 32-byte hash as a little-endian 256-bit integer: reverse the
/// bytes, then read big-endian. This is the byte order block hashes are
/// compared against targets in.
pub fn hash_le_to_biguint(hash: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_be(&reversed(hash))
}

/// Parses a Go-style duration string (`"30s"`, `"5m"`, `"2h"`, plain seconds
/// with no suffix). Intended only for startup config parsing, where a
/// malformed value is a fatal configuration error — callers should treat
/// `Err` as fatal, not retry.
pub fn parse_duration(s: &str) -> Result<Duration, UtilError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(UtilError::InvalidFormat("empty duration".into()));
    }
    let (num_part, unit) = match s.chars().last() {
        Some(c) if c.is_ascii_digit() => (s, "s"),
        Some('s') => (&s[..s.len() - 1], "s"),
        Some('m') => (&s[..s.len() - 1], "m"),
        Some('h') => (&s[..s.len() - 1], "h"),
        _ => return Err(UtilError::InvalidFormat(format!("unrecognized duration {s}"))),
    };
    let value: f64 = num_part
        .parse()
        .map_err(|_| UtilError::InvalidFormat(format!("unrecognized duration {s}")))?;
    let secs = match unit {
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => unreachable!(),
    };
    Ok(Duration::from_secs_f64(secs))
}

/// Like [`parse_duration`] but aborts the process on failure, matching the
/// reference implementation's `MustParseDuration` and this system's "cannot
/// parse durations at startup" fatal-error category.
pub fn must_parse_duration(s: &str) -> Duration {
    parse_duration(s).unwrap_or_else(|e| panic!("util: can't parse duration `{s}`: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_matches_double_digest() {
        let data = b"zecpool";
        let once = Sha256::digest(data);
        let twice = Sha256::digest(once);
        assert_eq!(sha256d(data), <[u8; 32]>::from(twice));
    }

    #[test]
    fn hex_to_fixed_pads_short_input() {
        let bytes = hex_to_fixed("ff", 4).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0xff]);
    }

    #[test]
    fn hex_to_fixed_rejects_oversized_input() {
        assert!(hex_to_fixed("ffffffffff", 4).is_err());
    }

    #[test]
    fn target_hex_roundtrip_is_64_chars() {
        let pow_limit = pow_limit_test();
        let target = target_from_difficulty(&pow_limit, 1000);
        let hex_str = target_to_hex(&target);
        assert_eq!(hex_str.len(), 64);
        assert_eq!(target_from_hex(&hex_str).unwrap(), target);
    }

    #[test]
    fn difficulty_and_target_invert_within_truncation() {
        let pow_limit = pow_limit_test();
        let diff = 12345u64;
        let target = target_from_difficulty(&pow_limit, diff);
        let back = difficulty_from_target(&pow_limit, &target);
        let delta = if back >= BigUint::from(diff) {
            &back - BigUint::from(diff)
        } else {
            BigUint::from(diff) - &back
        };
        assert!(delta < BigUint::from(2u32));
    }

    #[test]
    fn reverse_hex_flips_byte_order() {
        assert_eq!(reverse_hex("00112233").unwrap(), "33221100");
    }

    #[test]
    fn compact_size_picks_shortest_encoding() {
        assert_eq!(compact_size(1), vec![1]);
        assert_eq!(compact_size(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }
}
