//! Zcash transparent address decoding and scriptPubKey construction.
//!
//! This is deliberately narrow: no key management, no signing. The pool
//! only ever needs to turn a t-address string into the bytes that belong
//! in a coinbase output, never to hold or use a private key.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("base58check decoding error: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("unrecognized address version prefix {0:02x}{1:02x}")]
    UnknownPrefix(u8, u8),

    #[error("decoded address payload has wrong length: expected 20 bytes, got {0}")]
    WrongLength(usize),
}

/// Mainnet t1... P2PKH prefix.
const MAINNET_PUBKEY_PREFIX: [u8; 2] = [0x1C, 0xB8];
/// Mainnet t3... P2SH prefix.
const MAINNET_SCRIPT_PREFIX: [u8; 2] = [0x1C, 0xBD];
/// Testnet tm... P2PKH prefix.
const TESTNET_PUBKEY_PREFIX: [u8; 2] = [0x1D, 0x25];
/// Testnet t2... P2SH prefix.
const TESTNET_SCRIPT_PREFIX: [u8; 2] = [0x1C, 0xBA];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    PubkeyHash,
    ScriptHash,
}

/// A decoded transparent address: its kind and the 20-byte hash it commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransparentAddress {
    pub kind: AddressKind,
    pub hash: [u8; 20],
}

impl TransparentAddress {
    /// Decodes a base58check-encoded t-address, accepting either mainnet or
    /// testnet prefixes.
    pub fn decode(address: &str) -> Result<Self, AddressError> {
        let decoded = bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(AddressError::Base58)?;
        if decoded.len() != 22 {
            return Err(AddressError::WrongLength(decoded.len().saturating_sub(2)));
        }
        let prefix = [decoded[0], decoded[1]];
        let kind = match prefix {
            p if p == MAINNET_PUBKEY_PREFIX || p == TESTNET_PUBKEY_PREFIX => AddressKind::PubkeyHash,
            p if p == MAINNET_SCRIPT_PREFIX || p == TESTNET_SCRIPT_PREFIX => AddressKind::ScriptHash,
            _ => return Err(AddressError::UnknownPrefix(prefix[0], prefix[1])),
        };
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded[2..]);
        Ok(TransparentAddress { kind, hash })
    }

    /// Builds the scriptPubKey a coinbase output pays this address with:
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG` for a
    /// pubkey-hash address, `OP_HASH160 <hash> OP_EQUAL` for a script-hash
    /// address.
    pub fn script_pubkey(&self) -> Vec<u8> {
        match self.kind {
            AddressKind::PubkeyHash => {
                let mut script = Vec::with_capacity(25);
                script.push(0x76); // OP_DUP
                script.push(0xa9); // OP_HASH160
                script.push(0x14); // push 20 bytes
                script.extend_from_slice(&self.hash);
                script.push(0x88); // OP_EQUALVERIFY
                script.push(0xac); // OP_CHECKSIG
                script
            }
            AddressKind::ScriptHash => {
                let mut script = Vec::with_capacity(23);
                script.push(0xa9); // OP_HASH160
                script.push(0x14); // push 20 bytes
                script.extend_from_slice(&self.hash);
                script.push(0x87); // OP_EQUAL
                script
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_for_test(prefix: [u8; 2], hash: [u8; 20]) -> String {
        let mut buf = Vec::with_capacity(22);
        buf.extend_from_slice(&prefix);
        buf.extend_from_slice(&hash);
        bs58::encode(buf).with_check().into_string()
    }

    #[test]
    fn decodes_known_script_hash_address() {
        // t2UNzUUx8mWBCRYPRezvA363EYXyEpHokyi is one of the founders
        // rotation addresses (founders::FOUNDERS_REWARD_ADDRESSES[0]);
        // its `t2...` prefix is TESTNET_SCRIPT_PREFIX, not a pubkey-hash
        // address.
        let addr = TransparentAddress::decode("t2UNzUUx8mWBCRYPRezvA363EYXyEpHokyi").unwrap();
        assert_eq!(addr.kind, AddressKind::ScriptHash);
        assert_eq!(addr.hash.len(), 20);
    }

    #[test]
    fn decodes_a_pubkey_hash_address() {
        let encoded = encode_for_test(MAINNET_PUBKEY_PREFIX, [0x11; 20]);
        let addr = TransparentAddress::decode(&encoded).unwrap();
        assert_eq!(addr.kind, AddressKind::PubkeyHash);
        assert_eq!(addr.hash, [0x11; 20]);
    }

    #[test]
    fn script_pubkey_has_expected_shape_for_pubkey_hash() {
        let addr = TransparentAddress {
            kind: AddressKind::PubkeyHash,
            hash: [0x11; 20],
        };
        let script = addr.script_pubkey();
        assert_eq!(script.len(), 25);
        assert_eq!(script[0], 0x76);
        assert_eq!(script[1], 0xa9);
        assert_eq!(script[2], 0x14);
        assert_eq!(script[23], 0x88);
        assert_eq!(script[24], 0xac);
    }

    #[test]
    fn rejects_malformed_base58() {
        assert!(TransparentAddress::decode("not-an-address!!!").is_err());
    }
}
