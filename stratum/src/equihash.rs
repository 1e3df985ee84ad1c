//! Equihash(200,9) solution verification (§4.5 step 2, GLOSSARY).
//!
//! CPU-bound; callers on an async runtime should dispatch through
//! `tokio::task::spawn_blocking` rather than calling this inline on a
//! reactor thread (§5, §9 "Equihash verification is CPU-bound").

use log::debug;

/// Zcash mainnet Equihash parameters.
pub const N: u32 = 200;
pub const K: u32 = 9;

/// Verifies `solution` (already stripped of its compact-size length
/// prefix) against `header`, the 140-byte block header including the
/// nonce. A verifier error is not propagated — per §4.5 step 2 it is
/// logged and treated the same as an invalid solution.
pub fn verify(header: &[u8], solution: &[u8]) -> bool {
    match equihash::is_valid_solution(N, K, header, solution) {
        Ok(()) => true,
        Err(err) => {
            debug!("equihash verifier rejected solution: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_input_is_rejected_not_panicking() {
        let header = [0u8; 140];
        let solution = vec![0u8; 1344];
        assert!(!verify(&header, &solution));
    }
}
