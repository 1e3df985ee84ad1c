//! Block subsidy schedule. The founders-reward amount itself is always
//! taken from the template (`coinbasetxn.foundersreward`); this module
//! only covers the pool's own output, per §4.1's "`block_subsidy` follows
//! the Zcash halving schedule (constant per era)".

/// Height of the first halving, matching `founders::FIRST_HALVING_BLOCK`.
pub const HALVING_INTERVAL: u64 = 840_000;

/// 12.5 ZEC in zatoshis, the post-slow-start block subsidy.
pub const INITIAL_SUBSIDY_ZATOSHI: u64 = 1_250_000_000;

/// The block subsidy at `height`, halving every [`HALVING_INTERVAL`]
/// blocks and reaching zero after 64 halvings.
pub fn block_subsidy(height: u64) -> u64 {
    let halvings = height / HALVING_INTERVAL;
    if halvings >= 64 {
        return 0;
    }
    INITIAL_SUBSIDY_ZATOSHI >> halvings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_at_expected_height() {
        let before = block_subsidy(HALVING_INTERVAL - 1);
        let after = block_subsidy(HALVING_INTERVAL);
        assert_eq!(before, INITIAL_SUBSIDY_ZATOSHI);
        assert_eq!(after, INITIAL_SUBSIDY_ZATOSHI / 2);
    }

    #[test]
    fn reaches_zero_eventually() {
        assert_eq!(block_subsidy(HALVING_INTERVAL * 64), 0);
    }
}
