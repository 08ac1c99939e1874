//! Fixed-point arithmetic for reward accounting.
//!
//! All reward math is integer-only. Intermediates are widened to 256 bits
//! so that scaling by [`ONE`] can never overflow; narrowing back to
//! [`Amount`] is checked. Division always rounds down.

use uint::construct_uint;

use crate::errors::StakingError;
use crate::ledger::Amount;

construct_uint! {
    /// 256-bit unsigned integer for widened multiply-divide intermediates.
    pub struct U256(4);
}

/// Per-share accumulator scale factor, 10^18.
pub const ONE: Amount = 1_000_000_000_000_000_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Floor of `a * b / denom` computed without intermediate overflow.
/// `denom` must be non-zero.
pub fn mul_div(a: Amount, b: Amount, denom: Amount) -> Result<Amount, StakingError> {
    narrow(U256::from(a) * U256::from(b) / U256::from(denom))
}

/// Growth of the per-share accumulator over a window of `elapsed` seconds
/// at `daily_reward` tokens per day shared across `total_staked` units.
/// The result is scaled by [`ONE`] and rounded down. `total_staked` must
/// be non-zero; windows with an empty pool are skipped by the caller.
pub fn per_share_increment(
    daily_reward: Amount,
    elapsed: u64,
    total_staked: Amount,
) -> Result<Amount, StakingError> {
    let numerator = U256::from(daily_reward) * U256::from(elapsed) * U256::from(ONE);
    let denominator = U256::from(SECONDS_PER_DAY) * U256::from(total_staked);
    narrow(numerator / denominator)
}

/// Convert a whole-token count to base units.
pub const fn whole(tokens: u64) -> Amount {
    tokens as Amount * ONE
}

fn narrow(wide: U256) -> Result<Amount, StakingError> {
    if wide.bits() > 128 {
        return Err(StakingError::AccumulatorOverflow);
    }
    Ok(wide.low_u128())
}
