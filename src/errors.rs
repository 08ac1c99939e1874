//! Error types shared across the ledger and the staking pool.

use thiserror::Error;

use crate::ledger::{Address, Amount, Role};

/// Coarse classification used by callers that only need to know how to
/// react: reject the input, reject the caller, or report the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is malformed or unaffordable: zero amounts, null
    /// addresses, balances or allowances that cannot cover it.
    Validation,
    /// The caller lacks the capability the operation requires.
    Authorization,
    /// The request is well formed but the pool's current state cannot
    /// satisfy it, such as claiming with nothing pending.
    State,
}

/// Failures raised by [`TokenLedger`](crate::ledger::TokenLedger) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("null address is not a valid {0}")]
    NullAddress(&'static str),
    #[error("balance of {holder} is {available}, cannot move {requested}")]
    InsufficientBalance {
        holder: Address,
        available: Amount,
        requested: Amount,
    },
    #[error("allowance granted by {owner} to {spender} is {available}, cannot move {requested}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: Amount,
        requested: Amount,
    },
    #[error("{caller} does not hold the {role} role")]
    MissingRole { caller: Address, role: Role },
    #[error("{caller} is not the ledger administrator")]
    NotAdmin { caller: Address },
    #[error("total supply would overflow")]
    SupplyOverflow,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NullAddress(_)
            | LedgerError::InsufficientBalance { .. }
            | LedgerError::InsufficientAllowance { .. } => ErrorKind::Validation,
            LedgerError::MissingRole { .. } | LedgerError::NotAdmin { .. } => {
                ErrorKind::Authorization
            }
            LedgerError::SupplyOverflow => ErrorKind::State,
        }
    }
}

/// Failures raised by [`RewardPool`](crate::pool::RewardPool) operations.
///
/// Every variant is detected before any state is written, so a returned
/// error always means the pool and the ledger are unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("null address is not a valid {0}")]
    NullAddress(&'static str),
    #[error("daily reward must be positive")]
    ZeroDailyReward,
    #[error("stake amount must be positive")]
    ZeroStake,
    #[error("unstake amount must be positive")]
    ZeroUnstake,
    #[error("{caller} has {staked} staked, cannot release {requested}")]
    InsufficientStake {
        caller: Address,
        staked: Amount,
        requested: Amount,
    },
    #[error("no rewards available to claim")]
    NothingToClaim,
    #[error("no rewards available to compound")]
    NothingToCompound,
    #[error("{caller} is not the pool administrator")]
    NotAdmin { caller: Address },
    #[error("reward accounting overflow")]
    AccumulatorOverflow,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl StakingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StakingError::NullAddress(_)
            | StakingError::ZeroDailyReward
            | StakingError::ZeroStake
            | StakingError::ZeroUnstake => ErrorKind::Validation,
            StakingError::NotAdmin { .. } => ErrorKind::Authorization,
            StakingError::InsufficientStake { .. }
            | StakingError::NothingToClaim
            | StakingError::NothingToCompound
            | StakingError::AccumulatorOverflow => ErrorKind::State,
            StakingError::Ledger(inner) => inner.kind(),
        }
    }
}
