//! Time-weighted staking pool with proportional reward distribution.
//!
//! A fixed daily reward budget is shared continuously among everyone with
//! stake in the pool, in proportion to stake size and to how long it stays
//! staked. Accounting is O(1) per operation: a pool-wide per-share
//! accumulator advances as time passes, and each position records the
//! accumulator level it was last settled against. The difference between
//! the two, times the position's stake, is exactly what the position has
//! earned since.
//!
//! The pool never touches balances itself. Value moves through a
//! [`ValueLedger`], with every precondition checked before the first
//! write so a failed operation leaves both pool and ledger untouched.

pub mod math;

use std::collections::HashMap;

use log::{info, trace};
use serde::Serialize;

use crate::errors::{LedgerError, StakingError};
use crate::ledger::{Address, Amount, Role};
use math::{mul_div, per_share_increment, ONE};

pub type Timestamp = u64;

/// Value-movement operations the pool requires from its host ledger.
///
/// [`TokenLedger`](crate::ledger::TokenLedger) implements this. The
/// `can_mint` and `total_supply` accessors exist so the pool can refuse a
/// claim or compound before mutating anything, rather than discovering a
/// missing capability halfway through.
pub trait ValueLedger {
    fn balance_of(&self, who: Address) -> Amount;
    fn allowance(&self, owner: Address, spender: Address) -> Amount;
    fn total_supply(&self) -> Amount;
    fn can_mint(&self, who: Address) -> bool;
    fn transfer(&mut self, caller: Address, to: Address, amount: Amount)
        -> Result<(), LedgerError>;
    fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;
    fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), LedgerError>;
}

/// One participant's stake and reward state.
///
/// A position is created at zero on first touch and persists for the
/// lifetime of the pool; stake can drop to zero and come back without
/// losing an unclaimed `pending_reward`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    /// Units currently staked.
    pub staked_amount: Amount,
    /// Accumulator level this position was last settled against.
    pub reward_debt: Amount,
    /// Realized but unclaimed reward.
    pub pending_reward: Amount,
}

/// Journal entry recorded once per successful mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PoolEvent {
    DailyRewardChanged { rate: Amount },
    Staked { account: Address, amount: Amount },
    Unstaked { account: Address, amount: Amount },
    Restaked { account: Address, amount: Amount },
    RewardsClaimed { account: Address, amount: Amount },
}

// Accumulator and pending-reward values computed against a target time,
// applied only after every fallible step has passed.
#[derive(Debug, Clone, Copy)]
struct Settlement {
    accumulator: Amount,
    pending: Amount,
}

/// The staking pool aggregate: scalar accrual state plus every
/// participant position, keyed by address.
#[derive(Debug, Clone)]
pub struct RewardPool {
    token_address: Address,
    pool_address: Address,
    admin: Address,
    daily_reward: Amount,
    /// Sum of all positions' `staked_amount`. Bounded by the ledger's
    /// total supply, which is overflow-checked at mint.
    total_staked: Amount,
    accumulated_reward_per_share: Amount,
    last_accrual_time: Timestamp,
    positions: HashMap<Address, Position>,
    events: Vec<PoolEvent>,
}

impl RewardPool {
    /// Open a pool against the token ledger at `token_address`. Staked
    /// tokens are held in custody under `pool_address`, which must also
    /// hold the ledger's minter capability for claims and compounding.
    pub fn new(
        token_address: Address,
        pool_address: Address,
        admin: Address,
        daily_reward: Amount,
        now: Timestamp,
    ) -> Result<Self, StakingError> {
        if token_address.is_null() {
            return Err(StakingError::NullAddress("token ledger address"));
        }
        if pool_address.is_null() {
            return Err(StakingError::NullAddress("pool custody address"));
        }
        if admin.is_null() {
            return Err(StakingError::NullAddress("pool administrator"));
        }
        if daily_reward == 0 {
            return Err(StakingError::ZeroDailyReward);
        }
        info!(
            "reward pool opened at {} with daily reward {}",
            now, daily_reward
        );
        Ok(RewardPool {
            token_address,
            pool_address,
            admin,
            daily_reward,
            total_staked: 0,
            accumulated_reward_per_share: 0,
            last_accrual_time: now,
            positions: HashMap::new(),
            events: Vec::new(),
        })
    }

    pub fn token_address(&self) -> Address {
        self.token_address
    }

    pub fn pool_address(&self) -> Address {
        self.pool_address
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn daily_reward(&self) -> Amount {
        self.daily_reward
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn accumulated_reward_per_share(&self) -> Amount {
        self.accumulated_reward_per_share
    }

    pub fn last_accrual_time(&self) -> Timestamp {
        self.last_accrual_time
    }

    pub fn stake_of(&self, account: Address) -> Amount {
        self.positions
            .get(&account)
            .map(|position| position.staked_amount)
            .unwrap_or(0)
    }

    /// Settled-but-unclaimed reward. Does not include growth since the
    /// position's last settlement; see [`accumulated_reward_of`] for the
    /// claimable total.
    ///
    /// [`accumulated_reward_of`]: RewardPool::accumulated_reward_of
    pub fn pending_reward_of(&self, account: Address) -> Amount {
        self.positions
            .get(&account)
            .map(|position| position.pending_reward)
            .unwrap_or(0)
    }

    pub fn position(&self, account: Address) -> Option<&Position> {
        self.positions.get(&account)
    }

    /// Iterate over every known position, in no particular order.
    pub fn participants(&self) -> impl Iterator<Item = (Address, &Position)> + '_ {
        self.positions.iter().map(|(addr, position)| (*addr, position))
    }

    /// What `account` could claim at `now`, including accrual that has
    /// not been folded into the position yet. Read-only.
    pub fn accumulated_reward_of(
        &self,
        account: Address,
        now: Timestamp,
    ) -> Result<Amount, StakingError> {
        Ok(self.prepare_settlement(account, now)?.pending)
    }

    /// Advance the pool accumulator to `now`.
    ///
    /// Idempotent: a timestamp at or before the last accrual is a no-op.
    /// Time that elapses while the pool is empty is skipped entirely; the
    /// reward budget for such a window is forfeited, not banked.
    pub fn settle_pool(&mut self, now: Timestamp) -> Result<(), StakingError> {
        let accumulator = self.preview_accumulator(now)?;
        self.accumulated_reward_per_share = accumulator;
        if now > self.last_accrual_time {
            self.last_accrual_time = now;
        }
        Ok(())
    }

    /// Advance the pool to `now`, then fold the accumulator growth since
    /// `account`'s last settlement into its pending reward.
    pub fn settle_position(
        &mut self,
        account: Address,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        let settlement = self.prepare_settlement(account, now)?;
        self.commit_settlement(account, now, settlement);
        Ok(())
    }

    /// Replace the daily reward budget. Administrator only.
    ///
    /// The window elapsed under the old rate is settled first, so the new
    /// rate applies strictly from `now` forward.
    pub fn set_daily_reward(
        &mut self,
        caller: Address,
        rate: Amount,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        if caller != self.admin {
            return Err(StakingError::NotAdmin { caller });
        }
        if rate == 0 {
            return Err(StakingError::ZeroDailyReward);
        }
        self.settle_pool(now)?;
        self.daily_reward = rate;
        self.events.push(PoolEvent::DailyRewardChanged { rate });
        info!("daily reward set to {} at {}", rate, now);
        Ok(())
    }

    /// Stake `amount` tokens. The tokens move from the caller's balance
    /// into pool custody; the caller must have granted the custody
    /// address an allowance covering `amount`.
    pub fn stake<L: ValueLedger>(
        &mut self,
        ledger: &mut L,
        caller: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroStake);
        }
        let balance = ledger.balance_of(caller);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: caller,
                available: balance,
                requested: amount,
            }
            .into());
        }
        let allowed = ledger.allowance(caller, self.pool_address);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: caller,
                spender: self.pool_address,
                available: allowed,
                requested: amount,
            }
            .into());
        }
        let settlement = self.prepare_settlement(caller, now)?;
        let position = self.commit_settlement(caller, now, settlement);
        position.staked_amount += amount;
        self.total_staked += amount;
        ledger.transfer_from(self.pool_address, caller, self.pool_address, amount)?;
        self.events.push(PoolEvent::Staked {
            account: caller,
            amount,
        });
        info!("{} staked {} at {}", caller, amount, now);
        Ok(())
    }

    /// Release `amount` staked tokens back to the caller. Pending reward
    /// is untouched; claiming is a separate operation.
    pub fn unstake<L: ValueLedger>(
        &mut self,
        ledger: &mut L,
        caller: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroUnstake);
        }
        let staked = self.stake_of(caller);
        if staked < amount {
            return Err(StakingError::InsufficientStake {
                caller,
                staked,
                requested: amount,
            });
        }
        let settlement = self.prepare_settlement(caller, now)?;
        let position = self.commit_settlement(caller, now, settlement);
        position.staked_amount -= amount;
        self.total_staked -= amount;
        ledger.transfer(self.pool_address, caller, amount)?;
        self.events.push(PoolEvent::Unstaked {
            account: caller,
            amount,
        });
        info!("{} unstaked {} at {}", caller, amount, now);
        Ok(())
    }

    /// Compound the caller's pending reward into staked principal. The
    /// reward is minted straight into pool custody; the caller's token
    /// balance is unaffected. Returns the compounded amount.
    pub fn restake<L: ValueLedger>(
        &mut self,
        ledger: &mut L,
        caller: Address,
        now: Timestamp,
    ) -> Result<Amount, StakingError> {
        let settlement = self.prepare_settlement(caller, now)?;
        if settlement.pending == 0 {
            return Err(StakingError::NothingToCompound);
        }
        let amount = settlement.pending;
        self.check_mintable(ledger, amount)?;
        let position = self.commit_settlement(caller, now, settlement);
        position.pending_reward = 0;
        position.staked_amount += amount;
        self.total_staked += amount;
        ledger.mint(self.pool_address, self.pool_address, amount)?;
        self.events.push(PoolEvent::Restaked {
            account: caller,
            amount,
        });
        info!("{} compounded {} at {}", caller, amount, now);
        Ok(amount)
    }

    /// Pay out the caller's pending reward, minting it directly to the
    /// caller's balance. Stake is untouched. Returns the paid amount.
    pub fn claim_rewards<L: ValueLedger>(
        &mut self,
        ledger: &mut L,
        caller: Address,
        now: Timestamp,
    ) -> Result<Amount, StakingError> {
        let settlement = self.prepare_settlement(caller, now)?;
        if settlement.pending == 0 {
            return Err(StakingError::NothingToClaim);
        }
        let amount = settlement.pending;
        self.check_mintable(ledger, amount)?;
        let position = self.commit_settlement(caller, now, settlement);
        position.pending_reward = 0;
        ledger.mint(self.pool_address, caller, amount)?;
        self.events.push(PoolEvent::RewardsClaimed {
            account: caller,
            amount,
        });
        info!("{} claimed {} at {}", caller, amount, now);
        Ok(amount)
    }

    /// Recorded events since the last drain, oldest first.
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    // The accumulator value settling to `now` would produce, without
    // writing it.
    fn preview_accumulator(&self, now: Timestamp) -> Result<Amount, StakingError> {
        if now <= self.last_accrual_time || self.total_staked == 0 {
            return Ok(self.accumulated_reward_per_share);
        }
        let elapsed = now - self.last_accrual_time;
        let increment = per_share_increment(self.daily_reward, elapsed, self.total_staked)?;
        self.accumulated_reward_per_share
            .checked_add(increment)
            .ok_or(StakingError::AccumulatorOverflow)
    }

    // Compute the settlement for `account` at `now` without mutating
    // anything. Commit separately once all other checks have passed.
    fn prepare_settlement(
        &self,
        account: Address,
        now: Timestamp,
    ) -> Result<Settlement, StakingError> {
        let accumulator = self.preview_accumulator(now)?;
        let pending = match self.positions.get(&account) {
            Some(position) if position.staked_amount > 0 && accumulator > position.reward_debt => {
                let owed = mul_div(
                    position.staked_amount,
                    accumulator - position.reward_debt,
                    ONE,
                )?;
                position
                    .pending_reward
                    .checked_add(owed)
                    .ok_or(StakingError::AccumulatorOverflow)?
            }
            Some(position) => position.pending_reward,
            None => 0,
        };
        Ok(Settlement {
            accumulator,
            pending,
        })
    }

    // Infallible write phase of settlement. Creates the position on
    // first touch.
    fn commit_settlement(
        &mut self,
        account: Address,
        now: Timestamp,
        settlement: Settlement,
    ) -> &mut Position {
        self.accumulated_reward_per_share = settlement.accumulator;
        if now > self.last_accrual_time {
            self.last_accrual_time = now;
        }
        let position = self.positions.entry(account).or_default();
        position.pending_reward = settlement.pending;
        position.reward_debt = settlement.accumulator;
        trace!("settled {} at {}: pending {}", account, now, settlement.pending);
        position
    }

    // Refuse early if minting `amount` from the custody address would be
    // rejected by the ledger.
    fn check_mintable<L: ValueLedger>(
        &self,
        ledger: &L,
        amount: Amount,
    ) -> Result<(), StakingError> {
        if !ledger.can_mint(self.pool_address) {
            return Err(LedgerError::MissingRole {
                caller: self.pool_address,
                role: Role::Minter,
            }
            .into());
        }
        if ledger.total_supply().checked_add(amount).is_none() {
            return Err(LedgerError::SupplyOverflow.into());
        }
        Ok(())
    }
}
