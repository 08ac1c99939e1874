//! In-memory token ledger with role-gated supply management.
//!
//! The ledger tracks balances, spending allowances, and two capability
//! roles (minting and burning). Every mutating operation takes the caller
//! address explicitly; the host application decides who the caller is.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// Token quantity in base units. The ledger token uses 18 decimals, so
/// one whole token is 10^18 base units.
pub type Amount = u128;

pub const DECIMALS: u8 = 18;

/// A 20-byte account identifier, displayed as 0x-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address. Never a valid participant; used as the
    /// counterparty on mint and burn transfer records.
    pub const NULL: Address = Address([0u8; 20]);

    pub fn from_hex(raw: &str) -> Result<Self, hex::FromHexError> {
        let stripped = raw.strip_prefix("0x").unwrap_or(raw);
        let bytes = hex::decode(stripped)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }

    pub fn is_null(&self) -> bool {
        *self == Address::NULL
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Address::from_hex(raw)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Capabilities the ledger administrator can delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Minter,
    Burner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Minter => write!(f, "minter"),
            Role::Burner => write!(f, "burner"),
        }
    }
}

/// Journal entry recorded by every ledger mutation. Mints and burns are
/// recorded as transfers against [`Address::NULL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenEvent {
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    RoleGranted {
        role: Role,
        account: Address,
        granted_by: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        revoked_by: Address,
    },
}

/// The token ledger. Balances and allowances are kept sparse; zeroed
/// entries are dropped from the maps.
#[derive(Debug, Clone)]
pub struct TokenLedger {
    name: String,
    symbol: String,
    decimals: u8,
    admin: Address,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    minters: HashSet<Address>,
    burners: HashSet<Address>,
    events: Vec<TokenEvent>,
}

impl TokenLedger {
    pub fn new(name: &str, symbol: &str, admin: Address) -> Result<Self, LedgerError> {
        if admin.is_null() {
            return Err(LedgerError::NullAddress("administrator"));
        }
        Ok(TokenLedger {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: DECIMALS,
            admin,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            minters: HashSet::new(),
            burners: HashSet::new(),
            events: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, who: Address) -> Amount {
        self.balances.get(&who).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.role_set(role).contains(&account)
    }

    /// Iterate over all accounts with a non-zero balance, in no
    /// particular order.
    pub fn holders(&self) -> impl Iterator<Item = (Address, Amount)> + '_ {
        self.balances.iter().map(|(addr, bal)| (*addr, *bal))
    }

    /// Move `amount` from the caller's balance to `to`.
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if caller.is_null() {
            return Err(LedgerError::NullAddress("transfer sender"));
        }
        if to.is_null() {
            return Err(LedgerError::NullAddress("transfer recipient"));
        }
        self.move_value(caller, to, amount)
    }

    /// Set the allowance `spender` may pull from the caller's balance.
    /// An amount of [`Amount::MAX`] is treated as unlimited and is not
    /// drawn down by `transfer_from`.
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if caller.is_null() {
            return Err(LedgerError::NullAddress("approval owner"));
        }
        if spender.is_null() {
            return Err(LedgerError::NullAddress("spender"));
        }
        if amount > 0 {
            self.allowances.insert((caller, spender), amount);
        } else {
            self.allowances.remove(&(caller, spender));
        }
        self.events.push(TokenEvent::Approval {
            owner: caller,
            spender,
            amount,
        });
        Ok(())
    }

    /// Move `amount` from `from` to `to` on the strength of an allowance
    /// previously granted to the caller.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from.is_null() {
            return Err(LedgerError::NullAddress("transfer sender"));
        }
        if to.is_null() {
            return Err(LedgerError::NullAddress("transfer recipient"));
        }
        let allowed = self.allowance(from, caller);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: from,
                spender: caller,
                available: allowed,
                requested: amount,
            });
        }
        self.move_value(from, to, amount)?;
        // Only drawn down after the transfer is known to have succeeded.
        if allowed != Amount::MAX {
            let remaining = allowed - amount;
            if remaining > 0 {
                self.allowances.insert((from, caller), remaining);
            } else {
                self.allowances.remove(&(from, caller));
            }
        }
        Ok(())
    }

    /// Create `amount` new units in `to`'s balance. Caller must hold
    /// [`Role::Minter`].
    pub fn mint(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.require_role(caller, Role::Minter)?;
        if to.is_null() {
            return Err(LedgerError::NullAddress("mint recipient"));
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow)?;
        self.credit(to, amount);
        self.events.push(TokenEvent::Transfer {
            from: Address::NULL,
            to,
            amount,
        });
        trace!("minted {} to {}", amount, to);
        Ok(())
    }

    /// Destroy `amount` units from `from`'s balance. Caller must hold
    /// [`Role::Burner`].
    pub fn burn(
        &mut self,
        caller: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.require_role(caller, Role::Burner)?;
        if from.is_null() {
            return Err(LedgerError::NullAddress("burn source"));
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: from,
                available,
                requested: amount,
            });
        }
        self.debit(from, amount);
        self.total_supply -= amount;
        self.events.push(TokenEvent::Transfer {
            from,
            to: Address::NULL,
            amount,
        });
        trace!("burned {} from {}", amount, from);
        Ok(())
    }

    /// Grant `role` to `account`. Administrator only. Granting a role an
    /// account already holds is a no-op and records no event.
    pub fn grant_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> Result<(), LedgerError> {
        if caller != self.admin {
            return Err(LedgerError::NotAdmin { caller });
        }
        if account.is_null() {
            return Err(LedgerError::NullAddress("role holder"));
        }
        if self.role_set_mut(role).insert(account) {
            debug!("granted {} role to {}", role, account);
            self.events.push(TokenEvent::RoleGranted {
                role,
                account,
                granted_by: caller,
            });
        }
        Ok(())
    }

    /// Revoke `role` from `account`. Administrator only. Revoking a role
    /// the account does not hold is a no-op and records no event.
    pub fn revoke_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> Result<(), LedgerError> {
        if caller != self.admin {
            return Err(LedgerError::NotAdmin { caller });
        }
        if self.role_set_mut(role).remove(&account) {
            debug!("revoked {} role from {}", role, account);
            self.events.push(TokenEvent::RoleRevoked {
                role,
                account,
                revoked_by: caller,
            });
        }
        Ok(())
    }

    /// Recorded events since the last drain, oldest first.
    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<TokenEvent> {
        std::mem::take(&mut self.events)
    }

    fn role_set(&self, role: Role) -> &HashSet<Address> {
        match role {
            Role::Minter => &self.minters,
            Role::Burner => &self.burners,
        }
    }

    fn role_set_mut(&mut self, role: Role) -> &mut HashSet<Address> {
        match role {
            Role::Minter => &mut self.minters,
            Role::Burner => &mut self.burners,
        }
    }

    fn require_role(&self, caller: Address, role: Role) -> Result<(), LedgerError> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(LedgerError::MissingRole { caller, role })
        }
    }

    fn move_value(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: from,
                available,
                requested: amount,
            });
        }
        self.debit(from, amount);
        self.credit(to, amount);
        self.events.push(TokenEvent::Transfer { from, to, amount });
        trace!("transferred {} from {} to {}", amount, from, to);
        Ok(())
    }

    // Caller has already checked the balance covers `amount`.
    fn debit(&mut self, who: Address, amount: Amount) {
        if let Some(balance) = self.balances.get_mut(&who) {
            *balance -= amount;
            if *balance == 0 {
                self.balances.remove(&who);
            }
        }
    }

    fn credit(&mut self, who: Address, amount: Amount) {
        if amount > 0 {
            *self.balances.entry(who).or_insert(0) += amount;
        }
    }
}

impl crate::pool::ValueLedger for TokenLedger {
    fn balance_of(&self, who: Address) -> Amount {
        TokenLedger::balance_of(self, who)
    }

    fn allowance(&self, owner: Address, spender: Address) -> Amount {
        TokenLedger::allowance(self, owner, spender)
    }

    fn total_supply(&self) -> Amount {
        TokenLedger::total_supply(self)
    }

    fn can_mint(&self, who: Address) -> bool {
        self.has_role(Role::Minter, who)
    }

    fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        TokenLedger::transfer(self, caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        TokenLedger::transfer_from(self, caller, from, to, amount)
    }

    fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        TokenLedger::mint(self, caller, to, amount)
    }
}
