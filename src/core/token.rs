//! Synthetic USD token.
//!
//! This module implements the synthetic asset the engine mints:
//! - The [`SyntheticAsset`] interface the engine calls
//! - Owner-gated minting and burning
//! - Balances, allowances and transfers
//! - Supply management

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::*;
use crate::utils::math::safe_add;

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTHETIC ASSET INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Ledger of the synthetic asset, as seen by the engine
///
/// State-changing calls report success as a boolean. `false` means the call
/// had no effect.
pub trait SyntheticAsset: Send + Sync {
    /// Create `amount` new units for `to`; only the owner may mint
    fn mint(&self, caller: &Address, to: &Address, amount: u128) -> bool;

    /// Destroy `amount` units held by `caller`; only the owner may burn
    fn burn(&self, caller: &Address, amount: u128) -> bool;

    /// Move `amount` from `from` to `to` using `spender`'s allowance
    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128)
        -> bool;

    /// Move `amount` from `from` to `to`
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> bool;

    /// Balance of `owner`
    fn balance_of(&self, owner: &Address) -> u128;

    /// Units in circulation
    fn total_supply(&self) -> u128;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Type of token operation for event logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenOperation {
    /// New units created by the owner
    Mint,
    /// Units destroyed by the owner
    Burn,
    /// Transfer between accounts
    Transfer,
    /// Allowance granted
    Approve,
    /// Minting rights handed over
    OwnershipTransferred,
}

/// Record of a token operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEvent {
    /// Position in the token's history
    pub sequence: u64,
    /// Type of operation
    pub operation: TokenOperation,
    /// Sender (None for mint)
    pub from: Option<Address>,
    /// Recipient (None for burn)
    pub to: Option<Address>,
    /// Amount in base units
    pub amount: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Plain token state with fallible operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    /// Holder of minting rights
    owner: Address,
    /// Total supply
    total_supply: u128,
    /// Balances by holder
    balances: BTreeMap<Address, u128>,
    /// Allowances by owner, then spender
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
    /// Recent events
    events: VecDeque<TokenEvent>,
    /// Maximum events to keep in memory
    max_events: usize,
    /// Next event sequence number
    next_sequence: u64,
}

impl TokenLedger {
    /// Create an empty ledger whose minting rights belong to `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            name: SYNTHETIC_NAME.to_string(),
            symbol: SYNTHETIC_SYMBOL.to_string(),
            decimals: SYNTHETIC_DECIMALS,
            owner,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            events: VecDeque::new(),
            max_events: MAX_TOKEN_EVENTS,
            next_sequence: 0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUPPLY MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Holder of minting rights
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Get total supply
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Get balance of an address
    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Mint new tokens (owner only)
    pub fn mint(&mut self, caller: &Address, to: Address, amount: u128) -> Result<()> {
        self.ensure_owner(caller)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        if to.is_zero() {
            return Err(Error::InvalidParameter {
                name: "to".into(),
                reason: "cannot mint to the null address".into(),
            });
        }

        let new_supply = safe_add(self.total_supply, amount)?;
        let new_balance = safe_add(self.balance_of(&to), amount)?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;

        self.add_event(TokenOperation::Mint, None, Some(to), amount);
        Ok(())
    }

    /// Burn tokens held by the owner (owner only)
    pub fn burn(&mut self, caller: &Address, amount: u128) -> Result<()> {
        self.ensure_owner(caller)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }

        let balance = self.balance_of(caller);
        if balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: balance,
            });
        }

        self.set_balance(*caller, balance - amount);
        self.total_supply = self.total_supply.saturating_sub(amount);

        self.add_event(TokenOperation::Burn, Some(*caller), None, amount);
        Ok(())
    }

    /// Transfer tokens between accounts
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        if to.is_zero() {
            return Err(Error::InvalidParameter {
                name: "to".into(),
                reason: "cannot transfer to the null address".into(),
            });
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: from_balance,
            });
        }

        if from == to {
            return Ok(());
        }

        let to_balance = safe_add(self.balance_of(&to), amount)?;
        self.set_balance(from, from_balance - amount);
        self.balances.insert(to, to_balance);

        self.add_event(TokenOperation::Transfer, Some(from), Some(to), amount);
        Ok(())
    }

    /// Transfer on behalf of `from`, consuming `spender`'s allowance
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        if *spender == from {
            return self.transfer(from, to, amount);
        }

        let allowance = self.allowance(&from, spender);
        if allowance < amount {
            return Err(Error::InsufficientAllowance {
                required: amount,
                available: allowance,
            });
        }

        self.transfer(from, to, amount)?;
        if allowance != u128::MAX {
            self.set_allowance(from, *spender, allowance - amount);
        }
        Ok(())
    }

    /// Allow `spender` to move up to `amount` of `owner`'s tokens
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) -> Result<()> {
        if spender.is_zero() {
            return Err(Error::InvalidParameter {
                name: "spender".into(),
                reason: "cannot approve the null address".into(),
            });
        }
        self.set_allowance(owner, spender, amount);
        self.add_event(TokenOperation::Approve, Some(owner), Some(spender), amount);
        Ok(())
    }

    /// Remaining allowance of `spender` over `owner`'s tokens
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Hand minting rights to `new_owner` (owner only)
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(Error::InvalidParameter {
                name: "new_owner".into(),
                reason: "cannot hand ownership to the null address".into(),
            });
        }
        self.owner = new_owner;
        self.add_event(
            TokenOperation::OwnershipTransferred,
            Some(*caller),
            Some(new_owner),
            0,
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Verify supply invariant (total_supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, balance| acc.checked_add(*balance));
        sum == Some(self.total_supply)
    }

    /// Get recent events, oldest first
    pub fn recent_events(&self) -> Vec<TokenEvent> {
        self.events.iter().cloned().collect()
    }

    /// Get events for a specific address
    pub fn events_for_address(&self, address: &Address) -> Vec<TokenEvent> {
        self.events
            .iter()
            .filter(|e| e.from.as_ref() == Some(address) || e.to.as_ref() == Some(address))
            .cloned()
            .collect()
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Hash of supply and balances
    pub fn state_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.total_supply.to_be_bytes());
        for (holder, balance) in &self.balances {
            hasher.update(holder.as_bytes());
            hasher.update(balance.to_be_bytes());
        }
        hasher.finalize().into()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the token owner",
                caller.short()
            )));
        }
        Ok(())
    }

    fn set_balance(&mut self, holder: Address, balance: u128) {
        if balance == 0 {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, balance);
        }
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: u128) {
        let spenders = self.allowances.entry(owner).or_default();
        if amount == 0 {
            spenders.remove(&spender);
        } else {
            spenders.insert(spender, amount);
        }
        if spenders.is_empty() {
            self.allowances.remove(&owner);
        }
    }

    /// Add an event (with pruning)
    fn add_event(
        &mut self,
        operation: TokenOperation,
        from: Option<Address>,
        to: Option<Address>,
        amount: u128,
    ) {
        self.events.push_back(TokenEvent {
            sequence: self.next_sequence,
            operation,
            from,
            to,
            amount,
        });
        self.next_sequence += 1;

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STABLE TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// Shareable synthetic USD token backed by a [`TokenLedger`]
#[derive(Debug)]
pub struct StableToken {
    /// Contract identifier of the token
    id: Address,
    /// Token state
    state: RwLock<TokenLedger>,
}

impl StableToken {
    /// Create a token whose minting rights belong to `owner`
    pub fn new(id: Address, owner: Address) -> Self {
        Self {
            id,
            state: RwLock::new(TokenLedger::new(owner)),
        }
    }

    /// Restore a token from a saved ledger
    pub fn from_ledger(id: Address, ledger: TokenLedger) -> Self {
        Self {
            id,
            state: RwLock::new(ledger),
        }
    }

    /// Contract identifier of the token
    pub fn id(&self) -> Address {
        self.id
    }

    /// Holder of minting rights
    pub fn owner(&self) -> Result<Address> {
        Ok(self.read()?.owner())
    }

    /// Allow `spender` to move up to `amount` of `owner`'s tokens
    pub fn approve(&self, owner: &Address, spender: &Address, amount: u128) -> Result<()> {
        self.write()?.approve(*owner, *spender, amount)
    }

    /// Remaining allowance of `spender` over `owner`'s tokens
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.read().map(|s| s.allowance(owner, spender)).unwrap_or(0)
    }

    /// Hand minting rights to `new_owner`
    pub fn transfer_ownership(&self, caller: &Address, new_owner: &Address) -> Result<()> {
        self.write()?.transfer_ownership(caller, *new_owner)
    }

    /// Verify total supply equals the sum of balances
    pub fn verify_supply_invariant(&self) -> bool {
        self.read()
            .map(|s| s.verify_supply_invariant())
            .unwrap_or(false)
    }

    /// Recent token events, oldest first
    pub fn recent_events(&self) -> Vec<TokenEvent> {
        self.read().map(|s| s.recent_events()).unwrap_or_default()
    }

    /// Copy of the current ledger
    pub fn ledger(&self) -> Result<TokenLedger> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, TokenLedger>> {
        self.state.read().map_err(|_| Error::Lock)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, TokenLedger>> {
        self.state.write().map_err(|_| Error::Lock)
    }

    fn apply(&self, operation: &str, f: impl FnOnce(&mut TokenLedger) -> Result<()>) -> bool {
        let result = self.write().and_then(|mut state| f(&mut state));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(token = %self.id.short(), "{} rejected: {}", operation, e);
                false
            }
        }
    }
}

impl SyntheticAsset for StableToken {
    fn mint(&self, caller: &Address, to: &Address, amount: u128) -> bool {
        self.apply("mint", |s| s.mint(caller, *to, amount))
    }

    fn burn(&self, caller: &Address, amount: u128) -> bool {
        self.apply("burn", |s| s.burn(caller, amount))
    }

    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> bool {
        self.apply("transfer_from", |s| s.transfer_from(spender, *from, *to, amount))
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> bool {
        self.apply("transfer", |s| s.transfer(*from, *to, amount))
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.read().map(|s| s.balance_of(owner)).unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.read().map(|s| s.total_supply()).unwrap_or(0)
    }
}
